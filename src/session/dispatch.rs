//! Dispatcher - matching updates against the registry

use super::{Outcome, Session};
use crate::path::Path;
use crate::subscription::{Scope, Subscription, Update};
use serde_json::Value;
use tracing::{debug, trace, warn};

impl Session {
    /// Route one update to every matching subscription
    ///
    /// The mirror must already hold `value` at `path`. Matching runs over a
    /// snapshot of the registry taken before the first handler, against the
    /// full wire form (namespace token included).
    pub fn dispatch(&mut self, path: &Path, value: &Value) -> Outcome {
        let wire = path.to_wire();
        let mut outcome = Outcome::default();

        for sub in self.registry.snapshot() {
            let Some(groups) = sub.captures(&wire) else {
                continue;
            };
            debug!("{} matched '{}'", wire, sub.name);

            outcome.reactions.extend(sub.reactions.iter().cloned());

            let update = Update {
                path,
                value,
                groups: &groups,
            };
            outcome.refresh |= self.run_handler(&sub, Some(update));
        }

        trace!(
            "{} -> {} reaction(s), refresh {}",
            wire,
            outcome.reactions.len(),
            outcome.refresh
        );
        outcome
    }

    /// Call every handler once without a path
    ///
    /// Lets handlers recompute values derived from several paths. Runs once
    /// per network message, after its leaves were dispatched.
    pub fn sweep(&mut self) -> Outcome {
        let mut outcome = Outcome::default();

        for sub in self.registry.snapshot() {
            if sub.handler.is_some() {
                outcome.refresh |= self.run_handler(&sub, None);
            }
        }

        outcome
    }

    /// Run a subscription's handler, isolating its failure
    pub(super) fn run_handler(&mut self, sub: &Subscription, update: Option<Update<'_>>) -> bool {
        let Some(handler) = &sub.handler else {
            return false;
        };

        let mut scope = Scope::new(
            &mut self.mirror,
            &self.schema,
            &self.settings,
            self.variables.as_ref(),
        );

        match handler(&mut scope, update) {
            Ok(refresh) => refresh,
            Err(e) => {
                match update {
                    Some(update) => warn!(
                        "Handler '{}' failed on {}: {:#}",
                        sub.name, update.path, e
                    ),
                    None => warn!("Handler '{}' failed during sweep: {:#}", sub.name, e),
                }
                false
            }
        }
    }
}
