//! Initializer - priming handlers from the current mirror

use super::{Outcome, Session};
use crate::path::Path;
use crate::subscription::{pattern, Seed, Subscription, Update};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

/// Which subscriptions to initialize
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitTarget {
    All,
    Name(String),
}

impl From<&str> for InitTarget {
    fn from(name: &str) -> Self {
        InitTarget::Name(name.to_string())
    }
}

impl Session {
    /// Run handlers over every concrete path their patterns stand for
    ///
    /// Each handler sees the value the mirror currently holds at the path
    /// (`null` when absent). Reactions of every initialized subscription are
    /// collected. The sinks are not notified; see [`Session::prime`].
    pub fn initialize(&mut self, target: &InitTarget) -> Outcome {
        let subs: Vec<Arc<Subscription>> = match target {
            InitTarget::All => self.registry.snapshot(),
            InitTarget::Name(name) => match self.registry.get(name) {
                Some(sub) => vec![sub],
                None => {
                    debug!("Nothing to initialize: '{}' is not registered", name);
                    Vec::new()
                }
            },
        };

        let mut outcome = Outcome::default();
        for sub in subs {
            outcome.reactions.extend(sub.reactions.iter().cloned());
            if sub.handler.is_none() {
                continue;
            }

            for (wire, groups) in self.seed_paths(&sub) {
                let path = match Path::parse(&wire) {
                    Ok(path) => path,
                    Err(e) => {
                        warn!("Seed '{}' of '{}' is not a path: {}", wire, sub.name, e);
                        continue;
                    }
                };
                let value = self.mirror.get(&path).cloned().unwrap_or(Value::Null);
                let update = Update {
                    path: &path,
                    value: &value,
                    groups: &groups,
                };
                outcome.refresh |= self.run_handler(&sub, Some(update));
            }
        }

        outcome
    }

    /// Concrete paths (with their group values) for one subscription
    fn seed_paths(&self, sub: &Subscription) -> Vec<(String, Vec<String>)> {
        let source = sub.pattern.as_str();

        if !sub.has_wildcard() {
            return vec![(pattern::literal(source), Vec::new())];
        }

        match &sub.seed {
            Some(Seed::List(values)) => {
                let groups = pattern::capture_spans(source).len();
                values
                    .iter()
                    .map(|value| {
                        let wire = pattern::substitute(source, value);
                        let captures = sub
                            .captures(&wire)
                            .unwrap_or_else(|| vec![value.clone(); groups]);
                        (wire, captures)
                    })
                    .collect()
            }
            Some(Seed::Generator(generate)) => generate(&self.context())
                .into_iter()
                .map(|wire| {
                    let groups = sub.captures(&wire).unwrap_or_default();
                    (wire, groups)
                })
                .collect(),
            None => {
                debug!("'{}' has a wildcard but no seed, nothing to prime", sub.name);
                Vec::new()
            }
        }
    }
}
