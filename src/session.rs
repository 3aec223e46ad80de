//! Session - the engine owned by one device connection
//!
//! A session holds the mirror, the subscription registry and the family
//! schema, and drives the two outbound sinks. Everything happens on the
//! caller's thread; [`SessionActor`] serializes access when several tasks
//! share one connection.

mod actor;
mod commands;
mod dispatch;
mod handle;
mod initialize;


pub use actor::SessionActor;
pub use commands::{ReadMode, SessionCommand};
pub use handle::SessionHandle;
pub use initialize::InitTarget;

use crate::catalog::{self, PathSchema, ProductFamily};
use crate::config::WatchConfig;
use crate::error::{PathError, RegistryError};
use crate::path::{resolve, Path};
use crate::sinks::{display_value, ReactionSink, VariableSink};
use crate::state::{local, MirrorContext, MirrorSnapshot, SessionSettings, StateMirror};
use crate::subscription::{Descriptor, ReactionId, Registry, Subscription};
use serde_json::Value;
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// What a dispatch, sweep or initialization pass produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Outcome {
    /// Reaction ids to re-evaluate, deduplicated
    pub reactions: BTreeSet<ReactionId>,
    /// Whether at least one handler asked for a refresh pass
    pub refresh: bool,
}

impl Outcome {
    pub fn merge(&mut self, other: Outcome) {
        self.reactions.extend(other.reactions);
        self.refresh |= other.refresh;
    }

    pub fn is_empty(&self) -> bool {
        self.reactions.is_empty() && !self.refresh
    }
}

/// Connection-scoped state and subscriptions
pub struct Session {
    family: ProductFamily,
    schema: PathSchema,
    settings: SessionSettings,
    mirror: StateMirror,
    registry: Registry,
    variables: Arc<dyn VariableSink>,
    reactions: Arc<dyn ReactionSink>,
}

impl Session {
    /// Empty session with no subscriptions
    pub fn new(
        family: ProductFamily,
        settings: SessionSettings,
        variables: Arc<dyn VariableSink>,
        reactions: Arc<dyn ReactionSink>,
    ) -> Self {
        Self {
            family,
            schema: family.schema(),
            settings,
            mirror: StateMirror::new(),
            registry: Registry::new(),
            variables,
            reactions,
        }
    }

    /// New session with the family catalog registered
    pub fn connect(
        family: ProductFamily,
        settings: SessionSettings,
        variables: Arc<dyn VariableSink>,
        reactions: Arc<dyn ReactionSink>,
    ) -> Result<Self, RegistryError> {
        let mut session = Self::new(family, settings, variables, reactions);
        for descriptor in catalog::for_family(family) {
            session.registry.register(descriptor)?;
        }
        info!(
            "Session connected ({}, {} subscription(s), selection sync {})",
            family,
            session.registry.len(),
            if session.settings.sync_selection { "on" } else { "off" }
        );
        Ok(session)
    }

    /// Drop every subscription and all mirrored state
    pub fn disconnect(&mut self) {
        self.registry.clear();
        self.mirror.clear();
        info!("Session disconnected ({})", self.family);
    }

    pub fn family(&self) -> ProductFamily {
        self.family
    }

    pub fn schema(&self) -> &PathSchema {
        &self.schema
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn mirror(&self) -> &StateMirror {
        &self.mirror
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn context(&self) -> MirrorContext<'_> {
        MirrorContext::new(&self.mirror, &self.schema, &self.settings)
    }

    /// Add or replace a subscription
    pub fn register(
        &mut self,
        descriptor: Descriptor,
    ) -> Result<Option<Arc<Subscription>>, RegistryError> {
        self.registry.register(descriptor)
    }

    pub fn unregister(&mut self, name: &str) -> bool {
        self.registry.unregister(name).is_some()
    }

    /// Literal read
    pub fn get(&self, wire: &str) -> Result<Option<&Value>, PathError> {
        let path = Path::parse(wire)?;
        Ok(self.mirror.get(&path))
    }

    /// Read after resolving symbolic segments
    pub fn get_resolved(&self, wire: &str) -> Result<Option<&Value>, PathError> {
        let path = Path::parse(wire)?;
        self.mirror.get_resolved(&path, &self.context())
    }

    /// Store one update, dispatch it and notify the sinks
    ///
    /// Symbolic segments are resolved before storing.
    pub fn apply(&mut self, wire: &str, value: Value) -> Result<Outcome, PathError> {
        let path = Path::parse(wire)?;
        let path = resolve(&path, &self.context())?;

        self.mirror.set(&path, value.clone());
        let outcome = self.dispatch(&path, &value);
        self.notify(&outcome);
        Ok(outcome)
    }

    /// Apply every leaf of one network message, then sweep once
    ///
    /// Symbolic segments are resolved as in [`Session::apply`]. Paths that
    /// fail to parse or resolve are skipped with a warning; the rest still
    /// applies.
    pub fn apply_message(&mut self, updates: Vec<(String, Value)>) -> Outcome {
        let mut outcome = Outcome::default();

        for (wire, value) in updates {
            let path = match Path::parse(&wire).and_then(|p| resolve(&p, &self.context())) {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping update '{}': {}", wire, e);
                    continue;
                }
            };
            self.mirror.set(&path, value.clone());
            outcome.merge(self.dispatch(&path, &value));
        }

        outcome.merge(self.sweep());
        self.notify(&outcome);
        outcome
    }

    /// Initialize and notify the sinks once
    pub fn prime(&mut self, target: &InitTarget) -> Outcome {
        let outcome = self.initialize(target);
        self.notify(&outcome);
        outcome
    }

    /// Register a user watch publishing a display variable
    pub fn watch(&mut self, watch: &WatchConfig) -> Result<(), RegistryError> {
        self.registry.register(watch_descriptor(watch))?;
        debug!("Watch '{}' registered on {}", watch.name, watch.pattern);
        Ok(())
    }

    /// Remove a runtime watch; catalog entries stay for the whole connection
    pub fn unwatch(&mut self, name: &str) -> bool {
        self.registry.unregister_runtime(name).is_some()
    }

    /// Replace every runtime watch with `watches` and prime them
    ///
    /// A watch named after a catalog entry fails the whole call before any
    /// existing watch is removed.
    pub fn sync_watches(&mut self, watches: &[WatchConfig]) -> Result<Outcome, RegistryError> {
        if let Some(watch) = watches.iter().find(|w| self.registry.is_catalog(&w.name)) {
            return Err(RegistryError::Reserved {
                name: watch.name.clone(),
            });
        }

        let removed = self.registry.remove_runtime();
        let mut outcome = Outcome::default();

        for watch in watches {
            self.watch(watch)?;
            outcome.merge(self.initialize(&InitTarget::Name(watch.name.clone())));
        }
        self.notify(&outcome);

        info!("Watches synced: {} removed, {} registered", removed, watches.len());
        Ok(outcome)
    }

    /// Record this client's connection identity
    pub fn set_connection_id(&mut self, id: &str) -> Outcome {
        match self.apply(local::SOCKET_ID, Value::String(id.to_string())) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Failed to store connection id: {}", e);
                Outcome::default()
            }
        }
    }

    pub fn snapshot(&self) -> MirrorSnapshot {
        MirrorSnapshot::from_mirror(&self.mirror)
    }

    /// Load a snapshot into the mirror without dispatching
    pub fn restore(&mut self, snapshot: &MirrorSnapshot) {
        snapshot.restore_into(&mut self.mirror);
    }

    /// Hand an outcome to the reaction sink
    ///
    /// At most one re-evaluation and at most one refresh per call.
    fn notify(&self, outcome: &Outcome) {
        if !outcome.reactions.is_empty() {
            self.reactions.reevaluate(&outcome.reactions);
        }
        if outcome.refresh {
            self.reactions.refresh();
        }
    }
}

fn watch_descriptor(watch: &WatchConfig) -> Descriptor {
    let mut descriptor = Descriptor::new(watch.name.clone(), watch.pattern.clone())
        .reactions(watch.reactions.iter().cloned())
        .runtime();

    if let Some(seed) = &watch.seed {
        descriptor = descriptor.seed_list(seed.iter().cloned());
    }

    if let Some(template) = watch.variable.clone() {
        descriptor = descriptor.handler(move |scope, update| {
            if let Some(update) = update {
                let name = expand_variable(&template, update.groups);
                scope.set_variable(&name, display_value(update.value));
            }
            Ok(false)
        });
    }

    descriptor
}

/// Replace `$1`..`$9` with capturing groups
fn expand_variable(template: &str, groups: &[String]) -> String {
    let mut out = String::with_capacity(template.len());
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        let digit = chars.peek().and_then(|d| d.to_digit(10));
        match (c, digit) {
            ('$', Some(n)) if n >= 1 => {
                chars.next();
                if let Some(group) = groups.get(n as usize - 1) {
                    out.push_str(group);
                }
            }
            _ => out.push(c),
        }
    }

    out
}
