//! Outbound collaborators: display variables and reaction re-evaluation
//!
//! The engine only knows these two traits. What a reaction re-evaluation
//! does, or where a variable ends up, belongs to the host.

use crate::subscription::ReactionId;
use parking_lot::{Mutex, RwLock};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, trace};

/// Receives derived, human-readable values
pub trait VariableSink: Send + Sync {
    fn set_variable(&self, name: &str, value: String);
}

/// Receives the outcome of a dispatch or initialization pass
pub trait ReactionSink: Send + Sync {
    /// Re-run the units of logic named by `reactions`
    fn reevaluate(&self, reactions: &BTreeSet<ReactionId>);

    /// One full downstream refresh pass
    fn refresh(&self);
}

/// Render a mirror value for display
pub fn display_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => n.to_string(),
        other => other.to_string(),
    }
}

/// In-memory variable table
#[derive(Debug, Default)]
pub struct VariableStore {
    values: RwLock<BTreeMap<String, String>>,
}

impl VariableStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.values.read().get(name).cloned()
    }

    /// Copy of every variable, sorted by name
    pub fn all(&self) -> BTreeMap<String, String> {
        self.values.read().clone()
    }

    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl VariableSink for VariableStore {
    fn set_variable(&self, name: &str, value: String) {
        trace!("Variable {} = {:?}", name, value);
        self.values.write().insert(name.to_string(), value);
    }
}

/// Reaction sink that remembers what it was asked to do
#[derive(Debug, Default)]
pub struct ReactionLog {
    passes: Mutex<Vec<BTreeSet<ReactionId>>>,
    refreshes: Mutex<usize>,
}

impl ReactionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every re-evaluation request received, oldest first
    pub fn passes(&self) -> Vec<BTreeSet<ReactionId>> {
        self.passes.lock().clone()
    }

    /// Number of full refresh passes requested
    pub fn refreshes(&self) -> usize {
        *self.refreshes.lock()
    }

    /// Distinct reactions seen so far
    pub fn seen(&self) -> BTreeSet<ReactionId> {
        self.passes.lock().iter().flatten().cloned().collect()
    }
}

impl ReactionSink for ReactionLog {
    fn reevaluate(&self, reactions: &BTreeSet<ReactionId>) {
        debug!(
            "Re-evaluating {} reaction(s): {}",
            reactions.len(),
            reactions
                .iter()
                .map(ReactionId::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
        self.passes.lock().push(reactions.clone());
    }

    fn refresh(&self) {
        debug!("Downstream refresh pass requested");
        *self.refreshes.lock() += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_value() {
        assert_eq!(display_value(&json!("Stage Right")), "Stage Right");
        assert_eq!(display_value(&json!(12)), "12");
        assert_eq!(display_value(&json!(true)), "true");
        assert_eq!(display_value(&Value::Null), "");
        assert_eq!(display_value(&json!(["S1"])), r#"["S1"]"#);
    }

    #[test]
    fn test_variable_store() {
        let store = VariableStore::new();
        store.set_variable("screen1label", "Main".to_string());
        store.set_variable("screen1label", "Stage".to_string());

        assert_eq!(store.get("screen1label").as_deref(), Some("Stage"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_reaction_log() {
        let log = ReactionLog::new();
        let mut set = BTreeSet::new();
        set.insert(ReactionId::from("freeze"));
        log.reevaluate(&set);
        log.refresh();

        assert_eq!(log.passes().len(), 1);
        assert_eq!(log.refreshes(), 1);
        assert!(log.seen().contains(&ReactionId::from("freeze")));
    }
}
