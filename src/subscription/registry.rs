//! Registry - active subscriptions keyed by name

use super::descriptor::{Descriptor, Origin, Subscription};
use crate::error::RegistryError;
use regex::Regex;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Active subscriptions of one connection
///
/// Registering a name that already exists replaces the previous entry, which
/// is how a family-specific catalog entry overrides a generic default. A
/// runtime entry never replaces a catalog one.
#[derive(Debug, Default, Clone)]
pub struct Registry {
    entries: BTreeMap<String, Arc<Subscription>>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compile and add (or replace) a subscription
    ///
    /// Returns the entry that was replaced, if any. Invalid patterns are
    /// rejected here so dispatch never sees them.
    pub fn register(
        &mut self,
        descriptor: Descriptor,
    ) -> Result<Option<Arc<Subscription>>, RegistryError> {
        if descriptor.name.is_empty() {
            return Err(RegistryError::EmptyName);
        }
        if descriptor.origin == Origin::Runtime && self.is_catalog(&descriptor.name) {
            return Err(RegistryError::Reserved {
                name: descriptor.name,
            });
        }

        let pattern =
            Regex::new(&descriptor.pattern).map_err(|source| RegistryError::InvalidPattern {
                name: descriptor.name.clone(),
                source,
            })?;

        let subscription = Subscription {
            name: descriptor.name,
            pattern,
            reactions: descriptor.reactions,
            handler: descriptor.handler,
            seed: descriptor.seed,
            origin: descriptor.origin,
        };

        let replaced = self
            .entries
            .insert(subscription.name.clone(), Arc::new(subscription));

        if let Some(old) = &replaced {
            debug!("Subscription '{}' replaced", old.name);
        }

        Ok(replaced)
    }

    /// Remove a subscription (no-op when absent)
    pub fn unregister(&mut self, name: &str) -> Option<Arc<Subscription>> {
        self.entries.remove(name)
    }

    /// Remove a runtime subscription, leaving catalog entries alone
    pub fn unregister_runtime(&mut self, name: &str) -> Option<Arc<Subscription>> {
        if self.is_catalog(name) {
            return None;
        }
        self.entries.remove(name)
    }

    /// Whether `name` belongs to a catalog entry
    pub fn is_catalog(&self, name: &str) -> bool {
        self.entries
            .get(name)
            .map_or(false, |sub| sub.origin == Origin::Catalog)
    }

    /// Names of all active subscriptions
    pub fn list(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<Arc<Subscription>> {
        self.entries.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name)
    }

    /// Stable copy of the active set
    ///
    /// Dispatch and initialization iterate over this, so registrations made
    /// while they run are not observed mid-pass.
    pub fn snapshot(&self) -> Vec<Arc<Subscription>> {
        self.entries.values().cloned().collect()
    }

    /// Drop every entry added at runtime by consumers
    pub fn remove_runtime(&mut self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, sub| sub.origin != Origin::Runtime);
        before - self.entries.len()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_and_get() {
        let mut registry = Registry::new();
        let replaced = registry
            .register(Descriptor::new("freeze", r"/control/pp/freeze$").reactions(["freeze"]))
            .unwrap();

        assert!(replaced.is_none());
        assert_eq!(registry.list(), vec!["freeze"]);
        let sub = registry.get("freeze").unwrap();
        assert_eq!(sub.reactions[0].as_str(), "freeze");
        assert!(!sub.has_wildcard());
    }

    #[test]
    fn test_same_name_replaces() {
        let mut registry = Registry::new();
        registry
            .register(Descriptor::new("label", "screenList").reactions(["old"]))
            .unwrap();
        let replaced = registry
            .register(Descriptor::new("label", "screens").reactions(["new"]))
            .unwrap();

        assert_eq!(replaced.unwrap().reactions[0].as_str(), "old");
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get("label").unwrap().pattern.as_str(), "screens");
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let mut registry = Registry::new();
        let err = registry
            .register(Descriptor::new("broken", r"screenList/items/(\w+"))
            .unwrap_err();

        assert!(matches!(err, RegistryError::InvalidPattern { ref name, .. } if name == "broken"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_empty_name_rejected() {
        let mut registry = Registry::new();
        assert!(matches!(
            registry.register(Descriptor::new("", "x")),
            Err(RegistryError::EmptyName)
        ));
    }

    #[test]
    fn test_unregister_is_noop_when_absent() {
        let mut registry = Registry::new();
        assert!(registry.unregister("missing").is_none());

        registry.register(Descriptor::new("a", "a")).unwrap();
        assert!(registry.unregister("a").is_some());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_snapshot_is_stable() {
        let mut registry = Registry::new();
        registry.register(Descriptor::new("a", "a")).unwrap();

        let snapshot = registry.snapshot();
        registry.register(Descriptor::new("b", "b")).unwrap();

        assert_eq!(snapshot.len(), 1);
        assert_eq!(registry.snapshot().len(), 2);
    }

    #[test]
    fn test_remove_runtime() {
        let mut registry = Registry::new();
        registry.register(Descriptor::new("catalog", "a")).unwrap();
        registry
            .register(Descriptor::new("watch", "b").runtime())
            .unwrap();

        assert_eq!(registry.remove_runtime(), 1);
        assert_eq!(registry.list(), vec!["catalog"]);
    }

    #[test]
    fn test_runtime_cannot_replace_catalog() {
        let mut registry = Registry::new();
        registry
            .register(Descriptor::new("freeze", r"/control/pp/freeze$").reactions(["freeze"]))
            .unwrap();

        let err = registry
            .register(Descriptor::new("freeze", "anything").runtime())
            .unwrap_err();
        assert!(matches!(err, RegistryError::Reserved { ref name } if name == "freeze"));
        assert_eq!(registry.get("freeze").unwrap().origin, Origin::Catalog);

        registry.register(Descriptor::new("watch", "a").runtime()).unwrap();
        registry.register(Descriptor::new("watch", "b").runtime()).unwrap();
        assert_eq!(registry.get("watch").unwrap().pattern.as_str(), "b");
    }

    #[test]
    fn test_unregister_runtime_skips_catalog() {
        let mut registry = Registry::new();
        registry.register(Descriptor::new("freeze", "freeze")).unwrap();
        registry.register(Descriptor::new("watch", "w").runtime()).unwrap();

        assert!(registry.unregister_runtime("freeze").is_none());
        assert!(registry.contains("freeze"));
        assert!(registry.unregister_runtime("watch").is_some());
        assert!(registry.unregister_runtime("missing").is_none());
    }
}
