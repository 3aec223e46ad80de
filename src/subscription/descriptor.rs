//! Subscription descriptors, handlers and the scope they run in

use crate::catalog::PathSchema;
use crate::error::PathError;
use crate::path::{resolve, Path};
use crate::sinks::VariableSink;
use crate::state::{MirrorContext, SessionSettings, StateMirror};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Opaque name of a unit of downstream re-evaluation
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReactionId(String);

impl ReactionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ReactionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ReactionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl fmt::Display for ReactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One update handed to a handler
#[derive(Debug, Clone, Copy)]
pub struct Update<'a> {
    /// Path as received (or synthesized during initialization)
    pub path: &'a Path,
    /// Value that was written to the mirror
    pub value: &'a Value,
    /// Capturing groups of the subscription pattern, in order
    pub groups: &'a [String],
}

impl<'a> Update<'a> {
    /// Capturing group by 1-based index, like `regex::Captures`
    pub fn group(&self, index: usize) -> Option<&'a str> {
        index
            .checked_sub(1)
            .and_then(|i| self.groups.get(i))
            .map(String::as_str)
    }
}

/// What a handler can touch while it runs
pub struct Scope<'a> {
    pub(crate) mirror: &'a mut StateMirror,
    pub(crate) schema: &'a PathSchema,
    pub(crate) settings: &'a SessionSettings,
    pub(crate) variables: &'a dyn VariableSink,
}

impl<'a> Scope<'a> {
    pub fn new(
        mirror: &'a mut StateMirror,
        schema: &'a PathSchema,
        settings: &'a SessionSettings,
        variables: &'a dyn VariableSink,
    ) -> Self {
        Self {
            mirror,
            schema,
            settings,
            variables,
        }
    }

    pub fn mirror(&self) -> &StateMirror {
        &*self.mirror
    }

    /// Write access, meant for the local and remote namespaces
    pub fn mirror_mut(&mut self) -> &mut StateMirror {
        &mut *self.mirror
    }

    pub fn schema(&self) -> &PathSchema {
        self.schema
    }

    pub fn settings(&self) -> &SessionSettings {
        self.settings
    }

    /// Session context as the path codec sees it
    pub fn context(&self) -> MirrorContext<'_> {
        MirrorContext::new(&*self.mirror, self.schema, self.settings)
    }

    /// Resolve symbolic segments against the current context
    pub fn resolve(&self, path: &Path) -> Result<Path, PathError> {
        resolve(path, &self.context())
    }

    /// Literal read
    pub fn get(&self, path: &Path) -> Option<&Value> {
        self.mirror.get(path)
    }

    /// Literal read from a wire string
    pub fn get_wire(&self, wire: &str) -> Option<&Value> {
        let path = Path::parse(wire).ok()?;
        self.mirror.get(&path)
    }

    /// Resolved read
    pub fn get_resolved(&self, path: &Path) -> Result<Option<&Value>, PathError> {
        self.mirror.get_resolved(path, &self.context())
    }

    pub fn set(&mut self, path: &Path, value: Value) {
        self.mirror.set(path, value);
    }

    /// Publish a display variable
    pub fn set_variable(&self, name: &str, value: impl Into<String>) {
        self.variables.set_variable(name, value.into());
    }
}

/// Reaction handler
///
/// Called with `Some(update)` for matching updates and with `None` during a
/// global sweep. `Ok(true)` asks for one downstream refresh pass.
pub type Handler = Arc<dyn Fn(&mut Scope<'_>, Option<Update<'_>>) -> anyhow::Result<bool> + Send + Sync>;

/// Generator of concrete wire paths for initialization
pub type SeedFn = Arc<dyn Fn(&MirrorContext<'_>) -> Vec<String> + Send + Sync>;

/// Values a pattern's wildcard can take during initialization
#[derive(Clone)]
pub enum Seed {
    /// Substituted into every capturing group
    List(Vec<String>),
    /// Produces complete concrete paths
    Generator(SeedFn),
}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Seed::List(values) => f.debug_tuple("List").field(values).finish(),
            Seed::Generator(_) => f.write_str("Generator(..)"),
        }
    }
}

/// Who registered a subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Product-family catalog, lives for the whole connection
    Catalog,
    /// Added at runtime by a consumer (e.g. a user watch)
    Runtime,
}

/// Uncompiled subscription, as written in catalogs and by consumers
#[derive(Clone)]
pub struct Descriptor {
    pub name: String,
    pub pattern: String,
    pub reactions: Vec<ReactionId>,
    pub handler: Option<Handler>,
    pub seed: Option<Seed>,
    pub origin: Origin,
}

impl Descriptor {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
            reactions: Vec::new(),
            handler: None,
            seed: None,
            origin: Origin::Catalog,
        }
    }

    /// Reaction ids surfaced on every match
    pub fn reactions<I, R>(mut self, reactions: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<ReactionId>,
    {
        self.reactions.extend(reactions.into_iter().map(Into::into));
        self
    }

    pub fn handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&mut Scope<'_>, Option<Update<'_>>) -> anyhow::Result<bool> + Send + Sync + 'static,
    {
        self.handler = Some(Arc::new(handler));
        self
    }

    /// Literal seed values for the wildcard
    pub fn seed_list<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.seed = Some(Seed::List(values.into_iter().map(Into::into).collect()));
        self
    }

    /// Seed generator producing concrete paths
    pub fn seed_with<F>(mut self, generator: F) -> Self
    where
        F: Fn(&MirrorContext<'_>) -> Vec<String> + Send + Sync + 'static,
    {
        self.seed = Some(Seed::Generator(Arc::new(generator)));
        self
    }

    pub fn runtime(mut self) -> Self {
        self.origin = Origin::Runtime;
        self
    }
}

impl fmt::Debug for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Descriptor")
            .field("name", &self.name)
            .field("pattern", &self.pattern)
            .field("reactions", &self.reactions)
            .field("handler", &self.handler.is_some())
            .field("seed", &self.seed)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Registered subscription with its compiled pattern
#[derive(Clone)]
pub struct Subscription {
    pub name: String,
    pub pattern: Regex,
    pub reactions: Vec<ReactionId>,
    pub handler: Option<Handler>,
    pub seed: Option<Seed>,
    pub origin: Origin,
}

impl Subscription {
    /// Whether the pattern has at least one capturing group
    pub fn has_wildcard(&self) -> bool {
        self.pattern.captures_len() > 1
    }

    /// Capturing groups of `wire`, `None` when the pattern does not match
    pub fn captures(&self, wire: &str) -> Option<Vec<String>> {
        let caps = self.pattern.captures(wire)?;
        Some(
            caps.iter()
                .skip(1)
                .map(|m| m.map(|m| m.as_str().to_string()).unwrap_or_default())
                .collect(),
        )
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("reactions", &self.reactions)
            .field("handler", &self.handler.is_some())
            .field("seed", &self.seed)
            .field("origin", &self.origin)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_group_is_one_based() {
        let path = Path::parse("device/screenList/items/S3/control/pp/label").unwrap();
        let groups = vec!["S3".to_string()];
        let update = Update {
            path: &path,
            value: &Value::Null,
            groups: &groups,
        };

        assert_eq!(update.group(1), Some("S3"));
        assert_eq!(update.group(0), None);
        assert_eq!(update.group(2), None);
    }

    #[test]
    fn test_captures() {
        let sub = Subscription {
            name: "memory".to_string(),
            pattern: Regex::new(r"screenList/items/(\w+)/presetList/items/(\w+)/").unwrap(),
            reactions: vec![],
            handler: None,
            seed: None,
            origin: Origin::Catalog,
        };

        assert!(sub.has_wildcard());
        assert_eq!(
            sub.captures("DEVICE/device/screenList/items/S1/presetList/items/A/status"),
            Some(vec!["S1".to_string(), "A".to_string()])
        );
        assert_eq!(sub.captures("DEVICE/device/other"), None);
    }

    #[test]
    fn test_builder() {
        let desc = Descriptor::new("screenLabel", r"screenList/items/(\w+)/control/pp/label")
            .reactions(["labels"])
            .seed_list(["1", "2"])
            .handler(|_scope, _update| Ok(false))
            .runtime();

        assert_eq!(desc.reactions, vec![ReactionId::from("labels")]);
        assert!(desc.handler.is_some());
        assert!(matches!(desc.seed, Some(Seed::List(ref v)) if v.len() == 2));
        assert_eq!(desc.origin, Origin::Runtime);
    }
}
