//! StateMirror - In-memory tree of JSON values, one root per namespace

use crate::error::PathError;
use crate::path::{resolve, Namespace, Path, ResolveContext};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use tracing::trace;

/// Last known value for every path, per namespace
#[derive(Debug, Clone, Default)]
pub struct StateMirror {
    roots: BTreeMap<Namespace, Value>,
}

impl StateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a path taking every segment literally
    ///
    /// `None` means the path was never written; a stored `null` is `Some`.
    pub fn get(&self, path: &Path) -> Option<&Value> {
        let mut node = self.roots.get(&path.namespace())?;
        for segment in path.segments() {
            node = match node {
                Value::Object(map) => map.get(segment)?,
                Value::Array(items) => items.get(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }
        Some(node)
    }

    /// Read a path after substituting its symbolic segments
    pub fn get_resolved(
        &self,
        path: &Path,
        ctx: &dyn ResolveContext,
    ) -> Result<Option<&Value>, PathError> {
        let resolved = resolve(path, ctx)?;
        Ok(self.get(&resolved))
    }

    /// Overwrite a single path, creating intermediate nodes as needed
    pub fn set(&mut self, path: &Path, value: Value) {
        trace!("Mirror <- {} = {}", path, value);

        let root = self
            .roots
            .entry(path.namespace())
            .or_insert_with(|| Value::Object(Map::new()));

        let Some((last, parents)) = path.segments().split_last() else {
            *root = value;
            return;
        };

        let mut node = root;
        for segment in parents {
            node = slot_mut(node, segment);
        }
        *slot_mut(node, last) = value;
    }

    /// Resolve symbolic segments, then write
    pub fn set_resolved(
        &mut self,
        path: &Path,
        value: Value,
        ctx: &dyn ResolveContext,
    ) -> Result<Path, PathError> {
        let resolved = resolve(path, ctx)?;
        self.set(&resolved, value);
        Ok(resolved)
    }

    /// Remove a node and return its previous value
    pub fn remove(&mut self, path: &Path) -> Option<Value> {
        let (last, parents) = match path.segments().split_last() {
            Some(split) => split,
            None => return self.roots.remove(&path.namespace()),
        };

        let mut node = self.roots.get_mut(&path.namespace())?;
        for segment in parents {
            node = match node {
                Value::Object(map) => map.get_mut(segment)?,
                Value::Array(items) => items.get_mut(segment.parse::<usize>().ok()?)?,
                _ => return None,
            };
        }

        match node {
            Value::Object(map) => map.remove(last),
            _ => None,
        }
    }

    /// Child keys of an object node (array indices for lists)
    pub fn keys(&self, path: &Path) -> Vec<String> {
        match self.get(path) {
            Some(Value::Object(map)) => map.keys().cloned().collect(),
            Some(Value::Array(items)) => (0..items.len()).map(|i| i.to_string()).collect(),
            _ => Vec::new(),
        }
    }

    /// Whole tree of a namespace
    pub fn namespace_root(&self, namespace: Namespace) -> Option<&Value> {
        self.roots.get(&namespace)
    }

    /// Replace the whole tree of a namespace
    pub fn replace_namespace(&mut self, namespace: Namespace, root: Value) {
        self.roots.insert(namespace, root);
    }

    pub fn clear_namespace(&mut self, namespace: Namespace) {
        self.roots.remove(&namespace);
    }

    pub fn clear(&mut self) {
        self.roots.clear();
    }

    /// Whether nothing has been written yet
    pub fn is_empty(&self) -> bool {
        self.roots.is_empty()
    }
}

/// Slot for `segment` under `node`, created as `null` when absent
///
/// Lists grow by one when `segment` is their length. Any other key under a
/// list turns it into an object keyed by index so existing items survive.
/// Scalars become empty objects.
fn slot_mut<'a>(node: &'a mut Value, segment: &str) -> &'a mut Value {
    let index = segment.parse::<usize>().ok();

    if let Value::Array(items) = &mut *node {
        match index {
            Some(idx) if idx < items.len() => {}
            Some(idx) if idx == items.len() => items.push(Value::Null),
            _ => {
                let map = std::mem::take(items)
                    .into_iter()
                    .enumerate()
                    .map(|(idx, item)| (idx.to_string(), item))
                    .collect();
                *node = Value::Object(map);
            }
        }
    }

    match (node, index) {
        (Value::Array(items), Some(idx)) => &mut items[idx],
        (node, _) => {
            if !node.is_object() {
                *node = Value::Object(Map::new());
            }
            &mut node[segment]
        }
    }
}
