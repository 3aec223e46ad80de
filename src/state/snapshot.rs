//! Mirror persistence to JSON snapshots
//!
//! Lets a client dump what it knows about the device and restore it on the
//! next start, before the device has re-sent its full state.

use super::StateMirror;
use crate::path::Namespace;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::debug;

/// Mirror snapshot for JSON serialization
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MirrorSnapshot {
    /// Timestamp of snapshot creation (milliseconds since epoch)
    pub timestamp: u64,
    /// Version of the snapshot format
    pub version: String,
    /// Whole tree per namespace
    pub namespaces: BTreeMap<Namespace, Value>,
}

impl MirrorSnapshot {
    /// Current snapshot format version
    pub const VERSION: &'static str = "1.0.0";

    /// Capture the current mirror
    ///
    /// The local namespace is left out: selection and socket identity belong
    /// to one connection only.
    pub fn from_mirror(mirror: &StateMirror) -> Self {
        let namespaces = [Namespace::Device, Namespace::Remote]
            .into_iter()
            .filter_map(|ns| mirror.namespace_root(ns).map(|root| (ns, root.clone())))
            .collect();

        Self {
            timestamp: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or_default(),
            version: Self::VERSION.to_string(),
            namespaces,
        }
    }

    /// Replace the captured namespaces in `mirror`
    pub fn restore_into(&self, mirror: &mut StateMirror) {
        for (namespace, root) in &self.namespaces {
            debug!("Restoring {} namespace from snapshot", namespace);
            mirror.replace_namespace(*namespace, root.clone());
        }
    }

    /// Save snapshot to JSON file
    pub async fn save_to_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let json =
            serde_json::to_string_pretty(self).context("Failed to serialize mirror snapshot")?;

        fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write mirror snapshot: {}", path.display()))?;

        Ok(())
    }

    /// Load snapshot from JSON file
    pub async fn load_from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read mirror snapshot: {}", path.display()))?;

        let snapshot: MirrorSnapshot =
            serde_json::from_str(&json).context("Failed to parse mirror snapshot JSON")?;

        if snapshot.version != Self::VERSION {
            anyhow::bail!(
                "Unsupported snapshot version {} (expected {})",
                snapshot.version,
                Self::VERSION
            );
        }

        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path as StatePath;
    use serde_json::json;
    use tempfile::TempDir;

    fn sample_mirror() -> StateMirror {
        let mut mirror = StateMirror::new();
        mirror.set(
            &StatePath::parse("device/screenList/items/S1/control/pp/label").unwrap(),
            json!("Main"),
        );
        mirror.set(
            &StatePath::parse("REMOTE/live/screens/screenAuxSelection").unwrap(),
            json!(["S1"]),
        );
        mirror.set(&StatePath::parse("LOCAL/socketId").unwrap(), json!("abc"));
        mirror
    }

    #[test]
    fn test_local_namespace_not_captured() {
        let snapshot = MirrorSnapshot::from_mirror(&sample_mirror());
        assert!(snapshot.namespaces.contains_key(&Namespace::Device));
        assert!(snapshot.namespaces.contains_key(&Namespace::Remote));
        assert!(!snapshot.namespaces.contains_key(&Namespace::Local));
    }

    #[tokio::test]
    async fn test_save_and_restore() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("mirror.json");

        MirrorSnapshot::from_mirror(&sample_mirror())
            .save_to_file(&file)
            .await?;

        let loaded = MirrorSnapshot::load_from_file(&file).await?;
        let mut restored = StateMirror::new();
        loaded.restore_into(&mut restored);

        assert_eq!(
            restored.get(&StatePath::parse("device/screenList/items/S1/control/pp/label")?),
            Some(&json!("Main"))
        );
        assert!(restored.get(&StatePath::parse("LOCAL/socketId")?).is_none());
        Ok(())
    }

    #[tokio::test]
    async fn test_rejects_unknown_version() -> Result<()> {
        let temp_dir = TempDir::new()?;
        let file = temp_dir.path().join("mirror.json");
        std::fs::write(&file, r#"{"timestamp":0,"version":"0.1.0","namespaces":{}}"#)?;

        assert!(MirrorSnapshot::load_from_file(&file).await.is_err());
        Ok(())
    }
}
