//! Configuration management for awj-sync
//! 
//! Handles loading, parsing, and hot-reloading of YAML configuration files.

pub mod watcher;

use crate::catalog::{self, ProductFamily};
use crate::state::SessionSettings;
use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tokio::fs;

pub use watcher::ConfigWatcher;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub device: DeviceConfig,
    #[serde(default)]
    pub selection: SelectionConfig,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub watches: Vec<WatchConfig>,
}

/// Device the session talks to
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceConfig {
    pub family: ProductFamily,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

/// Selection behaviour
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SelectionConfig {
    /// Follow the screen selection and preset mode of the device's remote layer
    #[serde(default = "default_true")]
    pub sync: bool,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self { sync: true }
    }
}

/// Ad-hoc subscription declared by the user
///
/// `variable` may reference capturing groups as `$1`..`$9`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WatchConfig {
    pub name: String,
    pub pattern: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variable: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seed: Option<Vec<String>>,
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &str) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path))?;
        
        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path))?;
        
        config.validate()?;
        
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save(&self, path: &str) -> Result<()> {
        let yaml = serde_yaml::to_string(self)
            .context("Failed to serialize config to YAML")?;
        
        fs::write(path, yaml)
            .await
            .with_context(|| format!("Failed to write config file: {}", path))?;
        
        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        let reserved: HashSet<String> = catalog::for_family(self.device.family)
            .into_iter()
            .map(|descriptor| descriptor.name)
            .collect();

        let mut names = HashSet::new();
        for (idx, watch) in self.watches.iter().enumerate() {
            if watch.name.is_empty() {
                anyhow::bail!("Watch {} name cannot be empty", idx);
            }
            if reserved.contains(&watch.name) {
                anyhow::bail!(
                    "Watch '{}' uses the name of a {} catalog subscription",
                    watch.name,
                    self.device.family
                );
            }
            if !names.insert(watch.name.as_str()) {
                anyhow::bail!("Watch '{}' is declared more than once", watch.name);
            }
            let pattern = Regex::new(&watch.pattern)
                .with_context(|| format!("Invalid pattern in watch '{}'", watch.name))?;

            if let Some(variable) = &watch.variable {
                if variable.is_empty() {
                    anyhow::bail!("Watch '{}' variable cannot be empty", watch.name);
                }
                let groups = pattern.captures_len() - 1;
                for n in group_references(variable) {
                    if n > groups {
                        anyhow::bail!(
                            "Watch '{}' variable references ${} but the pattern has {} group(s)",
                            watch.name,
                            n,
                            groups
                        );
                    }
                }
            }

            if watch.seed.is_some() && pattern.captures_len() < 2 {
                anyhow::bail!("Watch '{}' has a seed but no capturing group", watch.name);
            }
        }

        Ok(())
    }

    /// Session switches derived from this configuration
    pub fn settings(&self) -> SessionSettings {
        SessionSettings {
            sync_selection: self.selection.sync,
        }
    }
}

/// `$N` references in a variable template
fn group_references(template: &str) -> Vec<usize> {
    let mut refs = Vec::new();
    let mut chars = template.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '$' {
            if let Some(n) = chars.peek().and_then(|d| d.to_digit(10)) {
                refs.push(n as usize);
                chars.next();
            }
        }
    }
    refs
}

fn default_true() -> bool { true }

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(yaml: &str) -> AppConfig {
        serde_yaml::from_str(yaml).unwrap()
    }

    #[test]
    fn test_minimal_config() {
        let config = parse("device:\n  family: livepremier\n");
        assert_eq!(config.device.family, ProductFamily::LivePremier);
        assert!(config.selection.sync);
        assert!(config.watches.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_watches() {
        let config = parse(
            r#"
device:
  family: midra
selection:
  sync: false
watches:
  - name: layerSource
    pattern: '^DEVICE/device/screenList/items/(\w+)/layerList/items/1/status/pp/source$'
    variable: "layer1source_$1"
    reactions: [layers]
    seed: ["1", "2"]
"#,
        );
        assert!(config.validate().is_ok());
        assert!(!config.settings().sync_selection);
        assert_eq!(config.watches[0].seed.as_deref().map(<[String]>::len), Some(2));
    }

    #[test]
    fn test_invalid_pattern_rejected() {
        let config = parse(
            "device:\n  family: livepremier\nwatches:\n  - name: broken\n    pattern: '(\\w+'\n",
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_group_reference_out_of_range() {
        let config = parse(
            "device:\n  family: livepremier\nwatches:\n  - name: label\n    pattern: 'label$'\n    variable: 'x_$1'\n",
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_duplicate_names_rejected() {
        let config = parse(
            "device:\n  family: livepremier\nwatches:\n  - name: a\n    pattern: a\n  - name: a\n    pattern: b\n",
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_catalog_names_rejected() {
        let config = parse(
            "device:\n  family: livepremier\nwatches:\n  - name: screenLabel\n    pattern: 'label$'\n",
        );
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("screenLabel"));

        let config = parse(
            "device:\n  family: midra\nwatches:\n  - name: freeze\n    pattern: 'freeze$'\n",
        );
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_family_fails_to_parse() {
        assert!(serde_yaml::from_str::<AppConfig>("device:\n  family: other\n").is_err());
    }

    #[tokio::test]
    async fn test_save_and_load() -> Result<()> {
        let dir = tempfile::TempDir::new()?;
        let path = dir.path().join("config.yaml");
        let path = path.to_string_lossy().to_string();

        let config = parse("device:\n  family: midra\n");
        config.save(&path).await?;

        let loaded = AppConfig::load(&path).await?;
        assert_eq!(loaded.device.family, ProductFamily::Midra);
        Ok(())
    }
}
