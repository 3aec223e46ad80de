//! Product-family catalogs - static subscription tables and path shapes
//!
//! Families expose the same information under different paths. The engine
//! stays generic: each family contributes a [`PathSchema`] (where things
//! live) and a list of descriptors that override or extend the common set.

mod common;
mod livepremier;
mod midra;

use crate::error::PathError;
use crate::path::Path;
use crate::subscription::Descriptor;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Supported device product families
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProductFamily {
    LivePremier,
    Midra,
}

impl ProductFamily {
    pub fn all() -> &'static [ProductFamily] {
        &[ProductFamily::LivePremier, ProductFamily::Midra]
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "livepremier" => Some(ProductFamily::LivePremier),
            "midra" => Some(ProductFamily::Midra),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProductFamily::LivePremier => "livepremier",
            ProductFamily::Midra => "midra",
        }
    }

    /// Where this family keeps the data the common catalog needs
    pub fn schema(&self) -> PathSchema {
        match self {
            ProductFamily::LivePremier => livepremier::schema(),
            ProductFamily::Midra => midra::schema(),
        }
    }
}

impl fmt::Display for ProductFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Path shapes of one product family
///
/// Templates use `{collection}`, `{screen}`, `{preset}` and `{memory}`
/// placeholders and are written in wire form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathSchema {
    /// Prefix of every device path, e.g. `DEVICE/device`
    pub device_root: String,
    /// Segment names that hold screens
    pub screen_collections: Vec<String>,
    pub program_preset: String,
    pub screen_label: String,
    pub preset_memory: String,
    pub preset_modified: String,
    pub memory_label: String,
    /// Preset mode broadcast by the remote layer
    pub remote_preset_mode: String,
}

impl PathSchema {
    /// Node listing the screens of a collection
    pub fn collection_items(&self, collection: &str) -> Result<Path, PathError> {
        Path::parse(&format!("{}/{}/items", self.device_root, collection))
    }

    pub fn program_preset_path(&self, collection: &str, screen: &str) -> Result<Path, PathError> {
        Path::parse(&fill(&self.program_preset, collection, screen, "", ""))
    }

    pub fn preset_memory_path(
        &self,
        collection: &str,
        screen: &str,
        preset: &str,
    ) -> Result<Path, PathError> {
        Path::parse(&fill(&self.preset_memory, collection, screen, preset, ""))
    }

    pub fn preset_modified_path(
        &self,
        collection: &str,
        screen: &str,
        preset: &str,
    ) -> Result<Path, PathError> {
        Path::parse(&fill(&self.preset_modified, collection, screen, preset, ""))
    }

    pub fn memory_label_path(&self, memory: &str) -> Result<Path, PathError> {
        Path::parse(&fill(&self.memory_label, "", "", "", memory))
    }

    /// Concrete wire path for a screen-level template
    pub fn screen_wire(&self, template: &str, collection: &str, screen: &str) -> String {
        fill(template, collection, screen, "", "")
    }

    /// Concrete wire path for a preset-level template
    pub fn preset_wire(&self, template: &str, collection: &str, screen: &str, preset: &str) -> String {
        fill(template, collection, screen, preset, "")
    }

    /// Anchored subscription pattern for a template
    ///
    /// `{collection}`, `{screen}` and `{preset}` become capturing groups in
    /// that order, `{memory}` a word wildcard; the rest is escaped.
    pub fn pattern(&self, template: &str) -> String {
        let collections = self
            .screen_collections
            .iter()
            .map(|c| regex::escape(c))
            .collect::<Vec<_>>()
            .join("|");

        let mut pattern = String::from("^");
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}') else {
                break;
            };
            pattern.push_str(&regex::escape(&rest[..open]));
            match &rest[open + 1..open + close] {
                "collection" => pattern.push_str(&format!("({})", collections)),
                "screen" | "preset" | "memory" => pattern.push_str(r"(\w+)"),
                other => pattern.push_str(&regex::escape(&format!("{{{}}}", other))),
            }
            rest = &rest[open + close + 1..];
        }
        pattern.push_str(&regex::escape(rest));
        pattern.push('$');
        pattern
    }
}

fn fill(template: &str, collection: &str, screen: &str, preset: &str, memory: &str) -> String {
    template
        .replace("{collection}", collection)
        .replace("{screen}", screen)
        .replace("{preset}", preset)
        .replace("{memory}", memory)
}

/// Descriptors to register at connection setup, in registration order
///
/// Family entries come last so that a family entry with the same name as a
/// common one replaces it.
pub fn for_family(family: ProductFamily) -> Vec<Descriptor> {
    let schema = family.schema();
    let mut descriptors = common::descriptors(&schema);
    descriptors.extend(match family {
        ProductFamily::LivePremier => livepremier::descriptors(&schema),
        ProductFamily::Midra => midra::descriptors(&schema),
    });
    descriptors
}

/// Variable prefix for a screen, e.g. `screen1` or `aux2`
pub fn screen_variable(collection: &str, screen: &str) -> String {
    let kind = if collection.to_ascii_lowercase().contains("aux") {
        "aux"
    } else {
        "screen"
    };
    let number = screen.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    let number = if number.is_empty() { screen } else { number };
    format!("{}{}", kind, number)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::Registry;
    use regex::Regex;

    #[test]
    fn test_family_parse() {
        assert_eq!(ProductFamily::from_str("LivePremier"), Some(ProductFamily::LivePremier));
        assert_eq!(ProductFamily::from_str("midra"), Some(ProductFamily::Midra));
        assert_eq!(ProductFamily::from_str("other"), None);
    }

    #[test]
    fn test_template_pattern() {
        let schema = ProductFamily::LivePremier.schema();
        let pattern = Regex::new(&schema.pattern(&schema.program_preset)).unwrap();

        let caps = pattern
            .captures("DEVICE/device/auxiliaryScreenList/items/A2/status/pp/program")
            .unwrap();
        assert_eq!(&caps[1], "auxiliaryScreenList");
        assert_eq!(&caps[2], "A2");
        assert!(!pattern.is_match("DEVICE/device/screenList/items/S1/status/pp/program/x"));
    }

    #[test]
    fn test_schema_paths() {
        let schema = ProductFamily::LivePremier.schema();
        assert_eq!(
            schema.program_preset_path("screenList", "S1").unwrap().to_wire(),
            "DEVICE/device/screenList/items/S1/status/pp/program"
        );
        assert_eq!(
            schema.collection_items("screenList").unwrap().to_wire(),
            "DEVICE/device/screenList/items"
        );
    }

    #[test]
    fn test_every_catalog_registers() {
        for family in ProductFamily::all() {
            let mut registry = Registry::new();
            for descriptor in for_family(*family) {
                registry.register(descriptor).unwrap();
            }
            assert!(registry.contains("liveScreenSelection"), "{}", family);
            assert!(registry.contains("screenLabel"), "{}", family);
        }
    }

    #[test]
    fn test_family_overrides() {
        let mut registry = Registry::new();
        for descriptor in for_family(ProductFamily::Midra) {
            registry.register(descriptor).unwrap();
        }
        assert!(!registry.contains("timer"));
        assert!(registry.get("freeze").unwrap().pattern.is_match("DEVICE/device/screenList/items/1/status/pp/isFrozen"));

        let mut registry = Registry::new();
        for descriptor in for_family(ProductFamily::LivePremier) {
            registry.register(descriptor).unwrap();
        }
        assert!(registry.contains("timer"));
    }

    #[test]
    fn test_screen_variable() {
        assert_eq!(screen_variable("screenList", "S3"), "screen3");
        assert_eq!(screen_variable("auxiliaryScreenList", "A1"), "aux1");
        assert_eq!(screen_variable("screenList", "2"), "screen2");
    }
}
