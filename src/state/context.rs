//! Session context read straight from the mirror
//!
//! Program assignment comes from the device namespace through the family
//! [`PathSchema`]; preset mode comes from the remote channel when selection
//! is synchronized with the device, from the local namespace otherwise.

use super::StateMirror;
use crate::catalog::PathSchema;
use crate::path::{Path, PresetMode, ResolveContext};
use serde::{Deserialize, Serialize};

/// Per-connection switches that shape how symbolic paths resolve
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSettings {
    /// Follow the selection broadcast by the device's remote layer
    #[serde(default = "default_true")]
    pub sync_selection: bool,
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            sync_selection: true,
        }
    }
}

fn default_true() -> bool {
    true
}

/// Local namespace keys shared by the catalog handlers
pub mod local {
    pub const SOCKET_ID: &str = "LOCAL/socketId";
    pub const PRESET_MODE: &str = "LOCAL/presetMode";
    pub const SCREEN_SELECTION: &str = "LOCAL/screenSelection";
    pub const SCREEN_LOCKS: &str = "LOCAL/screenLocks";
}

/// [`ResolveContext`] backed by the mirror
#[derive(Clone, Copy)]
pub struct MirrorContext<'a> {
    mirror: &'a StateMirror,
    schema: &'a PathSchema,
    settings: &'a SessionSettings,
}

impl<'a> MirrorContext<'a> {
    pub fn new(mirror: &'a StateMirror, schema: &'a PathSchema, settings: &'a SessionSettings) -> Self {
        Self {
            mirror,
            schema,
            settings,
        }
    }

    pub fn mirror(&self) -> &'a StateMirror {
        self.mirror
    }

    pub fn schema(&self) -> &'a PathSchema {
        self.schema
    }

    pub fn settings(&self) -> &'a SessionSettings {
        self.settings
    }

    /// `(collection, screen)` pairs the device currently reports
    pub fn screens(&self) -> Vec<(String, String)> {
        self.schema
            .screen_collections
            .iter()
            .filter_map(|collection| {
                let items = self.schema.collection_items(collection).ok()?;
                Some(
                    self.mirror
                        .keys(&items)
                        .into_iter()
                        .map(|key| (collection.clone(), key))
                        .collect::<Vec<_>>(),
                )
            })
            .flatten()
            .collect()
    }

    /// String value at a wire path, if any
    pub fn text(&self, wire: &str) -> Option<&'a str> {
        let path = Path::parse(wire).ok()?;
        self.mirror.get(&path)?.as_str()
    }
}

impl ResolveContext for MirrorContext<'_> {
    fn screen_collections(&self) -> &[String] {
        &self.schema.screen_collections
    }

    fn program_preset(&self, collection: &str, screen: &str) -> Option<String> {
        let path = self.schema.program_preset_path(collection, screen).ok()?;
        self.mirror.get(&path)?.as_str().map(str::to_string)
    }

    fn preset_mode(&self) -> Option<PresetMode> {
        let wire = if self.settings.sync_selection {
            self.schema.remote_preset_mode.as_str()
        } else {
            local::PRESET_MODE
        };
        self.text(wire).and_then(PresetMode::from_value)
    }

    fn selection_synced(&self) -> bool {
        self.settings.sync_selection
    }

    fn connection_id(&self) -> Option<String> {
        self.text(local::SOCKET_ID).map(str::to_string)
    }
}
