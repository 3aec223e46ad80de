//! Symbolic segment resolution
//!
//! `$pgm`, `$pvw` and `$sel` refer to "whichever preset is on program /
//! preview / being edited" for the screen that precedes them in the path.
//! The screen is found from the nearest `<collection>/items/<key>` triple
//! whose collection the product family declares as a screen collection.

use super::{Path, Symbol};
use crate::error::PathError;
use serde::{Deserialize, Serialize};

/// Which preset the operator is currently editing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PresetMode {
    Program,
    Preview,
}

impl PresetMode {
    /// Parse the device / local representation
    pub fn from_value(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "PROGRAM" | "PGM" => Some(PresetMode::Program),
            "PREVIEW" | "PVW" => Some(PresetMode::Preview),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PresetMode::Program => "PROGRAM",
            PresetMode::Preview => "PREVIEW",
        }
    }
}

/// Session context needed to resolve symbolic segments
pub trait ResolveContext {
    /// Segment names that hold screens (e.g. `screenList`)
    fn screen_collections(&self) -> &[String];

    /// Preset key on program for a screen
    fn program_preset(&self, collection: &str, screen: &str) -> Option<String>;

    /// Preset key on preview for a screen
    ///
    /// Default: the other member of the A/B pair.
    fn preview_preset(&self, collection: &str, screen: &str) -> Option<String> {
        self.program_preset(collection, screen)
            .and_then(|pgm| match pgm.as_str() {
                "A" => Some("B".to_string()),
                "B" => Some("A".to_string()),
                _ => None,
            })
    }

    /// Preset mode currently selected
    ///
    /// One value per connection, shared by every screen: `$sel` resolves
    /// the same way whichever screen the path points at.
    fn preset_mode(&self) -> Option<PresetMode>;

    /// Whether selection follows the device's remote layer
    fn selection_synced(&self) -> bool;

    /// Identity of this client's connection
    fn connection_id(&self) -> Option<String>;
}

/// Resolve every symbolic segment of `path`
///
/// Paths without symbolic segments come back unchanged.
pub fn resolve(path: &Path, ctx: &dyn ResolveContext) -> Result<Path, PathError> {
    if !path.is_symbolic() {
        return Ok(path.clone());
    }

    let collections = ctx.screen_collections();
    let segments = path.segments();
    let mut screen: Option<(&str, &str)> = None;
    let mut resolved = Vec::with_capacity(segments.len());

    for (idx, segment) in segments.iter().enumerate() {
        let symbol = match Symbol::parse(segment) {
            None => {
                if idx >= 2
                    && segments[idx - 1] == "items"
                    && collections.iter().any(|c| *c == segments[idx - 2])
                {
                    screen = Some((segments[idx - 2].as_str(), segment.as_str()));
                }
                resolved.push(segment.clone());
                continue;
            }
            Some(Err(())) => {
                return Err(PathError::UnknownSymbol {
                    segment: segment.clone(),
                    path: path.to_wire(),
                })
            }
            Some(Ok(symbol)) => symbol,
        };

        let unresolved = |reason: &str| PathError::Unresolved {
            segment: segment.clone(),
            path: path.to_wire(),
            reason: reason.to_string(),
        };

        let (collection, key) = screen.ok_or_else(|| unresolved("no screen precedes it"))?;

        let mode = match symbol {
            Symbol::Program => PresetMode::Program,
            Symbol::Preview => PresetMode::Preview,
            Symbol::Selected => ctx
                .preset_mode()
                .ok_or_else(|| unresolved("preset mode unknown"))?,
        };

        let preset = match mode {
            PresetMode::Program => ctx.program_preset(collection, key),
            PresetMode::Preview => ctx.preview_preset(collection, key),
        }
        .ok_or_else(|| unresolved("program preset unknown for screen"))?;

        resolved.push(preset);
    }

    Ok(Path::new(path.namespace(), resolved))
}

/// Raw addressing: segments taken as written
pub fn literal(path: &Path) -> Path {
    path.clone()
}
