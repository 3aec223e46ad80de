//! Midra path shapes
//!
//! Same information as LivePremier, different tree: no auxiliary screens,
//! program assignment and titles live under other nodes.

use super::PathSchema;
use crate::subscription::Descriptor;

pub(super) fn schema() -> PathSchema {
    PathSchema {
        device_root: "DEVICE/device".to_string(),
        screen_collections: vec!["screenList".to_string()],
        program_preset: "DEVICE/device/{collection}/items/{screen}/presetStatus/pp/program".to_string(),
        screen_label: "DEVICE/device/{collection}/items/{screen}/status/pp/title".to_string(),
        preset_memory:
            "DEVICE/device/{collection}/items/{screen}/presetList/items/{preset}/status/pp/memoryId"
                .to_string(),
        preset_modified:
            "DEVICE/device/{collection}/items/{screen}/presetList/items/{preset}/status/pp/isModified"
                .to_string(),
        memory_label: "DEVICE/device/preset/slotList/items/{memory}/status/pp/label".to_string(),
        remote_preset_mode: "REMOTE/live/presetModeSelection/presetMode".to_string(),
    }
}

pub(super) fn descriptors(_schema: &PathSchema) -> Vec<Descriptor> {
    vec![Descriptor::new("freeze", r"/status/pp/isFrozen$").reactions(["freeze"])]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_midra_program_path() {
        let schema = schema();
        assert_eq!(
            schema.program_preset_path("screenList", "1").unwrap().to_wire(),
            "DEVICE/device/screenList/items/1/presetStatus/pp/program"
        );
        assert_eq!(schema.screen_collections, vec!["screenList"]);
    }
}
