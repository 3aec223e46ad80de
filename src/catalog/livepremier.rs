//! LivePremier path shapes and extras

use super::PathSchema;
use crate::subscription::{Descriptor, Scope, Update};
use serde_json::Value;

const TIMER: &str = r"^DEVICE/device/timerList/items/(\w+)/status/pp/time$";

/// Timers exposed on the front panel
const TIMERS: [&str; 4] = ["1", "2", "3", "4"];

pub(super) fn schema() -> PathSchema {
    PathSchema {
        device_root: "DEVICE/device".to_string(),
        screen_collections: vec!["screenList".to_string(), "auxiliaryScreenList".to_string()],
        program_preset: "DEVICE/device/{collection}/items/{screen}/status/pp/program".to_string(),
        screen_label: "DEVICE/device/{collection}/items/{screen}/control/pp/label".to_string(),
        preset_memory:
            "DEVICE/device/{collection}/items/{screen}/presetList/items/{preset}/status/pp/memoryId"
                .to_string(),
        preset_modified:
            "DEVICE/device/{collection}/items/{screen}/presetList/items/{preset}/status/pp/isModified"
                .to_string(),
        memory_label: "DEVICE/device/presetBank/bankList/items/{memory}/control/pp/label".to_string(),
        remote_preset_mode: "REMOTE/live/screens/presetModeSelection/presetMode".to_string(),
    }
}

pub(super) fn descriptors(_schema: &PathSchema) -> Vec<Descriptor> {
    vec![Descriptor::new("timer", TIMER)
        .reactions(["timer"])
        .handler(timer)
        .seed_list(TIMERS)]
}

fn timer(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    let Some(update) = update else {
        return Ok(false);
    };
    let Some(id) = update.group(1) else {
        return Ok(false);
    };

    scope.set_variable(&format!("timer{}", id), format_time(update.value));
    Ok(false)
}

/// Seconds as `hh:mm:ss`, negative values (overrun countdowns) get a sign
pub(super) fn format_time(value: &Value) -> String {
    let Some(seconds) = value.as_f64() else {
        return String::new();
    };
    let total = seconds.abs().floor() as u64;
    let sign = if seconds < 0.0 && total > 0 { "-" } else { "" };
    format!(
        "{}{:02}:{:02}:{:02}",
        sign,
        total / 3600,
        (total / 60) % 60,
        total % 60
    )
}
