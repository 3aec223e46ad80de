//! Entries shared by every product family

use super::{screen_variable, PathSchema};
use crate::path::{Namespace, Path, ResolveContext};
use crate::sinks::display_value;
use crate::state::local;
use crate::subscription::{Descriptor, Scope, Update};
use serde_json::Value;
use tracing::debug;

const SCREEN_SELECTION: &str = r"^REMOTE/live/screens/screenAuxSelection$";
const SCREEN_LOCK: &str = r"^REMOTE/live/screens/screenAuxLock/items/(\w+)$";
const LOCAL_SCREEN_LOCK: &str = r"^LOCAL/screenLocks/(\w+)$";
const SOCKET_ID: &str = r"^LOCAL/socketId$";

/// Presets every screen carries
pub(super) const PRESETS: [&str; 2] = ["A", "B"];

pub(super) fn descriptors(schema: &PathSchema) -> Vec<Descriptor> {
    vec![
        Descriptor::new("liveScreenSelection", SCREEN_SELECTION).reactions(["liveScreenSelection"]),
        Descriptor::new("syncScreenSelection", SCREEN_SELECTION).handler(sync_selection),
        Descriptor::new("screenLock", SCREEN_LOCK)
            .reactions(["screenLock"])
            .handler(sync_lock)
            .seed_with(|ctx| {
                ctx.screens()
                    .into_iter()
                    .map(|(_, screen)| format!("REMOTE/live/screens/screenAuxLock/items/{}", screen))
                    .collect()
            }),
        Descriptor::new("localScreenLock", LOCAL_SCREEN_LOCK).reactions(["screenLock"]),
        Descriptor::new(
            "remotePresetMode",
            format!("^{}$", regex::escape(&schema.remote_preset_mode)),
        )
        .reactions(["presetMode", "memoryOnScreen"])
        .handler(preset_mode),
        Descriptor::new("localPresetMode", format!("^{}$", regex::escape(local::PRESET_MODE)))
            .reactions(["presetMode", "memoryOnScreen"])
            .handler(preset_mode),
        Descriptor::new("programPreset", schema.pattern(&schema.program_preset))
            .reactions(["programPreset", "memoryOnScreen"])
            .handler(program_preset)
            .seed_with(|ctx| {
                let schema = ctx.schema();
                ctx.screens()
                    .into_iter()
                    .map(|(collection, screen)| {
                        schema.screen_wire(&schema.program_preset, &collection, &screen)
                    })
                    .collect()
            }),
        Descriptor::new("memoryOnScreen", schema.pattern(&schema.preset_memory))
            .reactions(["memoryOnScreen"])
            .handler(memory_update)
            .seed_with(|ctx| preset_seeds(ctx, &ctx.schema().preset_memory)),
        Descriptor::new("memoryModified", schema.pattern(&schema.preset_modified))
            .reactions(["memoryOnScreen"])
            .handler(memory_update)
            .seed_with(|ctx| preset_seeds(ctx, &ctx.schema().preset_modified)),
        Descriptor::new("screenLabel", schema.pattern(&schema.screen_label))
            .reactions(["screenLabel"])
            .handler(screen_label)
            .seed_with(|ctx| {
                let schema = ctx.schema();
                ctx.screens()
                    .into_iter()
                    .map(|(collection, screen)| {
                        schema.screen_wire(&schema.screen_label, &collection, &screen)
                    })
                    .collect()
            }),
        Descriptor::new("freeze", r"/control/pp/freeze$").reactions(["freeze"]),
        Descriptor::new("connection", SOCKET_ID)
            .reactions(["connection"])
            .handler(connection_id),
    ]
}

fn preset_seeds(ctx: &crate::state::MirrorContext<'_>, template: &str) -> Vec<String> {
    let schema = ctx.schema();
    ctx.screens()
        .into_iter()
        .flat_map(|(collection, screen)| {
            PRESETS
                .iter()
                .map(|preset| schema.preset_wire(template, &collection, &screen, preset))
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Mirror the device selection into the local namespace while synced
fn sync_selection(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    let Some(update) = update else {
        let selected = scope
            .get_wire(local::SCREEN_SELECTION)
            .map(selection_names)
            .unwrap_or_default();
        scope.set_variable("selectedScreens", selected.join(","));
        return Ok(false);
    };

    if !scope.settings().sync_selection || update.value.is_null() {
        return Ok(false);
    }

    let local = Path::parse(local::SCREEN_SELECTION)?;
    scope.set(&local, update.value.clone());
    Ok(false)
}

/// Keys of a selection node, either a list of names or a map of flags
fn selection_names(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().map(display_value).collect(),
        Value::Object(map) => map
            .iter()
            .filter(|(_, v)| v.as_bool().unwrap_or(false))
            .map(|(k, _)| k.clone())
            .collect(),
        _ => Vec::new(),
    }
}

fn sync_lock(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    let Some(update) = update else {
        return Ok(false);
    };
    let Some(screen) = update.group(1) else {
        return Ok(false);
    };

    if scope.settings().sync_selection && !update.value.is_null() {
        let local = Path::parse(local::SCREEN_LOCKS)?.join(screen);
        scope.set(&local, update.value.clone());
    }
    Ok(false)
}

/// Publish the active preset mode; a relevant change moves every `$sel`
fn preset_mode(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    let Some(update) = update else {
        return Ok(false);
    };

    let synced = scope.settings().sync_selection;
    let relevant = match update.path.namespace() {
        Namespace::Remote => synced,
        Namespace::Local => !synced,
        Namespace::Device => false,
    };
    if !relevant {
        return Ok(false);
    }

    let mode = scope.context().preset_mode();
    scope.set_variable("presetMode", mode.map(|m| m.as_str()).unwrap_or_default());
    publish_all_memories(scope)?;
    Ok(mode.is_some())
}

/// Program assignment changed: symbolic paths on that screen now resolve
/// elsewhere
fn program_preset(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    let Some(update) = update else {
        return Ok(false);
    };
    let (Some(collection), Some(screen)) = (update.group(1), update.group(2)) else {
        return Ok(false);
    };
    if update.value.is_null() {
        return Ok(false);
    }

    let prefix = screen_variable(collection, screen);
    scope.set_variable(&format!("{}program", prefix), display_value(update.value));
    for preset in PRESETS {
        publish_memory(scope, collection, screen, preset)?;
    }
    Ok(true)
}

fn memory_update(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    match update {
        Some(update) => {
            let (Some(collection), Some(screen), Some(preset)) =
                (update.group(1), update.group(2), update.group(3))
            else {
                return Ok(false);
            };
            publish_memory(scope, collection, screen, preset)?;
        }
        None => publish_all_memories(scope)?,
    }
    Ok(false)
}

fn publish_all_memories(scope: &Scope<'_>) -> anyhow::Result<()> {
    let screens = scope.context().screens();
    for (collection, screen) in screens {
        for preset in PRESETS {
            publish_memory(scope, &collection, &screen, preset)?;
        }
    }
    Ok(())
}

/// Label of the memory loaded in a preset, `*` appended when modified
///
/// Published as `<screen>pgmMemory` or `<screen>pvwMemory` depending on
/// where the preset currently sits.
fn publish_memory(
    scope: &Scope<'_>,
    collection: &str,
    screen: &str,
    preset: &str,
) -> anyhow::Result<()> {
    let ctx = scope.context();
    let Some(program) = ctx.program_preset(collection, screen) else {
        debug!("No program preset known for {}/{}", collection, screen);
        return Ok(());
    };
    let slot = if program == preset { "pgm" } else { "pvw" };

    let schema = scope.schema();
    let memory = scope
        .get(&schema.preset_memory_path(collection, screen, preset)?)
        .map(display_value)
        .unwrap_or_default();

    let mut label = if memory.is_empty() || memory == "0" {
        String::new()
    } else {
        scope
            .get(&schema.memory_label_path(&memory)?)
            .and_then(Value::as_str)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("Memory {}", memory))
    };

    let modified = scope
        .get(&schema.preset_modified_path(collection, screen, preset)?)
        .and_then(Value::as_bool)
        .unwrap_or(false);
    if modified && !label.is_empty() {
        label.push('*');
    }

    let name = format!("{}{}Memory", screen_variable(collection, screen), slot);
    scope.set_variable(&name, label);
    Ok(())
}

fn screen_label(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    let Some(update) = update else {
        return Ok(false);
    };
    let (Some(collection), Some(screen)) = (update.group(1), update.group(2)) else {
        return Ok(false);
    };

    let name = format!("{}label", screen_variable(collection, screen));
    scope.set_variable(&name, display_value(update.value));
    Ok(false)
}

fn connection_id(scope: &mut Scope<'_>, update: Option<Update<'_>>) -> anyhow::Result<bool> {
    if let Some(update) = update {
        scope.set_variable("connectionId", display_value(update.value));
    }
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ProductFamily;
    use crate::sinks::VariableStore;
    use crate::path::PresetMode;
    use crate::state::{SessionSettings, StateMirror};
    use serde_json::json;

    fn run(
        schema: &PathSchema,
        mirror: &mut StateMirror,
        variables: &VariableStore,
        settings: &SessionSettings,
        wire: &str,
        value: Value,
        handler: fn(&mut Scope<'_>, Option<Update<'_>>) -> anyhow::Result<bool>,
        groups: &[&str],
    ) -> bool {
        let path = Path::parse(wire).unwrap();
        mirror.set(&path, value.clone());
        let groups: Vec<String> = groups.iter().map(|g| g.to_string()).collect();
        let mut scope = Scope::new(mirror, schema, settings, variables);
        handler(
            &mut scope,
            Some(Update {
                path: &path,
                value: &value,
                groups: &groups,
            }),
        )
        .unwrap()
    }

    #[test]
    fn test_memory_label_with_modified_flag() {
        let schema = ProductFamily::LivePremier.schema();
        let settings = SessionSettings::default();
        let variables = VariableStore::new();
        let mut mirror = StateMirror::new();
        mirror.set(
            &schema.memory_label_path("7").unwrap(),
            json!("Opening"),
        );
        mirror.set(
            &schema.preset_modified_path("screenList", "S1", "A").unwrap(),
            json!(true),
        );

        let refresh = run(
            &schema,
            &mut mirror,
            &variables,
            &settings,
            "DEVICE/device/screenList/items/S1/status/pp/program",
            json!("A"),
            program_preset,
            &["screenList", "S1"],
        );
        assert!(refresh);
        assert_eq!(variables.get("screen1program").as_deref(), Some("A"));

        let wire = schema.preset_wire(&schema.preset_memory, "screenList", "S1", "A");
        run(
            &schema,
            &mut mirror,
            &variables,
            &settings,
            &wire,
            json!(7),
            memory_update,
            &["screenList", "S1", "A"],
        );
        assert_eq!(variables.get("screen1pgmMemory").as_deref(), Some("Opening*"));
    }

    #[test]
    fn test_selection_copied_only_when_synced() {
        let schema = ProductFamily::LivePremier.schema();
        let variables = VariableStore::new();
        let mut mirror = StateMirror::new();

        let unsynced = SessionSettings { sync_selection: false };
        run(
            &schema,
            &mut mirror,
            &variables,
            &unsynced,
            "REMOTE/live/screens/screenAuxSelection",
            json!(["S1"]),
            sync_selection,
            &[],
        );
        assert!(mirror.get(&Path::parse(local::SCREEN_SELECTION).unwrap()).is_none());

        let synced = SessionSettings::default();
        run(
            &schema,
            &mut mirror,
            &variables,
            &synced,
            "REMOTE/live/screens/screenAuxSelection",
            json!(["S1", "S2"]),
            sync_selection,
            &[],
        );
        assert_eq!(
            mirror.get(&Path::parse(local::SCREEN_SELECTION).unwrap()),
            Some(&json!(["S1", "S2"]))
        );

        let mut scope = Scope::new(&mut mirror, &schema, &synced, &variables);
        sync_selection(&mut scope, None).unwrap();
        assert_eq!(variables.get("selectedScreens").as_deref(), Some("S1,S2"));
    }

    #[test]
    fn test_preset_mode_relevance() {
        let schema = ProductFamily::LivePremier.schema();
        let variables = VariableStore::new();
        let mut mirror = StateMirror::new();
        let settings = SessionSettings::default();

        let local_change = run(
            &schema,
            &mut mirror,
            &variables,
            &settings,
            local::PRESET_MODE,
            json!("PROGRAM"),
            preset_mode,
            &[],
        );
        assert!(!local_change);

        let remote = schema.remote_preset_mode.clone();
        let remote_change = run(
            &schema,
            &mut mirror,
            &variables,
            &settings,
            &remote,
            json!("PREVIEW"),
            preset_mode,
            &[],
        );
        assert!(remote_change);
        assert_eq!(
            variables.get("presetMode").as_deref(),
            Some(PresetMode::Preview.as_str())
        );
    }

    #[test]
    fn test_selection_names_from_flags() {
        assert_eq!(
            selection_names(&json!({"S1": true, "S2": false, "A1": true})),
            vec!["A1", "S1"]
        );
    }
}
