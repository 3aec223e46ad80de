//! Commands accepted by the session actor
//!
//! Network traffic is fire-and-forget; everything a caller waits on carries
//! a oneshot responder.

use super::{InitTarget, Outcome};
use crate::config::WatchConfig;
use crate::error::{PathError, RegistryError};
use crate::state::MirrorSnapshot;
use serde_json::Value;
use tokio::sync::oneshot;

/// How a read addresses the mirror
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadMode {
    Literal,
    Resolved,
}

pub enum SessionCommand {
    // -------------------------------------------------------------------------
    // Fire and forget
    // -------------------------------------------------------------------------
    /// Leaves of one network message, applied in order then swept
    ApplyMessage { updates: Vec<(String, Value)> },

    /// Connection identity assigned by the device
    SetConnectionId { id: String },

    // -------------------------------------------------------------------------
    // Request / response
    // -------------------------------------------------------------------------
    /// Single update (symbolic segments resolved first)
    Apply {
        path: String,
        value: Value,
        response: oneshot::Sender<Result<Outcome, PathError>>,
    },

    Get {
        path: String,
        mode: ReadMode,
        response: oneshot::Sender<Result<Option<Value>, PathError>>,
    },

    Watch {
        watch: WatchConfig,
        response: oneshot::Sender<Result<(), RegistryError>>,
    },

    Unwatch {
        name: String,
        response: oneshot::Sender<bool>,
    },

    /// Replace all runtime watches (config reload)
    SyncWatches {
        watches: Vec<WatchConfig>,
        response: oneshot::Sender<Result<Outcome, RegistryError>>,
    },

    Prime {
        target: InitTarget,
        response: oneshot::Sender<Outcome>,
    },

    Subscriptions {
        response: oneshot::Sender<Vec<String>>,
    },

    Snapshot {
        response: oneshot::Sender<MirrorSnapshot>,
    },

    Restore {
        snapshot: MirrorSnapshot,
        response: oneshot::Sender<()>,
    },
}

impl SessionCommand {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            SessionCommand::ApplyMessage { .. } => "apply_message",
            SessionCommand::SetConnectionId { .. } => "set_connection_id",
            SessionCommand::Apply { .. } => "apply",
            SessionCommand::Get { .. } => "get",
            SessionCommand::Watch { .. } => "watch",
            SessionCommand::Unwatch { .. } => "unwatch",
            SessionCommand::SyncWatches { .. } => "sync_watches",
            SessionCommand::Prime { .. } => "prime",
            SessionCommand::Subscriptions { .. } => "subscriptions",
            SessionCommand::Snapshot { .. } => "snapshot",
            SessionCommand::Restore { .. } => "restore",
        }
    }
}
