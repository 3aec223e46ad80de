//! SessionHandle - async API over the session actor

use super::commands::{ReadMode, SessionCommand};
use super::{InitTarget, Outcome, Session, SessionActor};
use crate::config::WatchConfig;
use crate::error::{PathError, RegistryError};
use crate::state::MirrorSnapshot;
use anyhow::{anyhow, Result};
use serde_json::Value;
use tokio::sync::{mpsc, oneshot};

/// Cloneable handle to a running [`SessionActor`]
///
/// Network traffic goes through the fire-and-forget methods. Queries wait
/// for the actor; they fail once the actor has stopped.
#[derive(Clone)]
pub struct SessionHandle {
    cmd_tx: mpsc::UnboundedSender<SessionCommand>,
}

impl SessionHandle {
    pub fn new(cmd_tx: mpsc::UnboundedSender<SessionCommand>) -> Self {
        Self { cmd_tx }
    }

    /// Spawn an actor owning `session`
    pub fn spawn(session: Session) -> Self {
        SessionActor::spawn(session)
    }

    // =========================================================================
    // Fire-and-forget
    // =========================================================================

    /// Queue the leaves of one network message
    pub fn apply_message(&self, updates: Vec<(String, Value)>) {
        let _ = self.cmd_tx.send(SessionCommand::ApplyMessage { updates });
    }

    pub fn set_connection_id(&self, id: impl Into<String>) {
        let _ = self.cmd_tx.send(SessionCommand::SetConnectionId { id: id.into() });
    }

    // =========================================================================
    // Queries
    // =========================================================================

    pub async fn apply(&self, path: &str, value: Value) -> Result<Outcome> {
        let outcome = self
            .request(|response| SessionCommand::Apply {
                path: path.to_string(),
                value,
                response,
            })
            .await?;
        Ok(outcome?)
    }

    /// Literal read
    pub async fn get(&self, path: &str) -> Result<Option<Value>> {
        self.read(path, ReadMode::Literal).await
    }

    /// Read after resolving `$pgm`, `$pvw` and `$sel`
    pub async fn get_resolved(&self, path: &str) -> Result<Option<Value>> {
        self.read(path, ReadMode::Resolved).await
    }

    async fn read(&self, path: &str, mode: ReadMode) -> Result<Option<Value>> {
        let value: Result<Option<Value>, PathError> = self
            .request(|response| SessionCommand::Get {
                path: path.to_string(),
                mode,
                response,
            })
            .await?;
        Ok(value?)
    }

    pub async fn watch(&self, watch: WatchConfig) -> Result<()> {
        let registered: Result<(), RegistryError> = self
            .request(|response| SessionCommand::Watch { watch, response })
            .await?;
        Ok(registered?)
    }

    pub async fn unwatch(&self, name: &str) -> Result<bool> {
        self.request(|response| SessionCommand::Unwatch {
            name: name.to_string(),
            response,
        })
        .await
    }

    pub async fn sync_watches(&self, watches: Vec<WatchConfig>) -> Result<Outcome> {
        let outcome = self
            .request(|response| SessionCommand::SyncWatches { watches, response })
            .await?;
        Ok(outcome?)
    }

    /// Initialize and notify once
    pub async fn prime(&self, target: InitTarget) -> Result<Outcome> {
        self.request(|response| SessionCommand::Prime { target, response })
            .await
    }

    /// Names of the active subscriptions
    pub async fn subscriptions(&self) -> Result<Vec<String>> {
        self.request(|response| SessionCommand::Subscriptions { response })
            .await
    }

    pub async fn snapshot(&self) -> Result<MirrorSnapshot> {
        self.request(|response| SessionCommand::Snapshot { response })
            .await
    }

    pub async fn restore(&self, snapshot: MirrorSnapshot) -> Result<()> {
        self.request(|response| SessionCommand::Restore { snapshot, response })
            .await
    }

    async fn request<T, F>(&self, build: F) -> Result<T>
    where
        F: FnOnce(oneshot::Sender<T>) -> SessionCommand,
    {
        let (response_tx, response_rx) = oneshot::channel();
        self.cmd_tx
            .send(build(response_tx))
            .map_err(|_| anyhow!("session actor has stopped"))?;
        response_rx
            .await
            .map_err(|_| anyhow!("session actor dropped the request"))
    }
}
