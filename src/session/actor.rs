//! SessionActor - owns a session and processes commands one at a time

use super::commands::{ReadMode, SessionCommand};
use super::handle::SessionHandle;
use super::Session;
use tokio::sync::mpsc;
use tracing::{info, trace};

/// Task that owns the [`Session`] of one connection
///
/// Commands are handled strictly in arrival order, so a network message is
/// fully applied and swept before the next command is looked at.
pub struct SessionActor {
    session: Session,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,
    processed: u64,
}

impl SessionActor {
    /// Move `session` into a new task and return a handle to it
    pub fn spawn(session: Session) -> SessionHandle {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();

        let actor = SessionActor {
            session,
            command_rx: cmd_rx,
            processed: 0,
        };
        tokio::spawn(actor.run());

        SessionHandle::new(cmd_tx)
    }

    /// Runs until every handle has been dropped
    async fn run(mut self) {
        info!("Session actor started ({})", self.session.family());

        while let Some(cmd) = self.command_rx.recv().await {
            trace!("Session command: {}", cmd.kind());
            self.handle_command(cmd);
            self.processed += 1;
        }

        self.session.disconnect();
        info!("Session actor stopped after {} command(s)", self.processed);
    }

    fn handle_command(&mut self, cmd: SessionCommand) {
        // Responders may have been dropped by callers that gave up waiting
        match cmd {
            SessionCommand::ApplyMessage { updates } => {
                self.session.apply_message(updates);
            }
            SessionCommand::SetConnectionId { id } => {
                self.session.set_connection_id(&id);
            }
            SessionCommand::Apply {
                path,
                value,
                response,
            } => {
                let _ = response.send(self.session.apply(&path, value));
            }
            SessionCommand::Get {
                path,
                mode,
                response,
            } => {
                let value = match mode {
                    ReadMode::Literal => self.session.get(&path),
                    ReadMode::Resolved => self.session.get_resolved(&path),
                };
                let _ = response.send(value.map(|v| v.cloned()));
            }
            SessionCommand::Watch { watch, response } => {
                let _ = response.send(self.session.watch(&watch));
            }
            SessionCommand::Unwatch { name, response } => {
                let _ = response.send(self.session.unwatch(&name));
            }
            SessionCommand::SyncWatches { watches, response } => {
                let _ = response.send(self.session.sync_watches(&watches));
            }
            SessionCommand::Prime { target, response } => {
                let _ = response.send(self.session.prime(&target));
            }
            SessionCommand::Subscriptions { response } => {
                let _ = response.send(self.session.registry().list());
            }
            SessionCommand::Snapshot { response } => {
                let _ = response.send(self.session.snapshot());
            }
            SessionCommand::Restore { snapshot, response } => {
                self.session.restore(&snapshot);
                let _ = response.send(());
            }
        }
    }
}
