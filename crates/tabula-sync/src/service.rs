//! Async driver around a [`TableStore`]
//!
//! A single tokio task owns the store. Events arrive over a channel, effects
//! run as spawned tasks against the [`FetchCollaborator`], and their results
//! re-enter the same channel as ordinary events. Observers subscribe to
//! [`TableChange`] notifications.

use crate::error::{SyncError, SyncResult};
use crate::events::{Effect, TableEvent};
use crate::fetch::{FetchCollaborator, fetch_failure, find_index};
use crate::propagate::IdentityLink;
use crate::store::TableStore;
use std::sync::Arc;
use tabula_core::{EngineConfig, TabulaError};
use tabula_table::{TableModel, TableStatus};
use tokio::sync::{broadcast, mpsc, oneshot};

const CHANGE_CAPACITY: usize = 256;

/// A table changed; `status` is `None` once the table was removed
#[derive(Debug, Clone, PartialEq)]
pub struct TableChange {
    pub tbl_id: String,
    pub status: Option<TableStatus>,
}

enum Command {
    Event(TableEvent),
    Snapshot {
        tbl_id: String,
        reply: oneshot::Sender<Option<TableModel>>,
    },
    Link(IdentityLink),
    Shutdown,
}

/// Handle to a running table service. Cloning shares the same task.
#[derive(Clone)]
pub struct TableService {
    commands: mpsc::UnboundedSender<Command>,
    changes: broadcast::Sender<TableChange>,
}

impl TableService {
    /// Start the service on the current tokio runtime
    pub fn spawn(collaborator: Arc<dyn FetchCollaborator>, config: EngineConfig) -> Self {
        let (commands, receiver) = mpsc::unbounded_channel();
        let (changes, _) = broadcast::channel(CHANGE_CAPACITY);

        let worker = Worker {
            store: TableStore::new(config),
            collaborator,
            commands: commands.downgrade(),
            changes: changes.clone(),
        };
        tokio::spawn(worker.run(receiver));
        tracing::debug!("table service started");

        Self { commands, changes }
    }

    pub fn send(&self, event: TableEvent) -> SyncResult<()> {
        self.command(Command::Event(event))
    }

    /// Current state of a table
    pub async fn table(&self, tbl_id: impl Into<String>) -> SyncResult<Option<TableModel>> {
        let (reply, response) = oneshot::channel();
        self.command(Command::Snapshot {
            tbl_id: tbl_id.into(),
            reply,
        })?;
        response.await.map_err(|_| SyncError::ServiceClosed)
    }

    /// Like `table`, but a missing table is an error
    pub async fn require(&self, tbl_id: &str) -> SyncResult<TableModel> {
        self.table(tbl_id)
            .await?
            .ok_or_else(|| TabulaError::TableNotFound(tbl_id.to_string()).into())
    }

    pub fn link(&self, link: IdentityLink) -> SyncResult<()> {
        self.command(Command::Link(link))
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TableChange> {
        self.changes.subscribe()
    }

    /// Stop the service; fetches still in flight are dropped when they finish
    pub fn shutdown(&self) -> SyncResult<()> {
        self.command(Command::Shutdown)
    }

    fn command(&self, command: Command) -> SyncResult<()> {
        self.commands
            .send(command)
            .map_err(|_| SyncError::ServiceClosed)
    }
}

struct Worker {
    store: TableStore,
    collaborator: Arc<dyn FetchCollaborator>,
    // weak so the task ends once every handle is gone
    commands: mpsc::WeakUnboundedSender<Command>,
    changes: broadcast::Sender<TableChange>,
}

impl Worker {
    async fn run(mut self, mut receiver: mpsc::UnboundedReceiver<Command>) {
        while let Some(command) = receiver.recv().await {
            match command {
                Command::Event(event) => self.handle(event),
                Command::Snapshot { tbl_id, reply } => {
                    let _ = reply.send(self.store.table(&tbl_id).cloned());
                }
                Command::Link(link) => self.store.link(link),
                Command::Shutdown => break,
            }
        }
        tracing::debug!("table service stopped");
    }

    fn handle(&mut self, event: TableEvent) {
        let reduction = self.store.dispatch(event);
        for tbl_id in reduction.changed {
            let status = self.store.table(&tbl_id).map(TableModel::status);
            // no subscribers is fine
            let _ = self.changes.send(TableChange { tbl_id, status });
        }
        for effect in reduction.effects {
            self.run_effect(effect);
        }
    }

    fn run_effect(&self, effect: Effect) {
        let Some(commands) = self.commands.upgrade() else {
            return;
        };
        let collaborator = self.collaborator.clone();

        match effect {
            Effect::Fetch(ticket) => {
                tokio::spawn(async move {
                    let event = match collaborator.fetch(&ticket.request).await {
                        Ok(table) => TableEvent::FetchComplete { ticket, table },
                        Err(e) => TableEvent::FetchError {
                            error: fetch_failure(&e),
                            ticket,
                        },
                    };
                    if commands.send(Command::Event(event)).is_err() {
                        tracing::debug!("fetch finished after the service stopped");
                    }
                });
            }
            Effect::FindIndex { tbl_id, filter } => {
                let Some(table) = self.store.table(&tbl_id).cloned() else {
                    return;
                };
                let config = self.store.config().clone();
                tokio::spawn(async move {
                    match find_index(collaborator.as_ref(), &table, &filter, &config).await {
                        Ok(Some(row)) => {
                            let event = TableEvent::Highlight {
                                tbl_id,
                                row: row as i64,
                            };
                            let _ = commands.send(Command::Event(event));
                        }
                        Ok(None) => {
                            tracing::debug!(%tbl_id, %filter, "no row matches highlight lookup")
                        }
                        Err(e) => tracing::warn!(%tbl_id, error = %e, "highlight lookup failed"),
                    }
                });
            }
        }
    }
}
