//! Item persistence worker.
//!
//! DESIGN
//! ======
//! The engine applies every edit locally and hands back `Action`s. The
//! session forwards the item actions to a single background task over a
//! bounded mpsc queue and moves on without waiting (optimistic updates).
//! The worker issues the store calls in queue order, so an update never
//! overtakes the create it depends on.
//!
//! When a create returns a canonical record with a different id, the worker
//! remembers the mapping and rewrites later commands that still carry the
//! local id. The canonical record goes back to the session together with
//! the record that was sent, so the engine can tell fields the store
//! assigned from edits the user made while the create was in flight.
//!
//! ERROR HANDLING
//! ==============
//! Store failures are logged and reported on the outcome channel. Local
//! state is never rolled back; the host decides whether to offer a retry
//! (`PersistError::retryable`).

use std::collections::HashMap;
use std::sync::Arc;

use canvas::doc::{CanvasItem, ItemId, ItemPatch};
use canvas::engine::Action;
use canvas::persist::{ItemPersistence, PersistError, ProjectId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::HostError;

/// Which collaborator call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistOp {
    Create,
    Update,
    Delete,
    SaveCamera,
    LoadCamera,
    ResolveImage,
}

/// A collaborator failure surfaced to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistFailure {
    pub op: PersistOp,
    pub item: Option<ItemId>,
    pub error: PersistError,
}

/// Messages from background workers back to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum PersistOutcome {
    /// The store accepted `sent`; `canonical` may carry a new id or
    /// store-assigned fields.
    Created { sent: CanvasItem, canonical: CanvasItem },
    Failed(PersistFailure),
}

/// One unit of work for the worker.
#[derive(Debug)]
enum PersistCommand {
    Create(CanvasItem),
    Update { id: ItemId, patch: ItemPatch },
    Delete(ItemId),
    /// Answered once every command queued before it has completed.
    Flush(oneshot::Sender<()>),
}

impl PersistCommand {
    fn from_action(action: &Action) -> Option<Self> {
        match action {
            Action::ItemCreated(item) => Some(Self::Create(item.clone())),
            Action::ItemUpdated { id, patch } => Some(Self::Update { id: *id, patch: patch.clone() }),
            Action::ItemDeleted { id } => Some(Self::Delete(*id)),
            Action::CameraChanged(_) | Action::StrokeFinished { .. } | Action::RenderNeeded => None,
        }
    }
}

/// Handle to the running worker.
pub struct PersistHandle {
    tx: mpsc::Sender<PersistCommand>,
    task: JoinHandle<()>,
}

/// Spawn the item persistence worker for `project`.
pub fn spawn_persistence_worker(
    store: Arc<dyn ItemPersistence>,
    project: ProjectId,
    capacity: usize,
    outcomes: mpsc::UnboundedSender<PersistOutcome>,
) -> PersistHandle {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let task = tokio::spawn(run_worker(store, project, rx, outcomes));
    info!(%project, capacity, "item persistence worker started");
    PersistHandle { tx, task }
}

impl PersistHandle {
    /// Queue the persistence part of `actions`. Returns how many commands
    /// were queued.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if the worker has exited.
    pub async fn enqueue(&self, actions: &[Action]) -> Result<usize, HostError> {
        let mut queued = 0;
        for command in actions.iter().filter_map(PersistCommand::from_action) {
            self.tx.send(command).await.map_err(|_| HostError::WorkerStopped("item persistence"))?;
            queued += 1;
        }
        Ok(queued)
    }

    /// Wait until everything queued so far has been written (or has failed).
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if the worker has exited.
    pub async fn flush(&self) -> Result<(), HostError> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(PersistCommand::Flush(done))
            .await
            .map_err(|_| HostError::WorkerStopped("item persistence"))?;
        wait.await.map_err(|_| HostError::WorkerStopped("item persistence"))
    }

    /// Close the queue and wait for the worker to drain it.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!(error = %e, "item persistence worker panicked");
        }
    }
}

async fn run_worker(
    store: Arc<dyn ItemPersistence>,
    project: ProjectId,
    mut rx: mpsc::Receiver<PersistCommand>,
    outcomes: mpsc::UnboundedSender<PersistOutcome>,
) {
    let mut canonical_ids: HashMap<ItemId, ItemId> = HashMap::new();
    while let Some(command) = rx.recv().await {
        let outcome = match command {
            PersistCommand::Flush(done) => {
                let _ = done.send(());
                continue;
            }
            PersistCommand::Create(item) => create(&*store, project, item, &mut canonical_ids).await,
            PersistCommand::Update { id, patch } => {
                let id = resolve_id(&canonical_ids, id);
                match store.update_item(project, id, &patch).await {
                    Ok(_) => {
                        debug!(%id, "item update persisted");
                        None
                    }
                    Err(e) => Some(failed(PersistOp::Update, Some(id), e)),
                }
            }
            PersistCommand::Delete(id) => {
                let id = resolve_id(&canonical_ids, id);
                match store.delete_item(project, id).await {
                    Ok(()) => {
                        debug!(%id, "item delete persisted");
                        None
                    }
                    Err(e) => Some(failed(PersistOp::Delete, Some(id), e)),
                }
            }
        };
        if let Some(outcome) = outcome {
            if outcomes.send(outcome).is_err() {
                debug!("outcome receiver dropped");
            }
        }
    }
    info!(%project, "item persistence worker stopped");
}

async fn create(
    store: &dyn ItemPersistence,
    project: ProjectId,
    item: CanvasItem,
    canonical_ids: &mut HashMap<ItemId, ItemId>,
) -> Option<PersistOutcome> {
    let local_id = item.id;
    let created = store.create_item(project, &item).await;
    match created {
        Ok(canonical) => {
            if canonical.id != local_id {
                debug!(%local_id, canonical_id = %canonical.id, "store assigned canonical id");
                canonical_ids.insert(local_id, canonical.id);
            }
            Some(PersistOutcome::Created { sent: item, canonical })
        }
        Err(e) => Some(failed(PersistOp::Create, Some(local_id), e)),
    }
}

fn resolve_id(canonical_ids: &HashMap<ItemId, ItemId>, id: ItemId) -> ItemId {
    canonical_ids.get(&id).copied().unwrap_or(id)
}

pub(crate) fn failed(op: PersistOp, item: Option<ItemId>, error: PersistError) -> PersistOutcome {
    error!(?op, item = ?item, code = error.error_code(), error = %error, "persistence call failed");
    PersistOutcome::Failed(PersistFailure { op, item, error })
}

#[cfg(test)]
#[path = "persistence_test.rs"]
mod tests;
