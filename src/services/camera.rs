//! Debounced camera saver.
//!
//! DESIGN
//! ======
//! Pans and zooms arrive at input rate. A background task keeps only the
//! latest camera and writes it once no update has arrived for the debounce
//! window. A flush (or shutdown) writes the pending value immediately.
//!
//! ERROR HANDLING
//! ==============
//! A failed save is reported on the outcome channel and the value is
//! dropped; the next camera change schedules a fresh save.

use std::sync::Arc;
use std::time::Duration;

use canvas::persist::{CameraPersistence, CameraState, ProjectId};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info};

use super::persistence::{PersistOp, PersistOutcome, failed};
use crate::error::HostError;

const CAMERA_QUEUE_CAPACITY: usize = 64;

#[derive(Debug)]
enum CameraCommand {
    Update(CameraState),
    Flush(oneshot::Sender<()>),
}

pub struct CameraSaver {
    tx: mpsc::Sender<CameraCommand>,
    task: JoinHandle<()>,
}

/// Spawn the camera saver for `project`.
pub fn spawn_camera_saver(
    store: Arc<dyn CameraPersistence>,
    project: ProjectId,
    debounce: Duration,
    outcomes: mpsc::UnboundedSender<PersistOutcome>,
) -> CameraSaver {
    let (tx, rx) = mpsc::channel(CAMERA_QUEUE_CAPACITY);
    let task = tokio::spawn(run_saver(store, project, debounce, rx, outcomes));
    info!(%project, debounce_ms = debounce.as_millis(), "camera saver started");
    CameraSaver { tx, task }
}

impl CameraSaver {
    /// Schedule `state` to be saved after the quiet window.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if the saver has exited.
    pub async fn update(&self, state: CameraState) -> Result<(), HostError> {
        self.tx
            .send(CameraCommand::Update(state))
            .await
            .map_err(|_| HostError::WorkerStopped("camera saver"))
    }

    /// Save any pending camera now.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if the saver has exited.
    pub async fn flush(&self) -> Result<(), HostError> {
        let (done, wait) = oneshot::channel();
        self.tx
            .send(CameraCommand::Flush(done))
            .await
            .map_err(|_| HostError::WorkerStopped("camera saver"))?;
        wait.await.map_err(|_| HostError::WorkerStopped("camera saver"))
    }

    /// Stop the saver. A pending camera is written first.
    pub async fn shutdown(self) {
        drop(self.tx);
        if let Err(e) = self.task.await {
            error!(error = %e, "camera saver panicked");
        }
    }
}

async fn run_saver(
    store: Arc<dyn CameraPersistence>,
    project: ProjectId,
    debounce: Duration,
    mut rx: mpsc::Receiver<CameraCommand>,
    outcomes: mpsc::UnboundedSender<PersistOutcome>,
) {
    let mut pending: Option<CameraState> = None;
    let mut deadline: Option<Instant> = None;

    loop {
        tokio::select! {
            command = rx.recv() => match command {
                Some(CameraCommand::Update(state)) => {
                    pending = Some(state);
                    deadline = Some(Instant::now() + debounce);
                }
                Some(CameraCommand::Flush(done)) => {
                    deadline = None;
                    save(&*store, project, pending.take(), &outcomes).await;
                    let _ = done.send(());
                }
                None => {
                    save(&*store, project, pending.take(), &outcomes).await;
                    break;
                }
            },
            () = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                deadline = None;
                save(&*store, project, pending.take(), &outcomes).await;
            }
        }
    }
    info!(%project, "camera saver stopped");
}

async fn save(
    store: &dyn CameraPersistence,
    project: ProjectId,
    state: Option<CameraState>,
    outcomes: &mpsc::UnboundedSender<PersistOutcome>,
) {
    let Some(state) = state else {
        return;
    };
    match store.save_camera_state(project, &state).await {
        Ok(()) => debug!(zoom = state.zoom, pan_x = state.pan_x, pan_y = state.pan_y, "camera saved"),
        Err(e) => {
            if outcomes.send(failed(PersistOp::SaveCamera, None, e)).is_err() {
                debug!("outcome receiver dropped");
            }
        }
    }
}

#[cfg(test)]
#[path = "camera_test.rs"]
mod tests;
