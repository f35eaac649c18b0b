//! Editing session: one engine bound to one project.
//!
//! DESIGN
//! ======
//! `Session` owns the `EngineCore` and the background workers that persist
//! its changes. Every engine call returns `Action`s; `dispatch` routes item
//! actions to the persistence worker and camera changes to the debounced
//! saver. Outcomes from the workers (canonical records, failures) come back
//! on one channel and are applied by `pump`, which runs before and after
//! each handled event.
//!
//! ERROR HANDLING
//! ==============
//! Collaborator failures never abort the session. They are logged, kept
//! for `take_failures`, and the local state stays as the user left it.
//! Only a stopped worker is fatal.

use std::sync::Arc;

use canvas::coords::{Point, ScreenSize};
use canvas::doc::{ImageRef, ItemId, NewItem};
use canvas::engine::{Action, EngineCore};
use canvas::input::WheelDelta;
use canvas::persist::{CameraPersistence, CameraState, GridSettings, ImageResolver, ItemPersistence, ProjectId};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::config::HostConfig;
use crate::error::HostError;
use crate::script::Event;
use crate::services::camera::{CameraSaver, spawn_camera_saver};
use crate::services::memory::{MemoryCameraStore, MemoryItemStore, StaticImageResolver};
use crate::services::persistence::{
    PersistFailure, PersistHandle, PersistOp, PersistOutcome, failed, spawn_persistence_worker,
};

/// Image size used by the in-memory resolver for unknown handles.
const FALLBACK_IMAGE_SIZE: (f64, f64) = (400.0, 400.0);

/// External systems a session talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub items: Arc<dyn ItemPersistence>,
    pub cameras: Arc<dyn CameraPersistence>,
    pub images: Arc<dyn ImageResolver>,
}

impl Collaborators {
    /// In-memory stores; every image resolves to a 400x400 placeholder.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            items: Arc::new(MemoryItemStore::new()),
            cameras: Arc::new(MemoryCameraStore::new()),
            images: Arc::new(StaticImageResolver::new().with_fallback(FALLBACK_IMAGE_SIZE.0, FALLBACK_IMAGE_SIZE.1)),
        }
    }
}

pub struct Session {
    project: ProjectId,
    engine: EngineCore,
    collaborators: Collaborators,
    persist: PersistHandle,
    camera: CameraSaver,
    grid: GridSettings,
    outcomes: mpsc::UnboundedReceiver<PersistOutcome>,
    failures: Vec<PersistFailure>,
}

impl Session {
    /// Create a session and start its workers. Must be called inside a
    /// tokio runtime.
    #[must_use]
    pub fn new(project: ProjectId, config: &HostConfig, collaborators: Collaborators) -> Self {
        let (tx, outcomes) = mpsc::unbounded_channel();
        let persist =
            spawn_persistence_worker(collaborators.items.clone(), project, config.persist_queue_capacity, tx.clone());
        let camera = spawn_camera_saver(collaborators.cameras.clone(), project, config.camera_save_debounce(), tx);
        Self {
            project,
            engine: EngineCore::with_config(config.engine),
            collaborators,
            persist,
            camera,
            grid: GridSettings::default(),
            outcomes,
            failures: Vec::new(),
        }
    }

    /// Measure the surface, load the project's items, then restore its saved
    /// camera. A missing or invalid camera leaves the default view.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Persist` if the items cannot be listed.
    pub async fn load(&mut self, screen: ScreenSize) -> Result<(), HostError> {
        self.engine.set_viewport(screen.width, screen.height);

        let items = self.collaborators.items.list_items(self.project).await?;
        let count = items.len();
        self.engine.load_items(items);

        match self.collaborators.cameras.load_camera_state(self.project).await {
            Ok(Some(saved)) => {
                self.grid = saved.grid_settings;
                if let Err(e) = self.engine.restore_camera(saved.camera()) {
                    warn!(error = %e, "saved camera rejected; using default view");
                }
            }
            Ok(None) => debug!("no saved camera"),
            Err(e) => self.record(failed(PersistOp::LoadCamera, None, e)),
        }

        let camera = self.engine.camera();
        info!(project = %self.project, items = count, zoom = camera.zoom, "session loaded");
        Ok(())
    }

    /// Feed one input event through the engine.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if a background worker has exited.
    pub async fn handle(&mut self, event: Event) -> Result<(), HostError> {
        self.pump().await?;
        let actions = match event {
            Event::PointerDown { x, y, button, modifiers } => {
                self.engine.on_pointer_down(Point::new(x, y), button, modifiers)
            }
            Event::PointerMove { x, y, modifiers } => self.engine.on_pointer_move(Point::new(x, y), modifiers),
            Event::PointerUp { x, y, button, modifiers } => {
                self.engine.on_pointer_up(Point::new(x, y), button, modifiers)
            }
            Event::PointerLeave => self.engine.on_pointer_leave(),
            Event::Wheel { x, y, dx, dy, modifiers } => {
                self.engine.on_wheel(Point::new(x, y), WheelDelta { dx, dy }, modifiers)
            }
            Event::KeyDown { key, modifiers } => self.engine.on_key_down(key, modifiers),
            Event::KeyUp { key, modifiers } => self.engine.on_key_up(key, modifiers),
            Event::SetTool { tool } => self.engine.set_tool(tool),
            Event::AddImage { image, x, y } => {
                match self.add_image_item(ImageRef::new(image), Point::new(x, y)).await {
                    Ok(_) => {}
                    Err(e @ (HostError::Persist(_) | HostError::Engine(_))) => warn!(error = %e, "image not added"),
                    Err(e) => return Err(e),
                }
                Vec::new()
            }
        };
        self.dispatch(actions).await?;
        self.pump().await
    }

    /// Two-phase image placement: resolve the image's dimensions, then
    /// commit an item of that size centred on `screen_pt` and select it.
    ///
    /// # Errors
    ///
    /// Returns `HostError::Persist` when the image cannot be resolved (also
    /// recorded as a failure) and `HostError::Engine` for unusable
    /// dimensions.
    pub async fn add_image_item(&mut self, image: ImageRef, screen_pt: Point) -> Result<ItemId, HostError> {
        let meta = match self.collaborators.images.resolve(&image).await {
            Ok(meta) => meta,
            Err(e) => {
                self.record(failed(PersistOp::ResolveImage, None, e.clone()));
                return Err(e.into());
            }
        };

        let center = self.engine.camera().screen_to_world(screen_pt);
        let new = NewItem::new(image, center.x - meta.width / 2.0, center.y - meta.height / 2.0)
            .with_size(meta.width, meta.height);
        let (id, mut actions) = self.engine.add_item(new)?;
        actions.extend(self.engine.select(&id)?);
        self.dispatch(actions).await?;
        info!(%id, width = meta.width, height = meta.height, "image item added");
        Ok(id)
    }

    /// Route engine actions to the workers.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if a worker has exited.
    pub async fn dispatch(&mut self, actions: Vec<Action>) -> Result<(), HostError> {
        for action in &actions {
            match action {
                Action::CameraChanged(camera) => {
                    self.camera.update(CameraState::new(*camera, self.grid)).await?;
                }
                Action::StrokeFinished { points, target } => {
                    info!(points = points.len(), target = ?target, "stroke finished");
                }
                Action::RenderNeeded => debug!(visible = self.engine.render_list().len(), "render"),
                Action::ItemCreated(_) | Action::ItemUpdated { .. } | Action::ItemDeleted { .. } => {}
            }
        }
        self.persist.enqueue(&actions).await?;
        Ok(())
    }

    /// Apply worker outcomes: reconcile canonical records, collect failures.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if a worker has exited.
    pub async fn pump(&mut self) -> Result<(), HostError> {
        while let Ok(outcome) = self.outcomes.try_recv() {
            match outcome {
                PersistOutcome::Created { sent, canonical } => {
                    let actions = self.engine.reconcile_item(&sent, &canonical);
                    self.dispatch(actions).await?;
                }
                PersistOutcome::Failed(failure) => self.failures.push(failure),
            }
        }
        Ok(())
    }

    /// Wait for all queued writes and the pending camera save, then apply
    /// their outcomes.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if a worker has exited.
    pub async fn flush(&mut self) -> Result<(), HostError> {
        self.persist.flush().await?;
        self.camera.flush().await?;
        self.pump().await
    }

    /// Failures collected since the last call.
    pub fn take_failures(&mut self) -> Vec<PersistFailure> {
        std::mem::take(&mut self.failures)
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut EngineCore {
        &mut self.engine
    }

    #[must_use]
    pub fn project(&self) -> ProjectId {
        self.project
    }

    /// Flush, stop the workers and return the failures not yet taken.
    ///
    /// # Errors
    ///
    /// Returns `HostError::WorkerStopped` if a worker exited before the flush.
    pub async fn shutdown(mut self) -> Result<Vec<PersistFailure>, HostError> {
        self.flush().await?;
        self.persist.shutdown().await;
        self.camera.shutdown().await;
        info!(project = %self.project, "session closed");
        Ok(self.failures)
    }

    fn record(&mut self, outcome: PersistOutcome) {
        if let PersistOutcome::Failed(failure) = outcome {
            self.failures.push(failure);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
