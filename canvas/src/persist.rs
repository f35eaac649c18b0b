//! Collaborator interfaces at the engine boundary.
//!
//! The engine itself is synchronous and never awaits these. The host calls
//! them in the background after applying changes locally (optimistic
//! updates) and feeds canonical records back through
//! [`crate::engine::EngineCore::reconcile_item`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::camera::Camera;
use crate::doc::{CanvasItem, ImageRef, ItemId, ItemPatch};

/// Identifier of the project (board) a canvas belongs to.
pub type ProjectId = Uuid;

/// Errors reported by persistence collaborators.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PersistError {
    /// The backing store could not be reached.
    #[error("persistence unavailable: {0}")]
    Unavailable(String),
    #[error("record not found: {0}")]
    NotFound(ItemId),
    /// The backing store refused the write.
    #[error("write rejected: {0}")]
    Rejected(String),
}

impl PersistError {
    #[must_use]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Unavailable(_) => "E_PERSIST_UNAVAILABLE",
            Self::NotFound(_) => "E_PERSIST_NOT_FOUND",
            Self::Rejected(_) => "E_PERSIST_REJECTED",
        }
    }

    /// Whether offering the user a retry makes sense.
    #[must_use]
    pub fn retryable(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }
}

/// Background grid shown behind the canvas; persisted with the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GridSettings {
    pub enabled: bool,
    pub size: f64,
}

impl Default for GridSettings {
    fn default() -> Self {
        Self { enabled: false, size: 20.0 }
    }
}

/// Persisted camera record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraState {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
    #[serde(default)]
    pub grid_settings: GridSettings,
}

impl CameraState {
    #[must_use]
    pub fn new(camera: Camera, grid_settings: GridSettings) -> Self {
        Self { zoom: camera.zoom, pan_x: camera.x, pan_y: camera.y, grid_settings }
    }

    /// The camera part, unvalidated. `Camera::restore` validates on apply.
    #[must_use]
    pub fn camera(&self) -> Camera {
        Camera { x: self.pan_x, y: self.pan_y, zoom: self.zoom }
    }
}

/// Intrinsic image metadata resolved before an image item is committed.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ImageMeta {
    pub width: f64,
    pub height: f64,
}

/// Item CRUD against the backing store.
#[async_trait]
pub trait ItemPersistence: Send + Sync {
    /// Create a record; returns the canonical item (the id or size may differ).
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the write fails.
    async fn create_item(&self, project: ProjectId, item: &CanvasItem) -> Result<CanvasItem, PersistError>;

    /// Apply a sparse update; returns the canonical item.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the write fails or the record is unknown.
    async fn update_item(&self, project: ProjectId, id: ItemId, patch: &ItemPatch) -> Result<CanvasItem, PersistError>;

    /// Delete a record.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the delete fails.
    async fn delete_item(&self, project: ProjectId, id: ItemId) -> Result<(), PersistError>;

    /// All items of a project.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the read fails.
    async fn list_items(&self, project: ProjectId) -> Result<Vec<CanvasItem>, PersistError>;
}

/// Camera state storage.
#[async_trait]
pub trait CameraPersistence: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the write fails.
    async fn save_camera_state(&self, project: ProjectId, state: &CameraState) -> Result<(), PersistError>;

    /// `Ok(None)` when the project has never saved a camera.
    ///
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the read fails.
    async fn load_camera_state(&self, project: ProjectId) -> Result<Option<CameraState>, PersistError>;
}

/// Resolves image metadata (dimensions) for an image handle.
#[async_trait]
pub trait ImageResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`PersistError`] if the image cannot be loaded.
    async fn resolve(&self, image: &ImageRef) -> Result<ImageMeta, PersistError>;
}
