//! In-memory collaborators.
//!
//! DESIGN
//! ======
//! Backing stores for the headless runner and for tests. Each keeps its
//! state behind a `tokio::sync::Mutex` and supports one-shot failure
//! injection (`fail_next`) so failure paths can be exercised without a
//! real backend. `MemoryItemStore` can also play a server that assigns its
//! own ids on create, which drives the reconcile path.

use std::collections::HashMap;

use async_trait::async_trait;
use canvas::doc::{CanvasItem, ImageRef, ItemId, ItemPatch, ItemStore};
use canvas::error::EngineError;
use canvas::persist::{
    CameraPersistence, CameraState, ImageMeta, ImageResolver, ItemPersistence, PersistError, ProjectId,
};
use tokio::sync::Mutex;
use uuid::Uuid;

// =============================================================================
// ITEMS
// =============================================================================

#[derive(Default)]
struct ItemTables {
    projects: HashMap<ProjectId, ItemStore>,
    fail_next: Option<PersistError>,
    writes: usize,
}

impl ItemTables {
    fn take_failure(&mut self) -> Result<(), PersistError> {
        self.fail_next.take().map_or(Ok(()), Err)
    }
}

#[derive(Default)]
pub struct MemoryItemStore {
    tables: Mutex<ItemTables>,
    assign_ids: bool,
}

impl MemoryItemStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store that replaces the client id with its own on create.
    #[must_use]
    pub fn assigning_ids() -> Self {
        Self { assign_ids: true, ..Self::default() }
    }

    /// Seed a project with existing records.
    pub async fn seed(&self, project: ProjectId, items: Vec<CanvasItem>) {
        let mut tables = self.tables.lock().await;
        tables.projects.entry(project).or_default().load(items);
    }

    /// Make the next call fail with `error`.
    pub async fn fail_next(&self, error: PersistError) {
        self.tables.lock().await.fail_next = Some(error);
    }

    /// Stored records of a project in z-order.
    pub async fn items(&self, project: ProjectId) -> Vec<CanvasItem> {
        let tables = self.tables.lock().await;
        tables
            .projects
            .get(&project)
            .map(|store| store.sorted_items().into_iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Number of successful writes (create, update, delete).
    pub async fn writes(&self) -> usize {
        self.tables.lock().await.writes
    }
}

#[async_trait]
impl ItemPersistence for MemoryItemStore {
    async fn create_item(&self, project: ProjectId, item: &CanvasItem) -> Result<CanvasItem, PersistError> {
        let mut tables = self.tables.lock().await;
        tables.take_failure()?;
        let mut record = item.clone();
        if self.assign_ids {
            record.id = Uuid::new_v4();
        }
        tables.projects.entry(project).or_default().insert(record.clone());
        tables.writes += 1;
        Ok(record)
    }

    async fn update_item(&self, project: ProjectId, id: ItemId, patch: &ItemPatch) -> Result<CanvasItem, PersistError> {
        let mut tables = self.tables.lock().await;
        tables.take_failure()?;
        let store = tables.projects.get_mut(&project).ok_or(PersistError::NotFound(id))?;
        store.patch(&id, patch).map_err(|e| match e {
            EngineError::ItemNotFound(id) => PersistError::NotFound(id),
            other => PersistError::Rejected(other.to_string()),
        })?;
        let record = store.get(&id).cloned().ok_or(PersistError::NotFound(id))?;
        tables.writes += 1;
        Ok(record)
    }

    async fn delete_item(&self, project: ProjectId, id: ItemId) -> Result<(), PersistError> {
        let mut tables = self.tables.lock().await;
        tables.take_failure()?;
        let store = tables.projects.get_mut(&project).ok_or(PersistError::NotFound(id))?;
        store.remove(&id).map_err(|_| PersistError::NotFound(id))?;
        tables.writes += 1;
        Ok(())
    }

    async fn list_items(&self, project: ProjectId) -> Result<Vec<CanvasItem>, PersistError> {
        let mut tables = self.tables.lock().await;
        tables.take_failure()?;
        Ok(tables
            .projects
            .get(&project)
            .map(|store| store.list().into_iter().cloned().collect())
            .unwrap_or_default())
    }
}

// =============================================================================
// CAMERA
// =============================================================================

#[derive(Default)]
struct CameraTable {
    states: HashMap<ProjectId, CameraState>,
    fail_next: Option<PersistError>,
    saves: usize,
}

#[derive(Default)]
pub struct MemoryCameraStore {
    table: Mutex<CameraTable>,
}

impl MemoryCameraStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn seed(&self, project: ProjectId, state: CameraState) {
        self.table.lock().await.states.insert(project, state);
    }

    pub async fn fail_next(&self, error: PersistError) {
        self.table.lock().await.fail_next = Some(error);
    }

    pub async fn saved(&self, project: ProjectId) -> Option<CameraState> {
        self.table.lock().await.states.get(&project).copied()
    }

    /// Number of successful saves across all projects.
    pub async fn save_count(&self) -> usize {
        self.table.lock().await.saves
    }
}

#[async_trait]
impl CameraPersistence for MemoryCameraStore {
    async fn save_camera_state(&self, project: ProjectId, state: &CameraState) -> Result<(), PersistError> {
        let mut table = self.table.lock().await;
        if let Some(error) = table.fail_next.take() {
            return Err(error);
        }
        table.states.insert(project, *state);
        table.saves += 1;
        Ok(())
    }

    async fn load_camera_state(&self, project: ProjectId) -> Result<Option<CameraState>, PersistError> {
        let mut table = self.table.lock().await;
        if let Some(error) = table.fail_next.take() {
            return Err(error);
        }
        Ok(table.states.get(&project).copied())
    }
}

// =============================================================================
// IMAGES
// =============================================================================

/// Resolver over a fixed table of image dimensions.
#[derive(Debug, Default)]
pub struct StaticImageResolver {
    images: HashMap<String, ImageMeta>,
    fallback: Option<ImageMeta>,
}

impl StaticImageResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_image(mut self, handle: impl Into<String>, width: f64, height: f64) -> Self {
        self.images.insert(handle.into(), ImageMeta { width, height });
        self
    }

    /// Dimensions reported for handles missing from the table.
    #[must_use]
    pub fn with_fallback(mut self, width: f64, height: f64) -> Self {
        self.fallback = Some(ImageMeta { width, height });
        self
    }
}

#[async_trait]
impl ImageResolver for StaticImageResolver {
    async fn resolve(&self, image: &ImageRef) -> Result<ImageMeta, PersistError> {
        self.images
            .get(image.as_str())
            .copied()
            .or(self.fallback)
            .ok_or_else(|| PersistError::Rejected(format!("unknown image {}", image.as_str())))
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
