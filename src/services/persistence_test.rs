#![allow(clippy::float_cmp)]

use canvas::camera::Camera;
use canvas::coords::Point;
use canvas::doc::{ImageRef, NewItem};
use uuid::Uuid;

use super::*;
use crate::services::memory::MemoryItemStore;

fn item(handle: &str) -> CanvasItem {
    NewItem::new(ImageRef::new(handle), 0.0, 0.0).with_size(100.0, 100.0).into_item(Uuid::new_v4(), 1).unwrap()
}

struct Harness {
    store: Arc<MemoryItemStore>,
    project: ProjectId,
    handle: PersistHandle,
    outcomes: mpsc::UnboundedReceiver<PersistOutcome>,
}

fn harness(store: MemoryItemStore) -> Harness {
    let store = Arc::new(store);
    let project = Uuid::new_v4();
    let (tx, outcomes) = mpsc::unbounded_channel();
    let handle = spawn_persistence_worker(store.clone(), project, 8, tx);
    Harness { store, project, handle, outcomes }
}

fn drain(rx: &mut mpsc::UnboundedReceiver<PersistOutcome>) -> Vec<PersistOutcome> {
    let mut out = Vec::new();
    while let Ok(outcome) = rx.try_recv() {
        out.push(outcome);
    }
    out
}

// =============================================================================
// enqueue
// =============================================================================

#[tokio::test]
async fn enqueue_skips_non_persistence_actions() {
    let h = harness(MemoryItemStore::new());
    let actions = vec![
        Action::RenderNeeded,
        Action::CameraChanged(Camera::default()),
        Action::StrokeFinished { points: vec![Point::new(0.0, 0.0)], target: None },
    ];
    assert_eq!(h.handle.enqueue(&actions).await.unwrap(), 0);
    h.handle.flush().await.unwrap();
    assert_eq!(h.store.writes().await, 0);
}

#[tokio::test]
async fn create_update_delete_apply_in_order() {
    let mut h = harness(MemoryItemStore::new());
    let local = item("img://a");
    let id = local.id;
    let actions = vec![
        Action::ItemCreated(local.clone()),
        Action::ItemUpdated { id, patch: ItemPatch::position(30.0, 40.0) },
        Action::RenderNeeded,
    ];
    assert_eq!(h.handle.enqueue(&actions).await.unwrap(), 2);
    h.handle.flush().await.unwrap();

    let stored = h.store.items(h.project).await;
    assert_eq!(stored.len(), 1);
    assert_eq!((stored[0].x, stored[0].y), (30.0, 40.0));

    let outcomes = drain(&mut h.outcomes);
    assert_eq!(outcomes, vec![PersistOutcome::Created { sent: local.clone(), canonical: local }]);

    h.handle.enqueue(&[Action::ItemDeleted { id }]).await.unwrap();
    h.handle.flush().await.unwrap();
    assert!(h.store.items(h.project).await.is_empty());
    assert!(drain(&mut h.outcomes).is_empty());
}

#[tokio::test]
async fn later_commands_follow_canonical_id() {
    let mut h = harness(MemoryItemStore::assigning_ids());
    let local = item("img://a");
    let actions = vec![
        Action::ItemCreated(local.clone()),
        Action::ItemUpdated { id: local.id, patch: ItemPatch::z_index(9) },
    ];
    h.handle.enqueue(&actions).await.unwrap();
    h.handle.flush().await.unwrap();

    let stored = h.store.items(h.project).await;
    assert_eq!(stored.len(), 1);
    assert_ne!(stored[0].id, local.id);
    assert_eq!(stored[0].z_index, 9);

    match drain(&mut h.outcomes).as_slice() {
        [PersistOutcome::Created { sent, canonical }] => {
            assert_eq!(*sent, local);
            assert_eq!(canonical.id, stored[0].id);
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }
}

// =============================================================================
// failures
// =============================================================================

#[tokio::test]
async fn failed_create_is_reported_not_retried() {
    let mut h = harness(MemoryItemStore::new());
    h.store.fail_next(PersistError::Unavailable("offline".into())).await;
    let local = item("img://a");
    h.handle.enqueue(&[Action::ItemCreated(local.clone())]).await.unwrap();
    h.handle.flush().await.unwrap();

    let outcomes = drain(&mut h.outcomes);
    assert_eq!(
        outcomes,
        vec![PersistOutcome::Failed(PersistFailure {
            op: PersistOp::Create,
            item: Some(local.id),
            error: PersistError::Unavailable("offline".into()),
        })]
    );
    assert!(h.store.items(h.project).await.is_empty());
}

#[tokio::test]
async fn update_of_unknown_item_reports_not_found() {
    let mut h = harness(MemoryItemStore::new());
    let ghost = Uuid::new_v4();
    h.handle.enqueue(&[Action::ItemUpdated { id: ghost, patch: ItemPatch::z_index(2) }]).await.unwrap();
    h.handle.flush().await.unwrap();

    match drain(&mut h.outcomes).as_slice() {
        [PersistOutcome::Failed(failure)] => {
            assert_eq!(failure.op, PersistOp::Update);
            assert_eq!(failure.error, PersistError::NotFound(ghost));
        }
        other => panic!("unexpected outcomes: {other:?}"),
    }
}

#[tokio::test]
async fn worker_continues_after_failure() {
    let mut h = harness(MemoryItemStore::new());
    h.store.fail_next(PersistError::Rejected("quota".into())).await;
    let a = item("img://a");
    let b = item("img://b");
    h.handle.enqueue(&[Action::ItemCreated(a), Action::ItemCreated(b.clone())]).await.unwrap();
    h.handle.flush().await.unwrap();

    assert_eq!(h.store.items(h.project).await, vec![b]);
    assert_eq!(drain(&mut h.outcomes).len(), 2);
}

// =============================================================================
// shutdown
// =============================================================================

#[tokio::test]
async fn shutdown_drains_queue() {
    let h = harness(MemoryItemStore::new());
    let store = h.store.clone();
    let project = h.project;
    h.handle.enqueue(&[Action::ItemCreated(item("img://a"))]).await.unwrap();
    h.handle.shutdown().await;
    assert_eq!(store.items(project).await.len(), 1);
}
