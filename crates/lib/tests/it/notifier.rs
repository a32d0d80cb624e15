//! Change notification tests

use std::sync::{Arc, Mutex};

use pagetree::{ComponentUpdate, StructuralChange};
use serde_json::json;

use crate::helpers::*;

type Recorded = Arc<Mutex<Vec<StructuralChange>>>;

fn recorder() -> (Recorded, impl Fn(&StructuralChange) + Send + Sync + 'static) {
    let seen: Recorded = Arc::default();
    let sink = Arc::clone(&seen);
    (seen, move |change: &StructuralChange| {
        sink.lock().unwrap().push(change.clone());
    })
}

fn take(seen: &Recorded) -> Vec<StructuralChange> {
    std::mem::take(&mut *seen.lock().unwrap())
}

#[test]
fn test_local_batch_is_reported_once_as_local() {
    let store = setup_store();
    let (seen, listener) = recorder();
    store.on_structure_change(listener);

    let page = store.create_page("P1", None).expect("Failed to create page");

    let changes = take(&seen);
    assert_eq!(changes.len(), 1);
    assert!(changes[0].is_local);
    assert!(changes[0].is_structural());
    assert!(changes[0].affected_page_ids.contains(&page.id));
}

#[test]
fn test_failed_operation_emits_nothing() {
    let store = setup_store();
    create_pages(&store, &["P1"]);
    let (seen, listener) = recorder();
    store.on_structure_change(listener);

    assert!(store.reorder_page(0, 4).is_err());
    assert!(store.delete_page("page_missing").is_err());

    assert!(take(&seen).is_empty());
}

#[test]
fn test_block_listener_sees_only_block_and_component_changes() {
    let store = setup_store();
    let pages = create_pages(&store, &["P1", "P2"]);
    let (seen, listener) = recorder();
    store.on_block_component_change(listener);

    store
        .set_page_property(&pages[0].id, "theme", json!("dark"))
        .expect("Failed to set property");
    store.reorder_page(0, 1).expect("Failed to reorder");
    assert!(take(&seen).is_empty());

    let block = create_block(&store, &pages[1], "B");
    let changes = take(&seen);
    assert_eq!(changes.len(), 1);
    assert_eq!(
        changes[0].affected_page_ids.iter().cloned().collect::<Vec<_>>(),
        vec![pages[1].id.clone()]
    );
    assert!(changes[0].paths.iter().all(|p| p.touches_blocks_or_components()));

    let component = create_component(&store, &block, "hello");
    store
        .update_component(
            &component.id,
            ComponentUpdate {
                rich_text: Some("hello world".into()),
                ..Default::default()
            },
        )
        .expect("Failed to update component");
    let changes = take(&seen);
    assert_eq!(changes.len(), 2);
    assert!(changes[0].is_structural());
    assert!(!changes[1].is_structural());
    assert!(changes[1].affected_page_ids.contains(&pages[1].id));
}

#[test]
fn test_cross_page_move_reports_both_pages() {
    let store = setup_store();
    let tree = build_sample_tree(&store);
    let (seen, listener) = recorder();
    store.on_block_component_change(listener);

    store
        .move_component_to_block(&tree.c1.id, &tree.child_block.id, None)
        .expect("Failed to move component");

    let changes = take(&seen);
    assert_eq!(changes.len(), 1);
    assert!(changes[0].affected_page_ids.contains(&tree.p1.id));
    assert!(changes[0].affected_page_ids.contains(&tree.child.id));
}

#[test]
fn test_delete_page_reports_removed_subtree() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B"]);
    let child = create_child(&store, &pages[1], "B1");
    create_block(&store, &pages[1], "Notes");
    let (structure_seen, structure_listener) = recorder();
    let (block_seen, block_listener) = recorder();
    store.on_structure_change(structure_listener);
    store.on_block_component_change(block_listener);

    store.delete_page(&pages[1].id).expect("Failed to delete page");

    let changes = take(&structure_seen);
    assert_eq!(changes.len(), 1);
    assert!(changes[0].is_structural());
    let removed: Vec<String> = changes[0].removed_page_ids.iter().cloned().collect();
    let mut expected = vec![pages[1].id.clone(), child.id.clone()];
    expected.sort();
    assert_eq!(removed, expected);
    assert!(changes[0].affected_page_ids.contains(&pages[1].id));
    assert!(changes[0].affected_page_ids.contains(&child.id));
    assert!(!changes[0].removed_page_ids.contains(&pages[0].id));

    // Only B held blocks
    let block_changes = take(&block_seen);
    assert_eq!(block_changes.len(), 1);
    assert_eq!(
        block_changes[0].affected_page_ids.iter().cloned().collect::<Vec<_>>(),
        vec![pages[1].id.clone()]
    );
}

#[test]
fn test_remote_delete_reports_removed_page() {
    let alice = setup_store_as("alice");
    let bob = setup_store_as("bob");
    let page = alice.create_page("Doomed", None).expect("Failed to create page");
    alice.create_page("Kept", None).expect("Failed to create page");
    bob.apply_update(&alice.encode_state_as_update())
        .expect("Failed to apply update");

    let (seen, listener) = recorder();
    bob.on_structure_change(listener);
    let before = alice.state_vector();
    alice.delete_page(&page.id).expect("Failed to delete page");
    bob.apply_update(&alice.encode_diff(&before).expect("Failed to encode diff"))
        .expect("Failed to apply update");

    let changes = take(&seen);
    assert_eq!(changes.len(), 1);
    assert!(!changes[0].is_local);
    assert!(changes[0].removed_page_ids.contains(&page.id));
    assert_eq!(changes[0].removed_page_ids.len(), 1);
}

#[test]
fn test_subscribe_and_unsubscribe() {
    let store = setup_store();
    let (id, receiver) = store.subscribe();
    assert_eq!(store.notifier().listener_count(), 1);

    let page = store.create_page("P1", None).expect("Failed to create page");
    let change = receiver.try_recv().expect("Change delivered to channel");
    assert!(change.affected_page_ids.contains(&page.id));

    assert!(store.unsubscribe(id));
    assert!(!store.unsubscribe(id));
    store.create_page("P2", None).expect("Failed to create page");
    assert!(receiver.try_recv().is_err());
}

#[test]
fn test_remote_update_is_not_local() {
    let alice = setup_store_as("alice");
    let bob = setup_store_as("bob");
    let (seen, listener) = recorder();
    bob.on_structure_change(listener);

    let page = alice.create_page("Shared", None).expect("Failed to create page");
    bob.apply_update(&alice.encode_state_as_update())
        .expect("Failed to apply update");

    let changes = take(&seen);
    assert_eq!(changes.len(), 1);
    assert!(!changes[0].is_local);
    assert!(changes[0].affected_page_ids.contains(&page.id));
    assert_eq!(bob.get_page(&page.id).map(|p| p.name), Some("Shared".into()));
}

#[test]
fn test_change_serializes_for_bridges() {
    let store = setup_store();
    let (id, receiver) = store.subscribe();
    store.create_page("P1", None).expect("Failed to create page");
    let change = receiver.try_recv().expect("Change delivered");

    let value = serde_json::to_value(&change).expect("Failed to serialize");
    assert_eq!(value["isLocal"], json!(true));
    assert!(value["affectedPageIds"].is_array());
    assert!(value["removedPageIds"].is_array());
    store.unsubscribe(id);
}
