//! Page reparenting and cross-container relocation tests

use pagetree::DEFAULT_BLOCK_NAME;

use crate::helpers::*;

#[test]
fn test_move_page_reparents_and_positions() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B", "C"]);
    create_child(&store, &pages[0], "A1");
    create_child(&store, &pages[0], "A2");

    let moved = store
        .move_page(&pages[2].id, Some(&pages[0].id), Some(1))
        .expect("Failed to move page");

    assert_eq!(moved.parent_id.as_deref(), Some(pages[0].id.as_str()));
    assert_eq!(moved.order, 1);
    assert_eq!(child_names(&store, &pages[0]), vec!["A1", "C", "A2"]);
    assert_eq!(root_names(&store), vec!["A", "B"]);
    assert_consistent(&store);
}

#[test]
fn test_move_page_to_root_goes_last() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B"]);
    let child = create_child(&store, &pages[0], "child");

    store.move_page(&child.id, None, None).expect("Failed to move to root");
    assert_eq!(root_names(&store), vec!["A", "B", "child"]);
    assert!(store.get_child_pages(Some(&pages[0].id)).is_empty());
}

#[test]
fn test_move_page_under_descendant_is_rejected() {
    let store = setup_store();
    let a = create_pages(&store, &["A"]).remove(0);
    let b = create_child(&store, &a, "B");
    let c = create_child(&store, &b, "C");
    let before = store.encode_state_as_update();

    let err = store.move_page(&a.id, Some(&c.id), None).unwrap_err();
    assert!(err.is_cycle());
    let err = store.move_page(&a.id, Some(&a.id), Some(0)).unwrap_err();
    assert!(err.is_cycle());

    assert_eq!(store.encode_state_as_update(), before);
}

#[test]
fn test_move_page_unknown_ids() {
    let store = setup_store();
    let a = create_pages(&store, &["A"]).remove(0);
    assert!(store.move_page("page_missing", None, None).unwrap_err().is_not_found());
    assert!(store.move_page(&a.id, Some("page_missing"), None).unwrap_err().is_not_found());
    assert!(store.move_page(&a.id, None, Some(1)).unwrap_err().is_invalid_index());
}

#[test]
fn test_noop_move_leaves_document_unchanged() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B", "C"]);
    let child = create_child(&store, &pages[1], "child");
    let before = store.encode_state_as_update();

    store
        .move_page(&pages[1].id, None, Some(1))
        .expect("Failed to move page");
    store
        .move_page(&child.id, Some(&pages[1].id), Some(0))
        .expect("Failed to move child");
    store.move_page(&pages[2].id, None, None).expect("Failed to move page");

    assert_eq!(store.encode_state_as_update(), before);
}

#[test]
fn test_move_page_prev_and_next() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B", "C"]);

    assert!(store.move_page_prev(&pages[2].id).expect("Failed to move prev"));
    assert_eq!(root_names(&store), vec!["A", "C", "B"]);

    assert!(store.move_page_next(&pages[0].id).expect("Failed to move next"));
    assert_eq!(root_names(&store), vec!["C", "A", "B"]);

    assert!(!store.move_page_prev(&pages[2].id).expect("Boundary is not an error"));
    assert!(!store.move_page_next(&pages[1].id).expect("Boundary is not an error"));
    assert_eq!(root_names(&store), vec!["C", "A", "B"]);
    assert_consistent(&store);
}

#[test]
fn test_move_page_left_becomes_next_sibling_of_parent() {
    let store = setup_store();
    let g = create_pages(&store, &["G"]).remove(0);
    let x = create_child(&store, &g, "X");
    let parent = create_child(&store, &g, "Parent");
    let y = create_child(&store, &g, "Y");
    let z = create_child(&store, &g, "Z");
    let child = create_child(&store, &parent, "Child");
    assert_eq!(store.get_page(&parent.id).map(|p| p.order), Some(1));

    assert!(store.move_page_left(&child.id).expect("Failed to outdent"));

    let moved = store.get_page(&child.id).expect("Page exists");
    assert_eq!(moved.parent_id.as_deref(), Some(g.id.as_str()));
    assert_eq!(moved.order, 2);
    assert_eq!(store.get_page(&x.id).map(|p| p.order), Some(0));
    assert_eq!(store.get_page(&y.id).map(|p| p.order), Some(3));
    assert_eq!(store.get_page(&z.id).map(|p| p.order), Some(4));
    assert_eq!(child_names(&store, &g), vec!["X", "Parent", "Child", "Y", "Z"]);
    assert_consistent(&store);
}

#[test]
fn test_move_page_left_from_top_level_child_reaches_root() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B"]);
    let child = create_child(&store, &pages[0], "A1");

    assert!(store.move_page_left(&child.id).expect("Failed to outdent"));
    assert_eq!(root_names(&store), vec!["A", "A1", "B"]);
    assert!(!store.move_page_left(&child.id).expect("Root page cannot outdent"));
}

#[test]
fn test_move_page_right_becomes_last_child_of_previous_sibling() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B", "C"]);
    create_child(&store, &pages[0], "A1");

    assert!(store.move_page_right(&pages[1].id).expect("Failed to indent"));
    assert_eq!(root_names(&store), vec!["A", "C"]);
    assert_eq!(child_names(&store, &pages[0]), vec!["A1", "B"]);

    assert!(!store.move_page_right(&pages[0].id).expect("First page cannot indent"));
    assert_consistent(&store);
}

#[test]
fn test_move_page_to_target_with_children_becomes_first_child() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B", "Target"]);
    create_child(&store, &pages[2], "T1");

    let moved = store
        .move_page_to_target(&pages[0].id, &pages[2].id)
        .expect("Failed to move to target");

    assert_eq!(moved.parent_id.as_deref(), Some(pages[2].id.as_str()));
    assert_eq!(child_names(&store, &pages[2]), vec!["A", "T1"]);
    assert_eq!(root_names(&store), vec!["B", "Target"]);
    assert_consistent(&store);
}

#[test]
fn test_move_page_to_leaf_target_becomes_next_sibling() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B", "C"]);
    let leaf = create_child(&store, &pages[1], "leaf");
    create_child(&store, &pages[1], "other");

    store
        .move_page_to_target(&pages[0].id, &leaf.id)
        .expect("Failed to move next to target");
    assert_eq!(child_names(&store, &pages[1]), vec!["leaf", "A", "other"]);

    store
        .move_page_to_target(&pages[2].id, &pages[1].id)
        .expect("Failed to move into target");
    assert_eq!(child_names(&store, &pages[1]), vec!["C", "leaf", "A", "other"]);
    assert_consistent(&store);
}

#[test]
fn test_move_only_child_to_its_parent_keeps_it_in_place() {
    let store = setup_store();
    let pages = create_pages(&store, &["Parent", "After"]);
    let only = create_child(&store, &pages[0], "Only");
    let before = store.encode_state_as_update();

    let moved = store
        .move_page_to_target(&only.id, &pages[0].id)
        .expect("Failed to move to parent");

    assert_eq!(moved.parent_id.as_deref(), Some(pages[0].id.as_str()));
    assert_eq!(moved.order, 0);
    assert_eq!(root_names(&store), vec!["Parent", "After"]);
    assert_eq!(store.encode_state_as_update(), before);
}

#[test]
fn test_move_later_child_to_its_parent_becomes_first() {
    let store = setup_store();
    let parent = create_pages(&store, &["Parent"]).remove(0);
    create_child(&store, &parent, "First");
    let second = create_child(&store, &parent, "Second");

    store
        .move_page_to_target(&second.id, &parent.id)
        .expect("Failed to move to parent");

    assert_eq!(child_names(&store, &parent), vec!["Second", "First"]);
    assert_consistent(&store);
}

#[test]
fn test_move_page_to_own_descendant_is_rejected() {
    let store = setup_store();
    let a = create_pages(&store, &["A"]).remove(0);
    let child = create_child(&store, &a, "child");
    let before = store.encode_state_as_update();

    assert!(store.move_page_to_target(&a.id, &child.id).unwrap_err().is_cycle());
    assert!(store.move_page_to_target(&a.id, &a.id).unwrap_err().is_cycle());
    assert_eq!(store.encode_state_as_update(), before);
}

#[test]
fn test_move_block_to_other_page() {
    let store = setup_store();
    let tree = build_sample_tree(&store);

    let moved = store
        .move_block_to_page(&tree.b1.id, &tree.p2.id, None)
        .expect("Failed to move block");

    assert_eq!(moved.id, tree.b1.id);
    assert_eq!(moved.page_id, tree.p2.id);
    assert_eq!(moved.order, 0);
    assert!(moved.components.iter().all(|c| c.page_id == tree.p2.id));
    assert_eq!(block_names(&store, &tree.p1), vec!["B2"]);
    assert_eq!(store.get_block(&tree.b2.id).map(|b| b.order), Some(0));
    assert_eq!(component_texts(&store, &tree.b1), vec!["one", "two"]);
    assert_eq!(
        store.get_component(&tree.c1.id).map(|c| c.page_id),
        Some(tree.p2.id.clone())
    );
    assert_consistent(&store);
}

#[test]
fn test_move_block_within_page_repositions() {
    let store = setup_store();
    let tree = build_sample_tree(&store);

    store
        .move_block_to_page(&tree.b1.id, &tree.p1.id, Some(1))
        .expect("Failed to reposition block");
    assert_eq!(block_names(&store, &tree.p1), vec!["B2", "B1"]);
    assert!(
        store
            .move_block_to_page(&tree.b1.id, &tree.child.id, Some(5))
            .unwrap_err()
            .is_invalid_index()
    );
}

#[test]
fn test_move_component_across_pages() {
    let store = setup_store();
    let tree = build_sample_tree(&store);

    let moved = store
        .move_component_to_block(&tree.c1.id, &tree.child_block.id, None)
        .expect("Failed to move component");

    assert_eq!(moved.id, tree.c1.id);
    assert_eq!(moved.block_id, tree.child_block.id);
    assert_eq!(moved.page_id, tree.child.id);
    assert_eq!(moved.order, 0);
    assert_eq!(moved.rich_text, "one");

    let source = store.get_components(&tree.b1.id);
    assert_eq!(source.len(), 1);
    assert_eq!(source[0].id, tree.c2.id);
    assert_eq!(source[0].order, 0);

    let moved_again = store
        .move_component_to_block(&tree.c3.id, &tree.child_block.id, Some(0))
        .expect("Failed to move component to front");
    assert_eq!(moved_again.order, 0);
    assert_eq!(component_texts(&store, &tree.child_block), vec!["three", "one"]);
    assert!(store.get_components(&tree.b2.id).is_empty());
    assert_consistent(&store);
}

#[test]
fn test_move_component_keeps_lock_and_timestamps() {
    let store = setup_store();
    let tree = build_sample_tree(&store);
    let locked = store.lock_component_for_self(&tree.c2.id).expect("Failed to lock");

    let moved = store
        .move_component_to_block(&tree.c2.id, &tree.b2.id, None)
        .expect("Failed to move");

    assert_eq!(moved.lock_owner, locked.lock_owner);
    assert_eq!(moved.created_at, locked.created_at);
    assert_eq!(moved.order, 1);
}

#[test]
fn test_move_component_to_page_uses_first_block() {
    let store = setup_store();
    let tree = build_sample_tree(&store);

    let moved = store
        .move_component_to_page(&tree.c3.id, &tree.p1.id, Some(0))
        .expect("Failed to move to page");
    assert_eq!(moved.block_id, tree.b1.id);
    assert_eq!(component_texts(&store, &tree.b1), vec!["three", "one", "two"]);
}

#[test]
fn test_move_component_to_empty_page_creates_block() {
    let store = setup_store();
    let tree = build_sample_tree(&store);

    let moved = store
        .move_component_to_page(&tree.c1.id, &tree.p2.id, None)
        .expect("Failed to move to empty page");

    let blocks = store.get_blocks(&tree.p2.id);
    assert_eq!(blocks.len(), 1);
    assert_eq!(blocks[0].name, DEFAULT_BLOCK_NAME);
    assert_eq!(moved.block_id, blocks[0].id);
    assert_eq!(moved.page_id, tree.p2.id);
    assert_consistent(&store);
}

#[test]
fn test_failed_component_move_creates_nothing() {
    let store = setup_store();
    let tree = build_sample_tree(&store);
    let before = store.encode_state_as_update();

    assert!(
        store
            .move_component_to_page(&tree.c1.id, &tree.p2.id, Some(3))
            .unwrap_err()
            .is_invalid_index()
    );
    assert!(
        store
            .move_component_to_page("comp_missing", &tree.p2.id, None)
            .unwrap_err()
            .is_not_found()
    );
    assert!(
        store
            .move_component_to_block(&tree.c1.id, "block_missing", None)
            .unwrap_err()
            .is_not_found()
    );
    assert_eq!(store.encode_state_as_update(), before);
}
