//! Page lifecycle tests

use pagetree::PageUpdate;
use serde_json::json;

use crate::helpers::*;

#[test]
fn test_created_pages_are_densely_ordered() {
    let store = setup_store();
    create_pages(&store, &["P1", "P2", "P3"]);

    let pages = store.get_pages();
    assert_eq!(page_names(&pages), vec!["P1", "P2", "P3"]);
    assert_eq!(orders(&pages, |p| p.order), vec![0, 1, 2]);
    assert!(pages.iter().all(|p| p.is_root()));
    assert_consistent(&store);
}

#[test]
fn test_reorder_page_moves_first_to_last() {
    let store = setup_store();
    create_pages(&store, &["P1", "P2", "P3"]);

    store.reorder_page(0, 2).expect("Failed to reorder");

    let pages = store.get_child_pages(None);
    assert_eq!(page_names(&pages), vec!["P2", "P3", "P1"]);
    assert_eq!(orders(&pages, |p| p.order), vec![0, 1, 2]);

    store.reorder_page(2, 0).expect("Failed to reorder back");
    assert_eq!(root_names(&store), vec!["P1", "P2", "P3"]);
}

#[test]
fn test_reorder_page_rejects_out_of_range() {
    let store = setup_store();
    create_pages(&store, &["P1", "P2"]);
    let before = store.encode_state_as_update();

    let err = store.reorder_page(0, 2).unwrap_err();
    assert!(err.is_invalid_index());
    let err = store.reorder_page(-1, 0).unwrap_err();
    assert!(err.is_invalid_index());

    assert_eq!(store.encode_state_as_update(), before);
}

#[test]
fn test_reorder_children_of_a_page() {
    let store = setup_store();
    let parent = create_pages(&store, &["Parent"]).remove(0);
    for name in ["a", "b", "c"] {
        create_child(&store, &parent, name);
    }

    store
        .reorder_pages_in(Some(&parent.id), 2, 0)
        .expect("Failed to reorder children");
    assert_eq!(child_names(&store, &parent), vec!["c", "a", "b"]);
    assert_consistent(&store);
}

#[test]
fn test_create_page_at_index_shifts_siblings() {
    let store = setup_store();
    create_pages(&store, &["P1", "P2"]);
    let inserted = store
        .create_page_at("P0", None, Some(0))
        .expect("Failed to insert page");

    assert_eq!(inserted.order, 0);
    assert_eq!(root_names(&store), vec!["P0", "P1", "P2"]);
    assert!(store.create_page_at("X", None, Some(9)).unwrap_err().is_invalid_index());
    assert_consistent(&store);
}

#[test]
fn test_create_page_under_missing_parent_fails() {
    let store = setup_store();
    let err = store.create_page("orphan", Some("page_missing")).unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(store.page_count(), 0);
}

#[test]
fn test_update_page_renames_and_merges_properties() {
    let store = setup_store();
    let page = create_pages(&store, &["Draft"]).remove(0);
    store
        .set_page_property(&page.id, "theme", json!("dark"))
        .expect("Failed to set property");

    let updated = store
        .update_page(
            &page.id,
            PageUpdate {
                name: Some("Final".into()),
                properties: Some([("locale".to_string(), json!("en"))].into_iter().collect()),
            },
        )
        .expect("Failed to update page");

    assert_eq!(updated.name, "Final");
    assert_eq!(updated.properties.get("theme"), Some(&json!("dark")));
    assert_eq!(updated.properties.get("locale"), Some(&json!("en")));
    assert_eq!(store.get_page(&page.id).map(|p| p.name), Some("Final".to_string()));
}

#[test]
fn test_page_properties_round_trip() {
    let store = setup_store();
    let page = create_pages(&store, &["P"]).remove(0);

    assert_eq!(store.get_page_properties(&page.id), Some(Default::default()));
    store
        .set_page_property(&page.id, "weight", json!({"value": 3, "unit": "kg"}))
        .expect("Failed to set property");
    let props = store.get_page_properties(&page.id).expect("Page exists");
    assert_eq!(props["weight"], json!({"value": 3, "unit": "kg"}));

    assert!(store.remove_page_property(&page.id, "weight").expect("Failed to remove"));
    assert!(!store.remove_page_property(&page.id, "weight").expect("Failed to remove"));
    assert!(store.get_page_properties("page_missing").is_none());
}

#[test]
fn test_delete_page_removes_descendants_and_renumbers() {
    let store = setup_store();
    let pages = create_pages(&store, &["P1", "P2", "P3"]);
    let child = create_child(&store, &pages[1], "child");
    let grandchild = create_child(&store, &child, "grandchild");
    create_block(&store, &grandchild, "deep block");

    let removed = store.delete_page(&pages[1].id).expect("Failed to delete");

    assert_eq!(removed, vec![pages[1].id.clone(), child.id.clone(), grandchild.id.clone()]);
    assert_eq!(store.page_count(), 2);
    let roots = store.get_child_pages(None);
    assert_eq!(page_names(&roots), vec!["P1", "P3"]);
    assert_eq!(orders(&roots, |p| p.order), vec![0, 1]);
    assert_consistent(&store);
}

#[test]
fn test_delete_missing_page_reports_operation_and_id() {
    let store = setup_store();
    let err = store.delete_page("page_nope").unwrap_err();
    let structure = err.as_structure().expect("Structure error");
    assert_eq!(structure.operation(), Some("deletePage"));
    assert_eq!(structure.id(), Some("page_nope"));
}

#[test]
fn test_get_pages_is_depth_first() {
    let store = setup_store();
    let pages = create_pages(&store, &["A", "B"]);
    let a1 = create_child(&store, &pages[0], "A1");
    create_child(&store, &a1, "A1a");
    create_child(&store, &pages[0], "A2");
    create_child(&store, &pages[1], "B1");

    assert_eq!(
        page_names(&store.get_pages()),
        vec!["A", "A1", "A1a", "A2", "B", "B1"]
    );
}
