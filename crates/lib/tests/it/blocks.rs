//! Block lifecycle tests

use pagetree::{BlockUpdate, NewBlock};
use serde_json::json;

use crate::helpers::*;

#[test]
fn test_update_block_order_swaps_two_blocks() {
    let store = setup_store();
    let page = create_pages(&store, &["P1"]).remove(0);
    let b1 = create_block(&store, &page, "B1");
    let b2 = create_block(&store, &page, "B2");

    store.update_block_order(&b1.id, 1).expect("Failed to reorder block");

    assert_eq!(store.get_block(&b2.id).map(|b| b.order), Some(0));
    assert_eq!(store.get_block(&b1.id).map(|b| b.order), Some(1));
    assert_eq!(block_names(&store, &page), vec!["B2", "B1"]);
}

#[test]
fn test_create_block_at_index() {
    let store = setup_store();
    let page = create_pages(&store, &["P1"]).remove(0);
    create_block(&store, &page, "first");
    create_block(&store, &page, "last");

    let middle = store
        .create_block(
            &page.id,
            NewBlock::named("middle").with_icon("star").with_type("section"),
            Some(1),
        )
        .expect("Failed to create block");

    assert_eq!(middle.order, 1);
    assert_eq!(middle.page_id, page.id);
    assert_eq!(block_names(&store, &page), vec!["first", "middle", "last"]);
    let stored = store.get_block(&middle.id).expect("Block exists");
    assert_eq!(stored.icon_name, "star");
    assert_eq!(stored.block_type, "section");
    assert_consistent(&store);
}

#[test]
fn test_create_block_rejects_bad_index_and_missing_page() {
    let store = setup_store();
    let page = create_pages(&store, &["P1"]).remove(0);

    assert!(
        store
            .create_block(&page.id, NewBlock::named("x"), Some(1))
            .unwrap_err()
            .is_invalid_index()
    );
    assert!(
        store
            .create_block("page_missing", NewBlock::named("x"), None)
            .unwrap_err()
            .is_not_found()
    );
    assert!(store.get_blocks(&page.id).is_empty());
}

#[test]
fn test_update_block_fields() {
    let store = setup_store();
    let page = create_pages(&store, &["P1"]).remove(0);
    let block = create_block(&store, &page, "B");

    let updated = store
        .update_block(
            &block.id,
            BlockUpdate {
                name: Some("Renamed".into()),
                icon_name: Some("bolt".into()),
                block_type: None,
                properties: Some([("color".to_string(), json!("red"))].into_iter().collect()),
            },
        )
        .expect("Failed to update block");

    assert_eq!(updated.name, "Renamed");
    assert_eq!(updated.icon_name, "bolt");
    assert_eq!(updated.properties["color"], json!("red"));
}

#[test]
fn test_delete_block_renumbers_remaining() {
    let store = setup_store();
    let page = create_pages(&store, &["P1"]).remove(0);
    let blocks: Vec<_> = ["a", "b", "c"]
        .iter()
        .map(|name| create_block(&store, &page, name))
        .collect();
    create_component(&store, &blocks[0], "gone with the block");

    store.delete_block(&blocks[0].id).expect("Failed to delete block");

    let remaining = store.get_blocks(&page.id);
    assert_eq!(remaining.iter().map(|b| b.name.as_str()).collect::<Vec<_>>(), vec!["b", "c"]);
    assert_eq!(orders(&remaining, |b| b.order), vec![0, 1]);
    assert!(store.get_block(&blocks[0].id).is_none());
    assert!(store.delete_block(&blocks[0].id).unwrap_err().is_not_found());
    assert_consistent(&store);
}

#[test]
fn test_block_properties() {
    let store = setup_store();
    let page = create_pages(&store, &["P1"]).remove(0);
    let block = create_block(&store, &page, "B");

    store
        .set_block_property(&block.id, "collapsed", json!(true))
        .expect("Failed to set property");
    assert_eq!(
        store.get_block_properties(&block.id).expect("Block exists")["collapsed"],
        json!(true)
    );
    assert!(store.remove_block_property(&block.id, "collapsed").expect("Failed to remove"));
    assert!(store.get_block_properties(&block.id).expect("Block exists").is_empty());
}

#[test]
fn test_update_block_order_out_of_range() {
    let store = setup_store();
    let page = create_pages(&store, &["P1"]).remove(0);
    let block = create_block(&store, &page, "only");
    assert!(store.update_block_order(&block.id, 1).unwrap_err().is_invalid_index());
    store.update_block_order(&block.id, 0).expect("No-op reorder succeeds");
}
