use std::sync::Arc;

use pagetree::{
    Block, Component, FixedClock, NewBlock, NewComponent, Page, StoreConfig, StructureStore,
};

// ==========================
// CORE TEST FACTORIES
// ==========================

/// Store with a deterministic clock and a fixed client id.
pub fn setup_store() -> StructureStore {
    setup_store_as("client-a")
}

pub fn setup_store_as(client_id: &str) -> StructureStore {
    StructureStore::with_clock(
        StoreConfig::default()
            .with_client_id(client_id)
            .with_display_name(format!("{client_id} user")),
        Arc::new(FixedClock::default()),
    )
}

/// Create root pages in the given order.
pub fn create_pages(store: &StructureStore, names: &[&str]) -> Vec<Page> {
    names
        .iter()
        .map(|name| store.create_page(name, None).expect("Failed to create page"))
        .collect()
}

pub fn create_child(store: &StructureStore, parent: &Page, name: &str) -> Page {
    store
        .create_page(name, Some(&parent.id))
        .expect("Failed to create child page")
}

pub fn create_block(store: &StructureStore, page: &Page, name: &str) -> Block {
    store
        .create_block(&page.id, NewBlock::named(name), None)
        .expect("Failed to create block")
}

pub fn create_component(store: &StructureStore, block: &Block, text: &str) -> Component {
    store
        .create_component(&block.id, NewComponent::of_type("text").with_text(text), None)
        .expect("Failed to create component")
}

/// A page "P1" with blocks B1 (two components) and B2 (one component),
/// a child page "C" with one block, and a second root page "P2".
pub struct SampleTree {
    pub p1: Page,
    pub p2: Page,
    pub child: Page,
    pub b1: Block,
    pub b2: Block,
    pub child_block: Block,
    pub c1: Component,
    pub c2: Component,
    pub c3: Component,
}

pub fn build_sample_tree(store: &StructureStore) -> SampleTree {
    let pages = create_pages(store, &["P1", "P2"]);
    let (p1, p2) = (pages[0].clone(), pages[1].clone());
    let child = create_child(store, &p1, "C");
    let b1 = create_block(store, &p1, "B1");
    let b2 = create_block(store, &p1, "B2");
    let child_block = create_block(store, &child, "CB");
    let c1 = create_component(store, &b1, "one");
    let c2 = create_component(store, &b1, "two");
    let c3 = create_component(store, &b2, "three");
    SampleTree {
        p1,
        p2,
        child,
        b1,
        b2,
        child_block,
        c1,
        c2,
        c3,
    }
}

// ==========================
// PROJECTION HELPERS
// ==========================

pub fn page_names(pages: &[Page]) -> Vec<String> {
    pages.iter().map(|p| p.name.clone()).collect()
}

pub fn root_names(store: &StructureStore) -> Vec<String> {
    page_names(&store.get_child_pages(None))
}

pub fn child_names(store: &StructureStore, parent: &Page) -> Vec<String> {
    page_names(&store.get_child_pages(Some(&parent.id)))
}

pub fn block_names(store: &StructureStore, page: &Page) -> Vec<String> {
    store
        .get_blocks(&page.id)
        .into_iter()
        .map(|b| b.name)
        .collect()
}

pub fn component_texts(store: &StructureStore, block: &Block) -> Vec<String> {
    store
        .get_components(&block.id)
        .into_iter()
        .map(|c| c.rich_text)
        .collect()
}

pub fn orders<T, F: Fn(&T) -> i64>(items: &[T], order: F) -> Vec<i64> {
    items.iter().map(order).collect()
}

/// Assert that the tree satisfies every structural invariant.
pub fn assert_consistent(store: &StructureStore) {
    let violations = store.collect_violations();
    assert!(violations.is_empty(), "Invariant violations: {violations:?}");
}
