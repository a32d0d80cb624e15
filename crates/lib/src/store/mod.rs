//! The structure store: the only entry point that mutates the page tree.
//!
//! Every mutating operation runs inside one origin-tagged `yrs` transaction
//! (an atomic batch). Operations validate everything they need before their
//! first write, so a rejected operation leaves no trace in the document and
//! produces no change notification. After the batch commits, queued change
//! notifications are delivered to listeners.
//!
//! ```
//! use pagetree::{NewBlock, StoreConfig, StructureStore};
//!
//! let store = StructureStore::new(StoreConfig::default());
//! let intro = store.create_page("Intro", None)?;
//! store.create_block(&intro.id, NewBlock::named("Welcome"), None)?;
//! assert_eq!(store.get_blocks(&intro.id).len(), 1);
//! # Ok::<(), pagetree::Error>(())
//! ```

mod blocks;
mod components;
mod errors;
mod import;
mod invariants;
pub(crate) mod locate;
mod moves;
mod pages;
mod sync;

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};
use yrs::{ArrayRef, Doc, Transact, Transaction, TransactionMut};

pub use errors::{StructureError, SyncError};
pub use import::{ImportBlock, ImportComponent, ImportPage, ROOT_REF};
pub use moves::DEFAULT_BLOCK_NAME;

use crate::Result;
use crate::clock::{Clock, SystemClock};
use crate::clone::CloneEngine;
use crate::config::StoreConfig;
use crate::id::IdGenerator;
use crate::model::codec::{self, keys};
use crate::model::{Block, Component, Page, PropertyMap};
use crate::notifier::{
    BlockComponentListener, ChangeNotifier, ListenerId, StructuralChange, StructureListener,
};

/// Facade over one replicated document holding a page tree.
///
/// Reads are pure projections of the current document state into typed
/// records. Mutations return the resulting record (or a success flag) and
/// report expected failures as [`StructureError`]s wrapped in
/// [`Error`](crate::Error).
pub struct StructureStore {
    doc: Doc,
    pages: ArrayRef,
    config: StoreConfig,
    clock: Arc<dyn Clock>,
    ids: IdGenerator,
    notifier: ChangeNotifier,
}

impl std::fmt::Debug for StructureStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StructureStore")
            .field("client_id", &self.config.client_id)
            .field("doc_client_id", &self.doc.client_id())
            .field("notifier", &self.notifier)
            .finish()
    }
}

impl StructureStore {
    /// Create a store over a fresh document using the system clock.
    pub fn new(config: StoreConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a store over a fresh document with an injected clock.
    pub fn with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let doc = match config.doc_client_id {
            Some(client_id) => Doc::with_client_id(client_id),
            None => Doc::new(),
        };
        let pages = doc.get_or_insert_array(keys::PAGES);
        let notifier = ChangeNotifier::attach(&pages, &config.client_id);
        let ids = IdGenerator::new(Arc::clone(&clock));
        debug!(client_id = %config.client_id, "Created structure store");
        Self {
            doc,
            pages,
            config,
            clock,
            ids,
            notifier,
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// The origin tag attached to this client's batches.
    pub fn client_id(&self) -> &str {
        &self.config.client_id
    }

    /// The underlying document, for callers that need direct substrate
    /// access (for example an undo manager). Writing through it bypasses
    /// every invariant this store maintains.
    pub fn doc(&self) -> &Doc {
        &self.doc
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn on_structure_change<L>(&self, listener: L) -> ListenerId
    where
        L: StructureListener + 'static,
    {
        self.notifier.on_structure_change(listener)
    }

    pub fn on_block_component_change<L>(&self, listener: L) -> ListenerId
    where
        L: BlockComponentListener + 'static,
    {
        self.notifier.on_block_component_change(listener)
    }

    /// Receive every committed change through a channel.
    pub fn subscribe(&self) -> (ListenerId, std::sync::mpsc::Receiver<StructuralChange>) {
        self.notifier.subscribe()
    }

    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        self.notifier.unsubscribe(id)
    }

    // -----------------------------------------------------------------------
    // Batching
    // -----------------------------------------------------------------------

    /// Run `f` as one atomic, origin-tagged batch.
    ///
    /// `f` must perform all validation before its first write; an `Err`
    /// returned after a write would leave that write committed.
    fn batch<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut TransactionMut) -> std::result::Result<T, StructureError>,
    ) -> Result<T> {
        let result = {
            let mut txn = self.doc.transact_mut_with(self.config.client_id.as_str());
            f(&mut txn)
        };
        match &result {
            Ok(_) => debug!(operation, "Committed batch"),
            Err(err) => warn!(operation, error = %err, "Rejected operation"),
        }
        self.notifier.flush();
        result.map_err(Into::into)
    }

    fn read<T>(&self, f: impl FnOnce(&Transaction) -> T) -> T {
        let txn = self.doc.transact();
        f(&txn)
    }

    fn clone_engine(&self) -> CloneEngine<'_> {
        CloneEngine::new(&self.ids, self.clock.as_ref())
    }

    // -----------------------------------------------------------------------
    // Read projections
    // -----------------------------------------------------------------------

    /// All pages in depth-first tree order: each root page followed by its
    /// descendants, siblings sorted by `order`.
    ///
    /// Pages whose parent is missing are listed as roots, so nothing stored
    /// is hidden.
    pub fn get_pages(&self) -> Vec<Page> {
        let all = self.all_pages();
        let known: std::collections::HashSet<&str> = all.iter().map(|p| p.id.as_str()).collect();
        let mut children: HashMap<Option<&str>, Vec<&Page>> = HashMap::new();
        for page in &all {
            let parent = page.parent_id.as_deref().filter(|p| known.contains(p));
            children.entry(parent).or_default().push(page);
        }
        for list in children.values_mut() {
            list.sort_by_key(|p| p.order);
        }

        let mut out = Vec::with_capacity(all.len());
        let mut visited = std::collections::HashSet::new();
        let mut stack: Vec<&Page> = children
            .get(&None)
            .map(|roots| roots.iter().rev().copied().collect())
            .unwrap_or_default();
        while let Some(page) = stack.pop() {
            if !visited.insert(page.id.as_str()) {
                continue;
            }
            out.push(page.clone());
            if let Some(list) = children.get(&Some(page.id.as_str())) {
                stack.extend(list.iter().rev().copied());
            }
        }
        // Pages caught in a corrupt parent loop are unreachable from a root.
        for page in &all {
            if !visited.contains(page.id.as_str()) {
                out.push(page.clone());
            }
        }
        out
    }

    /// Every page in storage order.
    fn all_pages(&self) -> Vec<Page> {
        self.read(|txn| {
            locate::maps_in(txn, &self.pages)
                .into_iter()
                .map(|(index, map)| codec::read_page(txn, &map, index as usize))
                .collect()
        })
    }

    pub fn get_page(&self, id: &str) -> Option<Page> {
        self.read(|txn| {
            locate::find_page(txn, &self.pages, id)
                .map(|slot| codec::read_page(txn, &slot.map, slot.index as usize))
        })
    }

    /// Direct children of `parent_id` (`None` for root pages), sorted by
    /// order.
    pub fn get_child_pages(&self, parent_id: Option<&str>) -> Vec<Page> {
        self.read(|txn| {
            locate::page_group(txn, &self.pages, parent_id)
                .into_iter()
                .map(|sibling| {
                    let mut page = codec::read_page(txn, &sibling.map, 0);
                    page.order = sibling.order;
                    page
                })
                .collect()
        })
    }

    pub fn page_count(&self) -> usize {
        self.read(|txn| locate::maps_in(txn, &self.pages).len())
    }

    /// Blocks of a page sorted by order; empty when the page is unknown.
    pub fn get_blocks(&self, page_id: &str) -> Vec<Block> {
        self.get_page(page_id).map(|p| p.blocks).unwrap_or_default()
    }

    pub fn get_block(&self, id: &str) -> Option<Block> {
        self.read(|txn| {
            locate::find_block(txn, &self.pages, id)
                .map(|slot| codec::read_block(txn, &slot.map, slot.index as usize, &slot.page_id))
        })
    }

    /// Components of a block sorted by order; empty when the block is
    /// unknown.
    pub fn get_components(&self, block_id: &str) -> Vec<Component> {
        self.get_block(block_id)
            .map(|b| b.components)
            .unwrap_or_default()
    }

    pub fn get_component(&self, id: &str) -> Option<Component> {
        self.read(|txn| {
            locate::find_component(txn, &self.pages, id).map(|slot| {
                codec::read_component(
                    txn,
                    &slot.map,
                    slot.index as usize,
                    &slot.block_id,
                    &slot.page_id,
                )
            })
        })
    }

    pub fn get_page_properties(&self, id: &str) -> Option<PropertyMap> {
        self.read(|txn| {
            locate::find_page(txn, &self.pages, id)
                .map(|slot| codec::read_properties(txn, &slot.map, keys::PROPERTIES))
        })
    }

    pub fn get_block_properties(&self, id: &str) -> Option<PropertyMap> {
        self.read(|txn| {
            locate::find_block(txn, &self.pages, id)
                .map(|slot| codec::read_properties(txn, &slot.map, keys::PROPERTIES))
        })
    }
}
