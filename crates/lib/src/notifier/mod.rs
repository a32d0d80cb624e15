//! Fan-out of document changes to typed listeners.
//!
//! A single deep observer is attached to the `pages` root. Inside the
//! substrate callback the raw events are translated into a
//! [`StructuralChange`] and queued; nothing else happens there, because the
//! document is still borrowed by the committing transaction. The store calls
//! [`ChangeNotifier::flush`] once the batch has committed, which delivers the
//! queued changes to every registered listener. Listeners are therefore free
//! to read the store, or even to issue further operations.
//!
//! Removals from the root sequence only report how many entries went away.
//! The notifier therefore keeps a roster of the root pages as of the last
//! batch and resolves removed positions against it.

mod event;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, mpsc};

use yrs::types::{Change, DeepObservable, Event, Events};
use yrs::{Array, ArrayRef, Origin, Out, Subscription, TransactionMut};

pub use event::{ChangeKind, ChangePath, PathSegment, StructuralChange};

use event::RemovedPage;

use crate::model::codec::{self, keys};

/// Receives every committed change to the tree.
///
/// Implemented for any `Fn(&StructuralChange) + Send + Sync` closure.
pub trait StructureListener: Send + Sync {
    fn on_structure_change(&self, change: &StructuralChange);
}

impl<F> StructureListener for F
where
    F: Fn(&StructuralChange) + Send + Sync,
{
    fn on_structure_change(&self, change: &StructuralChange) {
        self(change)
    }
}

/// Receives only the changes that touch a blocks or components sequence.
///
/// The change passed in is already narrowed with
/// [`StructuralChange::block_component_view`], so `affected_page_ids` names
/// exactly the pages whose blocks or components changed.
pub trait BlockComponentListener: Send + Sync {
    fn on_block_component_change(&self, change: &StructuralChange);
}

impl<F> BlockComponentListener for F
where
    F: Fn(&StructuralChange) + Send + Sync,
{
    fn on_block_component_change(&self, change: &StructuralChange) {
        self(change)
    }
}

/// Handle returned by listener registration, used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

#[derive(Default)]
struct Listeners {
    structure: Vec<(ListenerId, Arc<dyn StructureListener>)>,
    block_component: Vec<(ListenerId, Arc<dyn BlockComponentListener>)>,
}

/// Queues substrate events and dispatches them after commit.
pub struct ChangeNotifier {
    pending: Arc<Mutex<VecDeque<StructuralChange>>>,
    listeners: Mutex<Listeners>,
    next_id: AtomicU64,
    _subscription: Subscription,
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let listeners = lock(&self.listeners);
        f.debug_struct("ChangeNotifier")
            .field("pending", &lock(&self.pending).len())
            .field("structure_listeners", &listeners.structure.len())
            .field("block_component_listeners", &listeners.block_component.len())
            .finish()
    }
}

impl ChangeNotifier {
    /// Observe `pages` deeply. Batches whose origin equals `local_origin`
    /// are reported with `is_local == true`.
    pub(crate) fn attach(pages: &ArrayRef, local_origin: &str) -> Self {
        let pending: Arc<Mutex<VecDeque<StructuralChange>>> = Arc::default();
        let queue = Arc::clone(&pending);
        let root = pages.clone();
        let origin = Origin::from(local_origin);
        let roster: Mutex<Vec<RosterEntry>> = Mutex::new(Vec::new());
        let subscription = pages.observe_deep(move |txn, events| {
            let mut roster = lock(&roster);
            let change = capture(txn, events, &root, &origin, &roster);
            *roster = page_roster(txn, &root);
            lock(&queue).push_back(change);
        });
        Self {
            pending,
            listeners: Mutex::new(Listeners::default()),
            next_id: AtomicU64::new(1),
            _subscription: subscription,
        }
    }

    pub fn on_structure_change<L>(&self, listener: L) -> ListenerId
    where
        L: StructureListener + 'static,
    {
        let id = self.allocate_id();
        lock(&self.listeners)
            .structure
            .push((id, Arc::new(listener)));
        id
    }

    pub fn on_block_component_change<L>(&self, listener: L) -> ListenerId
    where
        L: BlockComponentListener + 'static,
    {
        let id = self.allocate_id();
        lock(&self.listeners)
            .block_component
            .push((id, Arc::new(listener)));
        id
    }

    /// Register a structure listener that forwards into a channel.
    ///
    /// Sends after the receiver is dropped are ignored; call
    /// [`unsubscribe`](Self::unsubscribe) with the returned id to remove the
    /// listener.
    pub fn subscribe(&self) -> (ListenerId, mpsc::Receiver<StructuralChange>) {
        let (tx, rx) = mpsc::channel();
        let tx = Mutex::new(tx);
        let id = self.on_structure_change(move |change: &StructuralChange| {
            let _ = lock(&tx).send(change.clone());
        });
        (id, rx)
    }

    /// Remove a listener. Returns false when the id was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut listeners = lock(&self.listeners);
        let before = listeners.structure.len() + listeners.block_component.len();
        listeners.structure.retain(|(lid, _)| *lid != id);
        listeners.block_component.retain(|(lid, _)| *lid != id);
        before != listeners.structure.len() + listeners.block_component.len()
    }

    pub fn listener_count(&self) -> usize {
        let listeners = lock(&self.listeners);
        listeners.structure.len() + listeners.block_component.len()
    }

    /// Deliver every queued change. Returns the number of changes delivered.
    ///
    /// Listeners run without any internal lock held, so a listener that
    /// mutates the store queues further changes which this loop delivers in
    /// turn.
    pub(crate) fn flush(&self) -> usize {
        let mut delivered = 0;
        loop {
            let Some(change) = lock(&self.pending).pop_front() else {
                return delivered;
            };
            let (structure, block_component) = {
                let listeners = lock(&self.listeners);
                (
                    listeners
                        .structure
                        .iter()
                        .map(|(_, l)| Arc::clone(l))
                        .collect::<Vec<_>>(),
                    listeners
                        .block_component
                        .iter()
                        .map(|(_, l)| Arc::clone(l))
                        .collect::<Vec<_>>(),
                )
            };
            tracing::trace!(
                paths = change.paths.len(),
                is_local = change.is_local,
                kind = ?change.kind,
                pages = ?change.affected_page_ids,
                listeners = structure.len(),
                "Dispatching change"
            );
            for listener in &structure {
                listener.on_structure_change(&change);
            }
            if !block_component.is_empty() {
                if let Some(view) = change.block_component_view() {
                    for listener in &block_component {
                        listener.on_block_component_change(&view);
                    }
                }
            }
            delivered += 1;
        }
    }

    fn allocate_id(&self) -> ListenerId {
        ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// A root page as of the previous batch.
#[derive(Debug, Clone)]
struct RosterEntry {
    id: String,
    has_blocks: bool,
}

fn page_roster(txn: &TransactionMut, pages: &ArrayRef) -> Vec<RosterEntry> {
    pages
        .iter(txn)
        .filter_map(|value| match value {
            Out::YMap(map) => Some(RosterEntry {
                id: codec::entity_id(txn, &map),
                has_blocks: codec::get_array(txn, &map, keys::BLOCKS).is_some_and(|b| b.len(txn) > 0),
            }),
            _ => None,
        })
        .collect()
}

/// Translate one batch of substrate events. `roster` is the root sequence
/// before the batch.
fn capture(
    txn: &TransactionMut,
    events: &Events,
    pages: &ArrayRef,
    origin: &Origin,
    roster: &[RosterEntry],
) -> StructuralChange {
    let is_local = txn.origin() == Some(origin);
    let mut paths = Vec::new();
    let mut inserted_pages = Vec::new();
    let mut removed_pages = Vec::new();

    for event in events.iter() {
        let segments: Vec<PathSegment> = event
            .path()
            .into_iter()
            .map(|segment| match segment {
                yrs::types::PathSegment::Key(key) => PathSegment::Key(key.to_string()),
                yrs::types::PathSegment::Index(index) => PathSegment::Index(index),
            })
            .collect();

        let (kind, keys) = match event {
            Event::Array(array_event) => {
                if segments.is_empty() {
                    let mut cursor = 0usize;
                    for change in array_event.delta(txn) {
                        match change {
                            Change::Added(values) => {
                                inserted_pages.extend(values.iter().filter_map(|value| match value {
                                    Out::YMap(map) => Some(codec::entity_id(txn, map)),
                                    _ => None,
                                }));
                            }
                            Change::Removed(len) => {
                                let end = (cursor + *len as usize).min(roster.len());
                                removed_pages.extend(roster[cursor.min(end)..end].iter().map(|entry| {
                                    RemovedPage {
                                        id: entry.id.clone(),
                                        had_blocks: entry.has_blocks,
                                    }
                                }));
                                cursor += *len as usize;
                            }
                            Change::Retain(len) => cursor += *len as usize,
                        }
                    }
                }
                (ChangeKind::Structural, Vec::new())
            }
            Event::Map(map_event) => {
                let mut keys: Vec<String> =
                    map_event.keys(txn).keys().map(|k| k.to_string()).collect();
                keys.sort();
                (ChangePath::kind_for_keys(&keys), keys)
            }
            _ => (ChangeKind::Content, Vec::new()),
        };

        let mut path = ChangePath {
            segments,
            kind,
            keys,
            page_id: None,
        };
        path.page_id = path.root_index().and_then(|index| match pages.get(txn, index) {
            Some(Out::YMap(map)) => Some(codec::entity_id(txn, &map)),
            _ => None,
        });
        paths.push(path);
    }

    StructuralChange::new(paths, is_local, inserted_pages, removed_pages)
}
