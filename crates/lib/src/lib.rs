//! Pagetree: a collaborative page/block/component tree on a Y-CRDT document.
//!
//! ## Core Concepts
//!
//! * **Pages (`model::Page`)**: the top level. Pages form a forest through
//!   their `parent_id`; sibling sequence is given by an explicit `order`.
//! * **Blocks (`model::Block`)**: ordered sections owned by exactly one page.
//! * **Components (`model::Component`)**: ordered content items owned by
//!   exactly one block, each with replicated rich text and an optional lock.
//! * **StructureStore (`store::StructureStore`)**: the facade through which
//!   every read and mutation happens. Each mutation is one atomic,
//!   origin-tagged batch on the underlying `yrs` document.
//! * **Change notification (`notifier`)**: typed [`StructuralChange`] events
//!   delivered to listeners after each committed batch, local or remote.
//!
//! ```
//! use pagetree::{StoreConfig, StructureStore};
//!
//! let store = StructureStore::new(StoreConfig::default());
//! let a = store.create_page("A", None)?;
//! let b = store.create_page("B", None)?;
//! store.move_page(&b.id, Some(&a.id), None)?;
//! assert_eq!(store.get_child_pages(Some(&a.id))[0].name, "B");
//! # Ok::<(), pagetree::Error>(())
//! ```

pub mod clock;
pub mod clone;
pub mod config;
pub mod cycle;
pub mod id;
pub mod model;
pub mod notifier;
pub mod ordering;
pub mod store;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::StoreConfig;
pub use id::{EntityKind, IdGenerator};
pub use model::{
    Block, BlockUpdate, ClientRef, Component, ComponentUpdate, NewBlock, NewComponent, Page,
    PageUpdate, PropertyMap,
};
pub use notifier::{ChangeKind, ChangePath, ListenerId, PathSegment, StructuralChange};
pub use store::{
    DEFAULT_BLOCK_NAME, ImportBlock, ImportComponent, ImportPage, ROOT_REF, StructureError,
    StructureStore, SyncError,
};

/// Result type used throughout the Pagetree library.
pub type Result<T> = std::result::Result<T, Error>;

/// Common error type for the Pagetree library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    /// Structured errors from tree operations
    #[error(transparent)]
    Structure(store::StructureError),

    /// Structured errors from replica update exchange
    #[error(transparent)]
    Sync(store::SyncError),
}

impl Error {
    /// Get the originating module for this error.
    pub fn module(&self) -> &'static str {
        match self {
            Error::Structure(_) => "store",
            Error::Sync(_) => "sync",
            Error::Io(_) => "io",
            Error::Serialize(_) => "serialize",
        }
    }

    /// The structured tree error, if this is one.
    pub fn as_structure(&self) -> Option<&StructureError> {
        match self {
            Error::Structure(err) => Some(err),
            _ => None,
        }
    }

    /// Check if this error indicates a referenced entity was not found.
    pub fn is_not_found(&self) -> bool {
        self.as_structure().is_some_and(StructureError::is_not_found)
    }

    /// Check if this error indicates a rejected cyclic reparent.
    pub fn is_cycle(&self) -> bool {
        self.as_structure().is_some_and(StructureError::is_cycle)
    }

    /// Check if this error indicates an out of range position.
    pub fn is_invalid_index(&self) -> bool {
        self.as_structure().is_some_and(StructureError::is_invalid_index)
    }

    /// Check if this error indicates a failed consistency check.
    pub fn is_invariant_violation(&self) -> bool {
        self.as_structure()
            .is_some_and(StructureError::is_invariant_violation)
    }

    /// Check if this error came from decoding or applying a remote update.
    pub fn is_sync_error(&self) -> bool {
        matches!(self, Error::Sync(_))
    }

    /// Check if this error is I/O related.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Error::Io(_))
    }
}
