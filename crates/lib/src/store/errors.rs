//! Error types for structure operations.
//!
//! Every expected failure of a [`StructureStore`](crate::StructureStore)
//! operation is reported as a [`StructureError`] carrying the operation name
//! and the offending id, so that callers can log meaningfully. Failures are
//! detected before the first write of a batch, so an error always means the
//! tree is unchanged.

use thiserror::Error;

use crate::id::EntityKind;

/// Errors produced by structural operations on the page tree.
#[non_exhaustive]
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StructureError {
    /// A referenced page, block or component does not exist
    #[error("{operation}: {kind} '{id}' not found")]
    NotFound {
        operation: &'static str,
        kind: EntityKind,
        id: String,
    },

    /// The requested reparent would create a cycle or targets the page itself
    #[error("{operation}: moving page '{page_id}' under '{target_id}' would create a cycle")]
    Cycle {
        operation: &'static str,
        page_id: String,
        target_id: String,
    },

    /// A target position lies outside `[0, len]`
    #[error("{operation}: index {index} is outside 0..={len}")]
    InvalidIndex {
        operation: &'static str,
        index: i64,
        len: usize,
    },

    /// An internal consistency check failed
    #[error("Invariant violation: {reason}")]
    InvariantViolation { reason: String },
}

impl StructureError {
    pub(crate) fn not_found(operation: &'static str, kind: EntityKind, id: impl Into<String>) -> Self {
        StructureError::NotFound {
            operation,
            kind,
            id: id.into(),
        }
    }

    pub(crate) fn invariant(reason: impl Into<String>) -> Self {
        StructureError::InvariantViolation {
            reason: reason.into(),
        }
    }

    /// Check if a referenced entity was missing
    pub fn is_not_found(&self) -> bool {
        matches!(self, StructureError::NotFound { .. })
    }

    /// Check if the operation was rejected by the cycle guard
    pub fn is_cycle(&self) -> bool {
        matches!(self, StructureError::Cycle { .. })
    }

    /// Check if a position argument was out of range
    pub fn is_invalid_index(&self) -> bool {
        matches!(self, StructureError::InvalidIndex { .. })
    }

    /// Check if an internal invariant check failed
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, StructureError::InvariantViolation { .. })
    }

    /// Name of the rejected operation, when known
    pub fn operation(&self) -> Option<&'static str> {
        match self {
            StructureError::NotFound { operation, .. }
            | StructureError::Cycle { operation, .. }
            | StructureError::InvalidIndex { operation, .. } => Some(operation),
            StructureError::InvariantViolation { .. } => None,
        }
    }

    /// The offending id, when the error refers to one
    pub fn id(&self) -> Option<&str> {
        match self {
            StructureError::NotFound { id, .. } => Some(id),
            StructureError::Cycle { page_id, .. } => Some(page_id),
            _ => None,
        }
    }
}

impl From<StructureError> for crate::Error {
    fn from(err: StructureError) -> Self {
        crate::Error::Structure(err)
    }
}

/// Errors raised while exchanging document updates with other replicas.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum SyncError {
    /// Update or state vector bytes could not be decoded
    #[error("Failed to decode {what}: {reason}")]
    Decode { what: &'static str, reason: String },

    /// A decoded update could not be integrated
    #[error("Failed to apply update: {reason}")]
    Apply { reason: String },
}

impl From<SyncError> for crate::Error {
    fn from(err: SyncError) -> Self {
        crate::Error::Sync(err)
    }
}
