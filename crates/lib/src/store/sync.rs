//! Update exchange with other replicas of the same document.
//!
//! Transport is out of scope: these methods produce and consume the
//! substrate's v1 binary encoding, which callers ship however they like.

use tracing::{debug, warn};
use yrs::updates::decoder::Decode;
use yrs::updates::encoder::Encode;
use yrs::{ReadTxn, StateVector, Transact, Update};

use super::{StructureStore, SyncError};
use crate::Result;
use crate::config::StoreConfig;

impl StructureStore {
    /// Build a store from an encoded document update, as produced by
    /// [`encode_state_as_update`](Self::encode_state_as_update).
    pub fn from_update(config: StoreConfig, update: &[u8]) -> Result<Self> {
        let store = Self::new(config);
        store.apply_update(update)?;
        Ok(store)
    }

    /// The encoded state vector of this replica.
    pub fn state_vector(&self) -> Vec<u8> {
        self.doc.transact().state_vector().encode_v1()
    }

    /// The full document state as one update.
    pub fn encode_state_as_update(&self) -> Vec<u8> {
        self.doc
            .transact()
            .encode_state_as_update_v1(&StateVector::default())
    }

    /// Everything this replica has that a peer with `state_vector` lacks.
    pub fn encode_diff(&self, state_vector: &[u8]) -> Result<Vec<u8>> {
        let remote = StateVector::decode_v1(state_vector).map_err(|e| SyncError::Decode {
            what: "state vector",
            reason: e.to_string(),
        })?;
        Ok(self.doc.transact().encode_state_as_update_v1(&remote))
    }

    /// Integrate an update produced by another replica.
    ///
    /// The batch carries no local origin, so listeners see it with
    /// `is_local == false`.
    pub fn apply_update(&self, update: &[u8]) -> Result<()> {
        let decoded = Update::decode_v1(update).map_err(|e| SyncError::Decode {
            what: "update",
            reason: e.to_string(),
        })?;
        let applied = {
            let mut txn = self.doc.transact_mut();
            txn.apply_update(decoded)
        };
        self.notifier.flush();
        match applied {
            Ok(()) => {
                debug!(bytes = update.len(), "Applied remote update");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Failed to apply remote update");
                Err(SyncError::Apply {
                    reason: e.to_string(),
                }
                .into())
            }
        }
    }

    /// Bring `other` up to date with this replica and vice versa.
    pub fn sync_with(&self, other: &StructureStore) -> Result<()> {
        let to_other = self.encode_diff(&other.state_vector())?;
        other.apply_update(&to_other)?;
        let to_self = other.encode_diff(&self.state_vector())?;
        self.apply_update(&to_self)
    }
}
