//! Construction-time settings for a [`StructureStore`](crate::StructureStore).
//!
//! ```
//! use pagetree::StoreConfig;
//!
//! let config = StoreConfig::default()
//!     .with_client_id("client-a")
//!     .with_display_name("Alice");
//! assert_eq!(config.client_id, "client-a");
//! ```

use serde::{Deserialize, Serialize};

use crate::model::ClientRef;

/// Default suffix appended to the name of a duplicated page or block.
pub const DEFAULT_COPY_SUFFIX: &str = " (copy)";

/// Settings for one client's view of a shared document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreConfig {
    /// Origin tag attached to every batch issued by this client.
    ///
    /// Batches carrying this origin are reported as local by the change
    /// notifier. Defaults to a random UUID.
    pub client_id: String,

    /// Human readable name used when this client takes a component lock.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    /// Numeric client id of the underlying Y document. When `None` the
    /// substrate picks a random one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub doc_client_id: Option<u64>,

    /// Appended to the name of the top-level entity of a duplicate.
    #[serde(default = "default_copy_suffix")]
    pub copy_suffix: String,
}

fn default_copy_suffix() -> String {
    DEFAULT_COPY_SUFFIX.to_string()
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            client_id: uuid::Uuid::new_v4().to_string(),
            display_name: None,
            doc_client_id: None,
            copy_suffix: default_copy_suffix(),
        }
    }
}

impl StoreConfig {
    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = client_id.into();
        self
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_doc_client_id(mut self, id: u64) -> Self {
        self.doc_client_id = Some(id);
        self
    }

    pub fn with_copy_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.copy_suffix = suffix.into();
        self
    }

    /// The lock-owner reference representing this client.
    pub fn client_ref(&self) -> ClientRef {
        ClientRef {
            client_id: self.client_id.clone(),
            name: self.display_name.clone(),
        }
    }
}
