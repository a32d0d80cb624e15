//! Subcommand implementations.
//!
//! Documents travel between invocations as snapshot files: the full
//! document state encoded as a single update.

use std::path::Path;

use pagetree::{StoreConfig, StructureStore};

pub mod check;
pub mod import;
pub mod show;

pub type CommandResult = Result<std::process::ExitCode, Box<dyn std::error::Error>>;

/// Store settings for this invocation.
pub fn store_config(client_id: Option<&str>) -> StoreConfig {
    let config = StoreConfig::default().with_display_name("pagetree cli");
    match client_id {
        Some(id) => config.with_client_id(id),
        None => config,
    }
}

pub fn load_snapshot(path: &Path, config: StoreConfig) -> pagetree::Result<StructureStore> {
    let bytes = std::fs::read(path)?;
    let store = StructureStore::from_update(config, &bytes)?;
    tracing::debug!(path = %path.display(), pages = store.page_count(), "Loaded snapshot");
    Ok(store)
}

pub fn save_snapshot(path: &Path, store: &StructureStore) -> pagetree::Result<()> {
    std::fs::write(path, store.encode_state_as_update())?;
    tracing::info!(path = %path.display(), "Wrote snapshot");
    Ok(())
}
