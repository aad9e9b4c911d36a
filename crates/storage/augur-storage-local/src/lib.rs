//! Local State Stores
//!
//! [`StateStore`] implementations that need no external service:
//!
//! - [`MemoryStateStore`]: process-local, for tests and ephemeral runs
//! - [`FileStateStore`]: one JSON document per agent, replaced atomically
//! - [`CachedStateStore`]: fail-closed in-memory layer over any store

use augur_core::types::StateStore;
use augur_core::{AugurConfig, Result};
use std::sync::Arc;
use tracing::info;

mod cached;
mod file;
mod memory;

pub use cached::CachedStateStore;
pub use file::FileStateStore;
pub use memory::MemoryStateStore;

/// Build the store described by the configuration
///
/// Persistent deployments get a cached file store; otherwise state lives in
/// memory only.
pub fn open_store(config: &AugurConfig) -> Result<Arc<dyn StateStore>> {
    if config.persist_state {
        info!("Persisting agent state under {}", config.data_dir.display());
        let files = FileStateStore::new(&config.data_dir)?;
        Ok(Arc::new(CachedStateStore::new(files)))
    } else {
        info!("State persistence disabled; using in-memory store");
        Ok(Arc::new(MemoryStateStore::new()))
    }
}
