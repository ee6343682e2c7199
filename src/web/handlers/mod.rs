//! API handlers for the script service.

pub mod file;
pub mod health;
pub mod list;
pub mod setup;

pub use file::*;
pub use health::*;
pub use list::*;
pub use setup::*;

use std::path::PathBuf;
use std::time::Instant;

use crate::config::StorageConfig;
use crate::file::ScopedFileStore;
use crate::Result;

/// Shared application state.
pub struct AppState {
    /// Collection store.
    pub store: ScopedFileStore,
    /// Service root holding the setup scripts.
    pub service_root: PathBuf,
    /// Setup script names served by `/download/{name}`.
    pub setup_scripts: Vec<String>,
    /// Process start, for `/health` uptime.
    pub started_at: Instant,
}

impl AppState {
    /// Create state around an existing store.
    pub fn new(store: ScopedFileStore, service_root: impl Into<PathBuf>) -> Self {
        Self {
            store,
            service_root: service_root.into(),
            setup_scripts: Vec::new(),
            started_at: Instant::now(),
        }
    }

    /// Set the setup scripts that may be downloaded.
    pub fn with_setup_scripts(mut self, scripts: Vec<String>) -> Self {
        self.setup_scripts = scripts;
        self
    }

    /// Build state from storage configuration.
    pub fn from_config(config: &StorageConfig) -> Result<Self> {
        let store = ScopedFileStore::new(
            config.scripts_dir(),
            config.temp_dir(),
            config.max_upload_size_bytes(),
        )?;

        Ok(Self::new(store, &config.root).with_setup_scripts(config.setup_scripts.clone()))
    }
}
