//! mdde-web - HTTP file service for development environment scripts.
//!
//! Serves named script collections from a scoped directory: listing,
//! download, zip packaging, upload and deletion, plus the fixed setup
//! scripts used to bootstrap a new environment.

pub mod config;
pub mod error;
pub mod file;
pub mod logging;
pub mod web;

pub use config::Config;
pub use error::{MddeError, Result};
pub use file::ScopedFileStore;
pub use web::WebServer;
