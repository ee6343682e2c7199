//! HTTP API for mdde-web.
//!
//! Routes for listing, downloading, uploading and deleting scripts in
//! collections, plus setup script downloads, health and Swagger UI.

pub mod dto;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod router;
pub mod server;

pub use error::ApiError;
pub use router::create_router;
pub use server::WebServer;
