//! Middleware for the script service.

pub mod cors;

pub use cors::create_cors_layer;
