//! CORS middleware configuration.

use axum::http::{HeaderValue, Method};
use tower_http::cors::{Any, CorsLayer};

/// Methods used by the script API.
const METHODS: [Method; 4] = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];

/// Create a CORS layer from the configured origins.
///
/// With no origins configured (or none that parse) any origin is allowed,
/// matching a plain shared-folder deployment. Otherwise only the listed
/// origins are.
pub fn create_cors_layer(origins: &[String]) -> CorsLayer {
    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|o| match o.parse() {
            Ok(origin) => Some(origin),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods(METHODS)
        .allow_headers(Any);

    if parsed_origins.is_empty() {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(parsed_origins)
    }
}
