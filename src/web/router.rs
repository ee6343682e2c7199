//! Router configuration for the script service.

use axum::{
    extract::{DefaultBodyLimit, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use super::dto::{
    CollectionFilesResponse, CollectionListResponse, CollectionSummary, HealthResponse,
    MessageResponse, UploadResponse,
};
use super::error::ErrorBody;
use super::handlers::{
    delete_file, download_collection, download_file, download_setup_script, health_check,
    list_collection, list_collections, upload_file, AppState,
};
use super::middleware::create_cors_layer;

/// Allowance for multipart boundaries and part headers on top of the file
/// size limit.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

/// OpenAPI document for the script service.
#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::handlers::file::download_file,
        crate::web::handlers::file::download_collection,
        crate::web::handlers::file::upload_file,
        crate::web::handlers::file::delete_file,
        crate::web::handlers::list::list_collections,
        crate::web::handlers::list::list_collection,
        crate::web::handlers::setup::download_setup_script,
        crate::web::handlers::health::health_check,
    ),
    components(schemas(
        CollectionSummary,
        CollectionListResponse,
        CollectionFilesResponse,
        UploadResponse,
        MessageResponse,
        HealthResponse,
        ErrorBody,
    )),
    tags(
        (name = "scripts", description = "Script collections"),
        (name = "setup", description = "Fixed setup scripts"),
        (name = "health", description = "Liveness")
    )
)]
pub struct ApiDoc;

/// Create the main API router.
pub fn create_router(app_state: Arc<AppState>, cors_origins: &[String]) -> Router {
    let body_limit = usize::try_from(app_state.store.max_file_size())
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD);

    let script_routes = Router::new()
        .route("/get/:collection", get(download_collection))
        .route("/get/:collection/:file_name", get(download_file))
        .route(
            "/upload/:collection",
            post(upload_file).layer(DefaultBodyLimit::max(body_limit)),
        )
        .route("/list", get(list_collections))
        .route("/list/:collection", get(list_collection))
        .route("/delete/:collection/:file_name", delete(delete_file));

    Router::new()
        .merge(script_routes)
        .route("/download/:name", get(download_setup_script))
        .route("/health", get(health_check))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(create_cors_layer(cors_origins)),
        )
        .with_state(app_state)
}

/// Create the Swagger UI router.
pub fn create_swagger_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}

/// Create a fallback router serving static files from `path`.
///
/// Requests under any of the `excluded` directories (relative to `path`)
/// get 404. Returns `None` when the directory does not exist.
pub fn create_static_router(path: impl AsRef<Path>, excluded: Vec<PathBuf>) -> Option<Router> {
    let path = path.as_ref();
    if !path.is_dir() {
        tracing::warn!(path = %path.display(), "Static directory not found, static serving disabled");
        return None;
    }

    let excluded: Arc<[PathBuf]> = excluded.into();
    Some(
        Router::new()
            .fallback_service(ServeDir::new(path))
            .layer(middleware::from_fn_with_state(excluded, reject_excluded)),
    )
}

async fn reject_excluded(
    State(excluded): State<Arc<[PathBuf]>>,
    request: Request,
    next: Next,
) -> Response {
    // Same decoding ServeDir applies before touching the filesystem
    let Ok(decoded) = urlencoding::decode(request.uri().path()) else {
        return StatusCode::NOT_FOUND.into_response();
    };
    let requested: PathBuf = decoded
        .split('/')
        .filter(|segment| !segment.is_empty() && *segment != ".")
        .collect();

    if excluded.iter().any(|dir| requested.starts_with(dir)) {
        tracing::debug!(path = %decoded, "Refused static request for private directory");
        return StatusCode::NOT_FOUND.into_response();
    }

    next.run(request).await
}
