//! Collection listing handlers.

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use super::AppState;
use crate::web::dto::{CollectionFilesResponse, CollectionListResponse, CollectionSummary};
use crate::web::error::ApiError;

/// GET /list - List all collections with their files.
///
/// An absent storage root is reported as an empty list.
#[utoipa::path(
    get,
    path = "/list",
    tag = "scripts",
    responses(
        (status = 200, description = "All collections", body = CollectionListResponse),
        (status = 500, description = "Storage could not be read", body = crate::web::error::ErrorBody)
    )
)]
pub async fn list_collections(
    State(state): State<Arc<AppState>>,
) -> Result<Json<CollectionListResponse>, ApiError> {
    let directories = state
        .store
        .list_collections()
        .await?
        .into_iter()
        .map(CollectionSummary::from)
        .collect();

    Ok(Json(CollectionListResponse { directories }))
}

/// GET /list/:collection - List the files in one collection.
#[utoipa::path(
    get,
    path = "/list/{collection}",
    tag = "scripts",
    params(
        ("collection" = String, Path, description = "Collection name")
    ),
    responses(
        (status = 200, description = "Files in the collection", body = CollectionFilesResponse),
        (status = 403, description = "Path outside the storage root", body = crate::web::error::ErrorBody),
        (status = 404, description = "Collection not found", body = crate::web::error::ErrorBody)
    )
)]
pub async fn list_collection(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> Result<Json<CollectionFilesResponse>, ApiError> {
    let scripts = state.store.list_files(&collection).await?;

    Ok(Json(CollectionFilesResponse {
        directory: collection,
        scripts,
    }))
}
