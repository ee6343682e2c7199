//! Setup script download handler.

use axum::{
    body::Body,
    extract::{Path, State},
    http::header,
    response::Response,
};
use std::io;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use super::file::content_disposition_header;
use super::AppState;
use crate::web::error::ApiError;
use crate::MddeError;

/// GET /download/:name - Download one of the configured setup scripts.
///
/// Only names listed in `storage.setup_scripts` are served, from the
/// service root.
#[utoipa::path(
    get,
    path = "/download/{name}",
    tag = "setup",
    params(
        ("name" = String, Path, description = "Setup script name, e.g. env-build.sh")
    ),
    responses(
        (status = 200, description = "Script content"),
        (status = 404, description = "Unknown or missing script", body = crate::web::error::ErrorBody)
    )
)]
pub async fn download_setup_script(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response<Body>, ApiError> {
    if !state.setup_scripts.iter().any(|s| *s == name) {
        return Err(ApiError::not_found("File not found"));
    }

    let path = state.service_root.join(&name);
    let file = match tokio::fs::File::open(&path).await {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::warn!(%name, "Setup script missing from service root");
            return Err(ApiError::not_found("File not found"));
        }
        Err(e) => return Err(MddeError::Io(e).into()),
    };

    let metadata = file.metadata().await.map_err(MddeError::Io)?;
    if !metadata.is_file() {
        return Err(ApiError::not_found("File not found"));
    }

    tracing::info!(%name, size = metadata.len(), "Download setup script");

    let content_type = mime_guess::from_path(&name)
        .first_or_octet_stream()
        .to_string();

    Response::builder()
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            content_disposition_header(&name),
        )
        .header(header::CONTENT_LENGTH, metadata.len())
        .body(Body::from_stream(ReaderStream::new(file)))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}
