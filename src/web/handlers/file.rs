//! Collection file handlers: download, archive, upload, delete.

use axum::{
    body::Body,
    extract::{
        multipart::{MultipartError, MultipartRejection},
        Multipart, Path, State,
    },
    http::{header, StatusCode},
    response::Response,
    Json,
};
use futures::TryStreamExt;
use std::sync::Arc;
use tokio_util::io::ReaderStream;

use crate::web::dto::{MessageResponse, UploadResponse};
use crate::web::error::ApiError;
use crate::web::handlers::AppState;
use crate::MddeError;

/// Multipart field carrying the uploaded file.
pub const UPLOAD_FIELD: &str = "script";

/// Alternative field name accepted for uploads.
pub const UPLOAD_FIELD_ALT: &str = "file";

/// Generate a safe Content-Disposition header value for file downloads.
///
/// Control characters are dropped and quotes/backslashes replaced in the
/// plain `filename`; non-ASCII names also get an RFC 5987 `filename*`.
pub(crate) fn content_disposition_header(filename: &str) -> String {
    if filename.is_ascii() && !filename.chars().any(|c| c.is_control() || c == '"' || c == '\\') {
        return format!("attachment; filename=\"{}\"", filename);
    }

    let sanitized: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| match c {
            '"' | '\\' => '_',
            _ => c,
        })
        .collect();

    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        sanitized,
        urlencoding::encode(filename)
    )
}

fn multipart_error(err: MultipartError, limit: u64) -> MddeError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        MddeError::FileTooLarge { limit }
    } else {
        MddeError::InvalidUpload(err.body_text())
    }
}

/// GET /get/:collection/:file_name - Download one file.
#[utoipa::path(
    get,
    path = "/get/{collection}/{file_name}",
    tag = "scripts",
    params(
        ("collection" = String, Path, description = "Collection name"),
        ("file_name" = String, Path, description = "File name")
    ),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 400, description = "Not a file", body = crate::web::error::ErrorBody),
        (status = 403, description = "Path outside the storage root", body = crate::web::error::ErrorBody),
        (status = 404, description = "File not found", body = crate::web::error::ErrorBody)
    )
)]
pub async fn download_file(
    State(state): State<Arc<AppState>>,
    Path((collection, file_name)): Path<(String, String)>,
) -> Result<Response<Body>, ApiError> {
    let stored = state.store.open_file(&collection, &file_name).await?;

    tracing::info!(%collection, %file_name, size = stored.size, "Download file");

    let disposition = content_disposition_header(&file_name);
    let size = stored.size;
    let stream = ReaderStream::new(stored.file).inspect_err(move |e| {
        tracing::error!(%collection, %file_name, error = %e, "File read failed mid-transfer");
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/octet-stream")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// GET /get/:collection - Download a whole collection as a zip archive.
#[utoipa::path(
    get,
    path = "/get/{collection}",
    tag = "scripts",
    params(
        ("collection" = String, Path, description = "Collection name")
    ),
    responses(
        (status = 200, description = "Zip archive", content_type = "application/zip"),
        (status = 403, description = "Path outside the storage root", body = crate::web::error::ErrorBody),
        (status = 404, description = "Collection not found", body = crate::web::error::ErrorBody),
        (status = 500, description = "Archive creation failed", body = crate::web::error::ErrorBody)
    )
)]
pub async fn download_collection(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
) -> Result<Response<Body>, ApiError> {
    let archive = state.store.build_archive(&collection).await?;

    tracing::info!(
        %collection,
        entries = archive.entries,
        size = archive.size,
        "Download collection archive"
    );

    let disposition = content_disposition_header(&archive.file_name);
    let size = archive.size;
    let stream = archive.into_stream().inspect_err(move |e| {
        tracing::error!(%collection, error = %e, "Archive read failed mid-transfer");
    });

    Response::builder()
        .header(header::CONTENT_TYPE, "application/zip")
        .header(header::CONTENT_DISPOSITION, disposition)
        .header(header::CONTENT_LENGTH, size)
        .body(Body::from_stream(stream))
        .map_err(|e| {
            tracing::error!("Failed to build response: {}", e);
            ApiError::internal("Failed to build response")
        })
}

/// POST /upload/:collection - Upload a file into a collection.
///
/// Request body: multipart/form-data with the file in the `script` field
/// (`file` is accepted too). The collection is created if needed and a file
/// with the same name is replaced.
#[utoipa::path(
    post,
    path = "/upload/{collection}",
    tag = "scripts",
    params(
        ("collection" = String, Path, description = "Collection name")
    ),
    responses(
        (status = 200, description = "File uploaded", body = UploadResponse),
        (status = 400, description = "No file or malformed upload", body = crate::web::error::ErrorBody),
        (status = 403, description = "Path outside the storage root", body = crate::web::error::ErrorBody),
        (status = 413, description = "File too large", body = crate::web::error::ErrorBody)
    )
)]
pub async fn upload_file(
    State(state): State<Arc<AppState>>,
    Path(collection): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart =
        multipart.map_err(|e| ApiError::from(MddeError::InvalidUpload(e.body_text())))?;
    let limit = state.store.max_file_size();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| multipart_error(e, limit))?
    {
        if !matches!(field.name(), Some(UPLOAD_FIELD | UPLOAD_FIELD_ALT)) {
            continue;
        }

        // Browsers send an empty filename when no file was chosen
        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => continue,
        };

        let upload = state
            .store
            .write_file(
                &collection,
                &file_name,
                field.map_err(move |e| multipart_error(e, limit)),
            )
            .await
            .inspect_err(|e| {
                tracing::warn!(%collection, %file_name, error = %e, "Upload rejected");
            })?;

        tracing::info!(%collection, %file_name, size = upload.size, "Uploaded file");

        return Ok(Json(UploadResponse::from(upload)));
    }

    Err(MddeError::UploadMissing.into())
}

/// DELETE /delete/:collection/:file_name - Delete one file.
#[utoipa::path(
    delete,
    path = "/delete/{collection}/{file_name}",
    tag = "scripts",
    params(
        ("collection" = String, Path, description = "Collection name"),
        ("file_name" = String, Path, description = "File name")
    ),
    responses(
        (status = 200, description = "File deleted", body = MessageResponse),
        (status = 400, description = "Not a file", body = crate::web::error::ErrorBody),
        (status = 403, description = "Path outside the storage root", body = crate::web::error::ErrorBody),
        (status = 404, description = "File not found", body = crate::web::error::ErrorBody)
    )
)]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path((collection, file_name)): Path<(String, String)>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.delete_file(&collection, &file_name).await?;

    tracing::info!(%collection, %file_name, "Deleted file");

    Ok(Json(MessageResponse::new("File deleted")))
}
