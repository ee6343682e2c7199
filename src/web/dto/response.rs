//! Response DTOs for the script service.

use serde::Serialize;
use utoipa::ToSchema;

use crate::config::SCRIPTS_DIR;
use crate::file::{CollectionListing, StoredUpload};

/// One collection in the `/list` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionSummary {
    /// Collection name.
    pub name: String,
    /// Location relative to the service root.
    pub path: String,
    /// File names in the collection.
    pub scripts: Vec<String>,
}

impl From<CollectionListing> for CollectionSummary {
    fn from(listing: CollectionListing) -> Self {
        Self {
            path: format!("{SCRIPTS_DIR}/{}", listing.name),
            name: listing.name,
            scripts: listing.files,
        }
    }
}

/// `/list` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionListResponse {
    /// All collections.
    pub directories: Vec<CollectionSummary>,
}

/// `/list/{collection}` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct CollectionFilesResponse {
    /// Collection name.
    pub directory: String,
    /// File names in the collection.
    pub scripts: Vec<String>,
}

/// Upload response.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Status message.
    pub message: String,
    /// Stored file name.
    pub file_name: String,
    /// Collection name.
    pub dir_name: String,
    /// Location relative to the service root.
    pub file_path: String,
}

impl From<StoredUpload> for UploadResponse {
    fn from(upload: StoredUpload) -> Self {
        Self {
            message: "Upload successful".to_string(),
            file_path: format!("{SCRIPTS_DIR}/{}", upload.stored_path),
            file_name: upload.file_name,
            dir_name: upload.collection,
        }
    }
}

/// Plain message response.
#[derive(Debug, Serialize, ToSchema)]
pub struct MessageResponse {
    /// Status message.
    pub message: String,
}

impl MessageResponse {
    /// Create a new message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `/health` response.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Always `healthy` while the process serves requests.
    pub status: String,
    /// Current time, RFC 3339.
    pub timestamp: String,
    /// Service version.
    pub version: String,
    /// Seconds since startup.
    pub uptime: f64,
}
