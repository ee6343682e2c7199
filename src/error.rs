//! Error types for mdde-web.

use thiserror::Error;

/// Common error type for mdde-web.
#[derive(Error, Debug)]
pub enum MddeError {
    /// A collection or file name resolved outside the storage root.
    ///
    /// Carries no path so the name is never echoed to a client.
    #[error("path escapes the storage root")]
    PathEscape,

    /// The named collection directory does not exist.
    #[error("directory {0} does not exist")]
    CollectionNotFound(String),

    /// The file does not exist in the collection.
    #[error("file {file} does not exist in directory {collection}")]
    FileNotFound {
        /// Collection name.
        collection: String,
        /// File name.
        file: String,
    },

    /// The path exists but is a directory or special file.
    #[error("{0} is not a file")]
    NotAFile(String),

    /// Uploaded content exceeded the configured limit.
    #[error("file exceeds the maximum upload size of {limit} bytes")]
    FileTooLarge {
        /// Limit in bytes.
        limit: u64,
    },

    /// Archive packaging failed.
    #[error("archive error: {0}")]
    Archive(String),

    /// The upload request carried no file part.
    #[error("no file uploaded")]
    UploadMissing,

    /// The upload request body could not be decoded.
    #[error("invalid upload: {0}")]
    InvalidUpload(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<zip::result::ZipError> for MddeError {
    fn from(e: zip::result::ZipError) -> Self {
        MddeError::Archive(e.to_string())
    }
}

/// Result type alias for mdde-web operations.
pub type Result<T> = std::result::Result<T, MddeError>;
