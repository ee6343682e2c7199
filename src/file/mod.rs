//! Script storage for mdde-web.
//!
//! This module provides the directory-scoped file store:
//! - Path resolution with a containment check against the storage root
//! - Listing, upload, download and deletion of files in named collections
//! - Zip packaging of whole collections into self-deleting temporary files

mod archive;
mod path;
mod storage;

pub use archive::{write_zip, ArchiveStream, PackagedArchive, TempFileGuard};
pub use path::{is_contained, is_plain_segment, normalize, resolve_under};
pub use storage::{CollectionListing, ScopedFileStore, StoredFile, StoredUpload};
