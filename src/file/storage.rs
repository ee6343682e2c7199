//! Directory-scoped script storage.
//!
//! Collections are plain directories under a root storage directory:
//! ```text
//! {root}/
//! ├── tools/
//! │   ├── install.sh
//! │   └── setup.ps1
//! └── docker/
//!     └── compose.sh
//! ```
//! Every caller-supplied name is resolved with a containment check before
//! any filesystem access.

use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use futures::{Stream, StreamExt};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use super::archive::{self, ArchiveStream, PackagedArchive, TempFileGuard};
use super::path::{normalize, resolve_under};
use crate::{MddeError, Result};

/// A collection with the names of the regular files directly inside it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionListing {
    /// Collection name.
    pub name: String,
    /// File names, sorted.
    pub files: Vec<String>,
}

/// An open stored file, ready to be streamed.
#[derive(Debug)]
pub struct StoredFile {
    /// Read handle.
    pub file: fs::File,
    /// Size in bytes.
    pub size: u64,
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Collection the file was written to.
    pub collection: String,
    /// Stored file name.
    pub file_name: String,
    /// Path relative to the storage root (`<collection>/<file>`).
    pub stored_path: String,
    /// Bytes written.
    pub size: u64,
}

/// File store confined to a single root directory.
#[derive(Debug, Clone)]
pub struct ScopedFileStore {
    /// Absolute, normalized root storage directory.
    root: PathBuf,
    /// Scratch directory for staged uploads and archives.
    temp_dir: PathBuf,
    /// Upload size limit in bytes.
    max_file_size: u64,
}

impl ScopedFileStore {
    /// Create a store rooted at `root`.
    ///
    /// Relative paths are resolved against the current directory once, here.
    /// Neither directory is created until it is first written to.
    pub fn new(
        root: impl AsRef<Path>,
        temp_dir: impl AsRef<Path>,
        max_file_size: u64,
    ) -> Result<Self> {
        Ok(Self {
            root: absolutize(root.as_ref())?,
            temp_dir: absolutize(temp_dir.as_ref())?,
            max_file_size,
        })
    }

    /// Root storage directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Scratch directory.
    pub fn temp_dir(&self) -> &Path {
        &self.temp_dir
    }

    /// Upload size limit in bytes.
    pub fn max_file_size(&self) -> u64 {
        self.max_file_size
    }

    /// Resolve a collection, or a file inside it, to an absolute path.
    ///
    /// Fails with [`MddeError::PathEscape`] for anything that would leave
    /// the root storage directory.
    pub fn resolve_path(&self, collection: &str, file_name: Option<&str>) -> Result<PathBuf> {
        resolve_under(&self.root, collection, file_name)
    }

    /// List every collection with its files.
    ///
    /// Collections and file names are sorted. A missing root yields an
    /// empty list.
    pub async fn list_collections(&self) -> Result<Vec<CollectionListing>> {
        let mut dir = match fs::read_dir(&self.root).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut collections = Vec::new();
        while let Some(entry) = dir.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }

            let files = match file_names(&entry.path()).await {
                Ok(files) => files,
                // Removed between the two reads
                Err(MddeError::Io(e)) if e.kind() == io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e),
            };

            collections.push(CollectionListing {
                name: entry.file_name().to_string_lossy().into_owned(),
                files,
            });
        }

        collections.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(collections)
    }

    /// List the files directly inside a collection.
    pub async fn list_files(&self, collection: &str) -> Result<Vec<String>> {
        let dir = self.existing_collection(collection).await?;
        file_names(&dir).await
    }

    /// Open a stored file for reading.
    pub async fn open_file(&self, collection: &str, file_name: &str) -> Result<StoredFile> {
        let path = self.resolve_path(collection, Some(file_name))?;

        let metadata = match fs::metadata(&path).await {
            Ok(metadata) => metadata,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(file_not_found(collection, file_name))
            }
            Err(e) => return Err(e.into()),
        };

        if !metadata.is_file() {
            return Err(MddeError::NotAFile(file_name.to_string()));
        }

        let file = fs::File::open(&path).await?;
        Ok(StoredFile {
            file,
            size: metadata.len(),
        })
    }

    /// Store an uploaded file, replacing any file with the same name.
    ///
    /// The content is staged in the scratch directory and moved into the
    /// collection only once the whole stream has been accepted, so a
    /// rejected upload leaves the collection untouched.
    pub async fn write_file<S, E>(
        &self,
        collection: &str,
        file_name: &str,
        content: S,
    ) -> Result<StoredUpload>
    where
        S: Stream<Item = std::result::Result<Bytes, E>>,
        E: Into<MddeError>,
    {
        let target = self.resolve_path(collection, Some(file_name))?;
        let collection_dir = self.resolve_path(collection, None)?;

        if fs::metadata(&target).await.is_ok_and(|m| m.is_dir()) {
            return Err(MddeError::NotAFile(file_name.to_string()));
        }

        fs::create_dir_all(&self.temp_dir).await?;
        let staging =
            TempFileGuard::new(self.temp_dir.join(format!("upload-{}.part", Uuid::new_v4())));
        let mut out = fs::File::create(staging.path()).await?;

        let mut written: u64 = 0;
        futures::pin_mut!(content);
        while let Some(chunk) = content.next().await {
            let chunk = chunk.map_err(Into::<MddeError>::into)?;
            written += chunk.len() as u64;
            if written > self.max_file_size {
                return Err(MddeError::FileTooLarge {
                    limit: self.max_file_size,
                });
            }
            out.write_all(&chunk).await?;
        }
        out.flush().await?;
        drop(out);

        // create_dir_all treats an existing directory as success
        fs::create_dir_all(&collection_dir).await?;
        fs::rename(staging.path(), &target).await?;
        staging.disarm();

        tracing::debug!(
            collection,
            file_name,
            size = written,
            "Stored uploaded file"
        );

        Ok(StoredUpload {
            collection: collection.to_string(),
            file_name: file_name.to_string(),
            stored_path: format!("{collection}/{file_name}"),
            size: written,
        })
    }

    /// Delete one file from a collection.
    ///
    /// Directories are never removed.
    pub async fn delete_file(&self, collection: &str, file_name: &str) -> Result<()> {
        let path = self.resolve_path(collection, Some(file_name))?;

        match fs::symlink_metadata(&path).await {
            Ok(metadata) if metadata.is_dir() => {
                return Err(MddeError::NotAFile(file_name.to_string()))
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(file_not_found(collection, file_name))
            }
            Err(e) => return Err(e.into()),
        }

        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(file_not_found(collection, file_name))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Package a collection into a temporary zip archive.
    ///
    /// The archive is written on a blocking worker. The returned stream
    /// deletes the temporary file once it is consumed or dropped.
    pub async fn build_archive(&self, collection: &str) -> Result<PackagedArchive> {
        let source = self.existing_collection(collection).await?;

        fs::create_dir_all(&self.temp_dir).await?;
        let guard = TempFileGuard::new(self.temp_dir.join(format!(
            "{collection}_scripts-{}.zip",
            Uuid::new_v4()
        )));

        // The guard travels with the blocking task so the file is removed
        // even if this future is dropped while packaging is still running.
        let (guard, entries) = tokio::task::spawn_blocking(move || {
            archive::write_zip(&source, guard.path()).map(|entries| (guard, entries))
        })
        .await
        .map_err(|e| MddeError::Archive(format!("archive task failed: {e}")))??;

        let file = fs::File::open(guard.path()).await?;
        let size = file.metadata().await?.len();

        Ok(PackagedArchive::new(
            format!("{collection}_scripts.zip"),
            size,
            entries,
            ArchiveStream::new(file, guard),
        ))
    }

    async fn existing_collection(&self, collection: &str) -> Result<PathBuf> {
        let dir = self.resolve_path(collection, None)?;

        match fs::metadata(&dir).await {
            Ok(metadata) if metadata.is_dir() => Ok(dir),
            Ok(_) => Err(MddeError::CollectionNotFound(collection.to_string())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(MddeError::CollectionNotFound(collection.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(normalize(path))
    } else {
        Ok(normalize(&std::env::current_dir()?.join(path)))
    }
}

fn file_not_found(collection: &str, file_name: &str) -> MddeError {
    MddeError::FileNotFound {
        collection: collection.to_string(),
        file: file_name.to_string(),
    }
}

/// Sorted names of the regular files directly inside `dir`.
async fn file_names(dir: &Path) -> Result<Vec<String>> {
    let mut entries = fs::read_dir(dir).await?;
    let mut names = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }

    names.sort();
    Ok(names)
}
