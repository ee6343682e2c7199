//! Zip packaging of collections and temporary-file cleanup.

use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use bytes::Bytes;
use futures::Stream;
use tokio_util::io::ReaderStream;
use zip::result::ZipResult;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Deflate level used for archives.
pub const ARCHIVE_COMPRESSION_LEVEL: i64 = 9;

/// Removes a temporary file when dropped.
///
/// Call [`TempFileGuard::disarm`] to keep the file.
#[derive(Debug)]
pub struct TempFileGuard {
    path: PathBuf,
    armed: bool,
}

impl TempFileGuard {
    /// Guard the file at `path`. The file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    /// Path of the guarded file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Keep the file and return its path.
    pub fn disarm(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }

        match std::fs::remove_file(&self.path) {
            Ok(()) => tracing::debug!(path = %self.path.display(), "Removed temporary file"),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                tracing::warn!(path = %self.path.display(), error = %e, "Failed to remove temporary file")
            }
        }
    }
}

/// Write a zip of everything under `source` to `dest`.
///
/// Entry names are relative to `source`; subdirectories are included
/// recursively. Entries are added in name order. Symlinks and special files
/// are skipped. Returns the number of file entries written.
pub fn write_zip(source: &Path, dest: &Path) -> ZipResult<usize> {
    let mut zip = ZipWriter::new(BufWriter::new(File::create(dest)?));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(ARCHIVE_COMPRESSION_LEVEL));

    let mut count = 0;
    add_dir_contents(&mut zip, source, "", options, &mut count)?;

    let mut writer = zip.finish()?;
    writer.flush()?;

    Ok(count)
}

fn add_dir_contents<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    dir: &Path,
    prefix: &str,
    options: SimpleFileOptions,
    count: &mut usize,
) -> ZipResult<()> {
    let mut entries = std::fs::read_dir(dir)?.collect::<io::Result<Vec<_>>>()?;
    entries.sort_by_key(|entry| entry.file_name());

    for entry in entries {
        let entry_name = format!("{prefix}{}", entry.file_name().to_string_lossy());
        let file_type = entry.file_type()?;

        if file_type.is_dir() {
            let dir_name = format!("{entry_name}/");
            zip.add_directory(dir_name.as_str(), options)?;
            add_dir_contents(zip, &entry.path(), &dir_name, options, count)?;
        } else if file_type.is_file() {
            zip.start_file(entry_name.as_str(), options)?;
            let mut file = File::open(entry.path())?;
            io::copy(&mut file, zip)?;
            *count += 1;
        }
    }

    Ok(())
}

/// Chunked reader over a temporary archive.
///
/// The archive file is deleted as soon as the stream is exhausted, or when
/// the stream is dropped early (for example when the client disconnects).
pub struct ArchiveStream {
    inner: ReaderStream<tokio::fs::File>,
    guard: Option<TempFileGuard>,
}

impl ArchiveStream {
    /// Stream `file`, deleting the file behind `guard` afterwards.
    pub fn new(file: tokio::fs::File, guard: TempFileGuard) -> Self {
        Self {
            inner: ReaderStream::new(file),
            guard: Some(guard),
        }
    }
}

impl Stream for ArchiveStream {
    type Item = io::Result<Bytes>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = ready!(Pin::new(&mut this.inner).poll_next(cx));
        if item.is_none() {
            this.guard.take();
        }
        Poll::Ready(item)
    }
}

/// A collection packaged into a temporary zip, ready for transmission.
pub struct PackagedArchive {
    /// Download file name (`<collection>_scripts.zip`).
    pub file_name: String,
    /// Archive size in bytes.
    pub size: u64,
    /// Number of files packaged.
    pub entries: usize,
    stream: ArchiveStream,
}

impl PackagedArchive {
    pub(crate) fn new(file_name: String, size: u64, entries: usize, stream: ArchiveStream) -> Self {
        Self {
            file_name,
            size,
            entries,
            stream,
        }
    }

    /// Consume the archive as a byte stream.
    pub fn into_stream(self) -> ArchiveStream {
        self.stream
    }
}
