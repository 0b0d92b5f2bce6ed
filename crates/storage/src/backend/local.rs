//! Local filesystem storage backend.
//!
//! This module provides a storage backend implementation for the local filesystem.
//! Files are stored in a configured directory and accessed using standard filesystem
//! operations via `tokio::fs` for async I/O.

use crate::backend::{ByteStream, FileInfoStream, UploadOptions};
use crate::error::ErrorKind;
use crate::path::{has_prefix, validate as validate_path};
use crate::{FileInfo, StorageBackend, error::Result};
use async_stream::{stream, try_stream};
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt};
use std::fs::{Metadata, create_dir_all as sync_create_dir};
use std::path::{Path, PathBuf};
use tokio::fs::{self, DirEntry};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

enum WalkEntry {
    File(FileInfo),
    Descend(PathBuf),
    Skip,
}

/// Local filesystem storage backend.
///
/// Stores files in a directory on the local filesystem. All keys are relative
/// to the configured root directory. The backend name doubles as the
/// container files are addressed under when a public URL is configured.
///
/// # Examples
///
/// ```no_run
/// use iconvault_storage::backend::LocalBackend;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = LocalBackend::new("icons", "/var/lib/icons")?
///     .with_public_url("https://cdn.example.org");
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct LocalBackend {
    name: String,
    /// Root directory for stored assets
    root: PathBuf,
    public_url: Option<String>,
}
impl LocalBackend {
    /// Create a new local filesystem backend.
    ///
    /// # Arguments
    /// * `root` - Absolute path to the storage root directory
    ///
    /// # Errors
    ///
    /// Returns an error if the path is not absolute, or exists and is not a
    /// directory.
    pub fn new(name: impl Into<String>, root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_absolute() {
            exn::bail!(ErrorKind::InvalidPath(root.display().to_string()));
        }

        if root.exists() {
            if !root.is_dir() {
                exn::bail!(ErrorKind::InvalidPath(root.display().to_string()));
            }
        } else {
            // Use non-async here; it'll only happen once on initialization
            // and it's not worth the hassle of making the constructor async.
            sync_create_dir(&root).map_err(|e| Self::map_io_error(e, &root.display().to_string()))?;
        }

        Ok(Self {
            name: name.into(),
            root,
            public_url: None,
        })
    }

    /// Base URL the storage root is served from.
    pub fn with_public_url(mut self, public_url: impl Into<String>) -> Self {
        self.public_url = Some(public_url.into());
        self
    }

    /// Get the absolute path for a relative storage key.
    ///
    /// Validates the key and joins it with the root directory.
    fn absolute_path(&self, key: &str) -> Result<PathBuf> {
        let validated = validate_path(key)?;
        Ok(self.root.join(validated))
    }

    /// Convert an absolute path back to a relative storage key.
    fn relative_path(&self, absolute: impl AsRef<Path>) -> Result<String> {
        let absolute = absolute.as_ref();
        let Ok(relative) = absolute.strip_prefix(&self.root) else {
            exn::bail!(ErrorKind::BackendError(format!(
                "path `{}` is not within root `{}`",
                absolute.display(),
                self.root.display()
            )));
        };
        let Some(relative) = relative.to_str() else {
            exn::bail!(ErrorKind::InvalidPath(relative.display().to_string()));
        };
        validate_path(relative)
    }

    /// Re-use same data collection from file metadata for list, stat and upload.
    fn metadata(&self, key: String, metadata: Metadata) -> Result<FileInfo> {
        let modified = metadata.modified().map_err(ErrorKind::Io)?.into();
        Ok(FileInfo::new(key, metadata.len(), modified, &self.name).with_service_url(self.public_url.clone()))
    }

    fn map_io_error(e: std::io::Error, key: &str) -> ErrorKind {
        match e.kind() {
            std::io::ErrorKind::NotFound => ErrorKind::NotFound(key.to_string()),
            std::io::ErrorKind::PermissionDenied => ErrorKind::PermissionDenied(key.to_string()),
            _ => ErrorKind::Io(e),
        }
    }

    /// Keeps the stream loop in `list_stream` free of error plumbing.
    async fn process_entry(&self, entry: DirEntry, prefix: Option<&str>) -> Result<WalkEntry> {
        let path = entry.path();
        let relative = self.relative_path(&path)?;
        let metadata = entry.metadata().await.map_err(|e| Self::map_io_error(e, &relative))?;
        if metadata.is_dir() {
            // Descend into parents of the prefix as well as its children.
            let leads_to_prefix = prefix.is_some_and(|pfx| Path::new(pfx).starts_with(&relative));
            return match has_prefix(&relative, prefix) || leads_to_prefix {
                true => Ok(WalkEntry::Descend(path)),
                false => Ok(WalkEntry::Skip),
            };
        }
        if !has_prefix(&relative, prefix) {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() && is_partial(&path) {
            return Ok(WalkEntry::Skip);
        }
        if metadata.is_file() {
            return Ok(WalkEntry::File(self.metadata(relative, metadata)?));
        }
        // Note: silently drop what is most likely a broken symlink.
        Ok(WalkEntry::Skip)
    }

    /// Copy `content` into `file`, returning the BLAKE3 hex digest.
    async fn write_stream(mut file: fs::File, mut content: ByteStream, key: &str) -> Result<String> {
        let mut hasher = blake3::Hasher::new();
        while let Some(chunk) = content.try_next().await? {
            hasher.update(&chunk);
            file.write_all(&chunk).await.map_err(|e| Self::map_io_error(e, key))?;
        }
        file.flush().await.map_err(|e| Self::map_io_error(e, key))?;
        Ok(hasher.finalize().to_hex().to_string())
    }

    fn read_file(absolute: Result<PathBuf>, key: String) -> impl Stream<Item = Result<Bytes>> + Send + 'static {
        try_stream! {
            let absolute = absolute?;
            let file = fs::File::open(&absolute).await.map_err(|e| Self::map_io_error(e, &key))?;
            let mut reader = ReaderStream::new(file);
            while let Some(chunk) = reader.next().await {
                yield chunk.map_err(|e| Self::map_io_error(e, &key))?;
            }
        }
    }
}

const PARTIAL_SUFFIX: &str = ".partial";

/// In-progress upload location for `target`: a hidden sibling, `.{name}.partial`.
fn partial_path(target: &Path) -> PathBuf {
    let mut name = std::ffi::OsString::from(".");
    name.push(target.file_name().unwrap_or_default());
    name.push(PARTIAL_SUFFIX);
    target.with_file_name(name)
}

fn is_partial(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name.starts_with('.') && name.ends_with(PARTIAL_SUFFIX))
}

#[async_trait]
impl StorageBackend for LocalBackend {
    fn name(&self) -> &str {
        &self.name
    }

    #[tracing::instrument(skip(self, content), fields(backend = %self.name, name = %options.name))]
    async fn upload(&self, content: ByteStream, options: UploadOptions) -> Result<FileInfo> {
        let key = validate_path(&options.name)?;
        let abs_path = self.root.join(&key);
        // Create parent directories if needed, keys may be nested.
        if let Some(parent) = abs_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| Self::map_io_error(e, &key))?;
        }
        // The target is only ever replaced by a complete file.
        let partial = partial_path(&abs_path);
        let file = fs::File::create(&partial).await.map_err(|e| Self::map_io_error(e, &key))?;
        let written = match Self::write_stream(file, content, &key).await {
            Ok(etag) => match fs::rename(&partial, &abs_path).await {
                Ok(()) => Ok(etag),
                Err(e) => Err(exn::Exn::from(Self::map_io_error(e, &key))),
            },
            Err(e) => Err(e),
        };
        let etag = match written {
            Ok(etag) => etag,
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&partial).await {
                    tracing::warn!(error = %cleanup, "Could not remove partially uploaded file");
                }
                return Err(e);
            },
        };
        let metadata = fs::metadata(&abs_path).await.map_err(|e| Self::map_io_error(e, &key))?;
        tracing::debug!(size = metadata.len(), "File uploaded");
        Ok(self.metadata(key, metadata)?.with_etag(etag))
    }

    fn download(&self, path: &str) -> ByteStream {
        Box::pin(Self::read_file(self.absolute_path(path), path.to_string()))
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Result::Err(e) })),
        };
        let mut stack = vec![self.root.clone()];

        Box::pin(stream! {
            'dirs: while let Some(current) = stack.pop() {
                let mut entries = match fs::read_dir(&current).await {
                    Ok(entries) => entries,
                    // Asking for the contents of a directory that doesn't
                    // exist results in an empty list not an error.
                    Err(err) if err.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(err) => {
                        yield Err(exn::Exn::from(Self::map_io_error(err, &current.display().to_string())));
                        continue 'dirs;
                    }
                };

                'entries: loop {
                    let entry = match entries.next_entry().await {
                        Ok(Some(entry)) => entry,
                        Ok(None) => break 'entries,
                        Err(e) => {
                            yield Err(exn::Exn::from(Self::map_io_error(e, &current.display().to_string())));
                            continue 'entries;
                        },
                    };
                    match self.process_entry(entry, validated_prefix.as_deref()).await {
                        Ok(WalkEntry::File(f)) => yield Ok(f),
                        Ok(WalkEntry::Descend(d)) => stack.push(d),
                        Ok(WalkEntry::Skip) => {},
                        Err(e) => yield Err(e),
                    };
                }
            }
        })
    }

    #[tracing::instrument(skip(self), fields(backend = %self.name))]
    async fn remove(&self, path: &str) -> Result<bool> {
        let abs_path = self.absolute_path(path)?;
        match fs::remove_file(&abs_path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => exn::bail!(Self::map_io_error(e, path)),
        }
    }

    async fn stat(&self, path: &str) -> Result<FileInfo> {
        let key = validate_path(path)?;
        let metadata = fs::metadata(self.root.join(&key)).await.map_err(|e| Self::map_io_error(e, path))?;
        if !metadata.is_file() {
            exn::bail!(ErrorKind::NotFound(key));
        }
        self.metadata(key, metadata)
    }
}
