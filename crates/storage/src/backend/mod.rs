//! Storage backend trait and implementations.
//!
//! This module defines the `StorageBackend` trait, which provides a unified
//! interface for storing vector assets across different backends (local
//! filesystem, in-memory for tests, decorators restricting what is stored).
//!

mod local;
#[cfg(feature = "mock")]
mod mock;
mod svg;

pub use self::local::LocalBackend;
#[cfg(feature = "mock")]
pub use self::mock::MockBackend;
pub use self::svg::SvgOnlyBackend;
use crate::error::Result;
use crate::models::FileInfo;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, TryStreamExt};
use std::pin::Pin;

/// Entries skipped by [`StorageBackend::list`] when the caller has no opinion.
pub const DEFAULT_SKIP: usize = 0;
/// Entries returned by [`StorageBackend::list`] when the caller has no opinion.
pub const DEFAULT_TAKE: usize = 10;

pub type FileInfoStream<'a> = Pin<Box<dyn Stream<Item = Result<FileInfo>> + Send + 'a>>;
/// Readable byte stream used for uploads and downloads.
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes>> + Send + 'static>>;

/// Options for [`StorageBackend::upload`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOptions {
    /// Storage key to upload to.
    pub name: String,
}
impl UploadOptions {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

/// Unified interface for storage backends.
///
/// # Path Handling
/// All keys are relative to the storage root and must be validated using
/// [`validate_path`](crate::validate_path) before use. Implementations should
/// enforce this validation.
///
/// # Examples
///
/// ```
/// use iconvault_storage::{StorageBackend, UploadOptions, concat, once, error::Result};
///
/// async fn copy(backend: &dyn StorageBackend, from: &str, to: &str) -> Result<u64> {
///     let data = concat(backend.download(from)).await?;
///     let info = backend.upload(once(data), UploadOptions::new(to)).await?;
///     Ok(info.size)
/// }
/// ```
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Name of the configured backend. Used for logging, and by the local
    /// backend as the container files are addressed under.
    fn name(&self) -> &str;

    /// Store the contents of `content` under `options.name`, overwriting any
    /// existing file.
    ///
    /// # Notes
    /// - Implementations should create parent directories as needed.
    /// - A failing `content` stream fails the upload; nothing is left behind.
    async fn upload(&self, content: ByteStream, options: UploadOptions) -> Result<FileInfo>;

    /// Open a file for streaming reads.
    ///
    /// This is deliberately synchronous: the returned stream does no I/O
    /// until polled, and errors (including
    /// [`NotFound`](crate::error::ErrorKind::NotFound)) surface as its first
    /// item.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use futures::TryStreamExt;
    /// # use iconvault_storage::{StorageBackend, error::Result};
    /// # async fn example(backend: &dyn StorageBackend) -> Result<()> {
    /// let mut stream = backend.download("icons/arrow.svg");
    /// while let Some(chunk) = stream.try_next().await? {
    ///     println!("{} bytes", chunk.len());
    /// }
    /// # Ok(())
    /// # }
    /// ```
    fn download(&self, path: &str) -> ByteStream;

    /// Stream file metadata matching an optional prefix.
    ///
    /// If a prefix is provided, only files whose keys start with the prefix
    /// (component-wise) are returned. Order is unspecified.
    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> FileInfoStream<'a>;

    /// List one page of files matching an optional prefix.
    ///
    /// Default implementation of this method is to collect all the results
    /// from [`list_stream()`](Self::list_stream), sort them by name, then
    /// apply `skip` and `take`.
    async fn list(&self, prefix: Option<&str>, skip: usize, take: usize) -> Result<Vec<FileInfo>> {
        let mut files: Vec<FileInfo> = self.list_stream(prefix).try_collect().await?;
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files.into_iter().skip(skip).take(take).collect())
    }

    /// Delete a file.
    ///
    /// Returns `false` if the file did not exist.
    async fn remove(&self, path: &str) -> Result<bool>;

    /// Get file metadata without reading contents.
    ///
    /// Returns [`NotFound`](crate::error::ErrorKind::NotFound) if the file
    /// does not exist.
    async fn stat(&self, path: &str) -> Result<FileInfo>;
}
