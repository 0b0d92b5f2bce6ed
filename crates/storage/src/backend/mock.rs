//! In-memory storage backend for testing.

use super::{ByteStream, FileInfoStream, UploadOptions};
use crate::error::{ErrorKind, Result};
use crate::models::FileInfo;
use crate::path::{has_prefix, validate as validate_path};
use crate::stream::concat;
use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::StorageBackend;

type Files = Arc<RwLock<BTreeMap<String, (OffsetDateTime, Bytes)>>>;

/// In-memory storage backend for testing.
///
/// Files are stored in a `BTreeMap` behind a [`RwLock`], so all trait methods
/// can operate on `&self` without external synchronisation. Ideal for unit
/// tests that need a [`StorageBackend`] without filesystem or network
/// dependencies.
///
/// Keys registered with [`fail_on()`](Self::fail_on) simulate a backend
/// failure on upload, download and remove, and every call to
/// [`download()`](StorageBackend::download) is recorded.
///
/// # Examples
///
/// ```
/// use iconvault_storage::backend::{MockBackend, StorageBackend};
/// use iconvault_storage::{UploadOptions, once};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let backend = MockBackend::with_files([
///     ("icons/arrow.svg", "<svg/>"),
/// ]).fail_on(["error.txt"]);
/// assert_eq!(backend.stat("icons/arrow.svg").await?.size, 6);
///
/// backend.upload(once("stream"), UploadOptions::new("test.txt")).await?;
/// assert!(backend.upload(once("stream"), UploadOptions::new("error.txt")).await.is_err());
/// # Ok(())
/// # }
/// ```
pub struct MockBackend {
    name: String,
    container: String,
    service_url: Option<String>,
    storage: Files,
    failing: BTreeSet<String>,
    downloads: Mutex<Vec<String>>,
}

impl MockBackend {
    /// Create a mock backend pre-populated with files.
    ///
    /// Panics if any path fails validation (e.g. path traversal). If test
    /// setup is wrong, then test should not pass.
    pub fn with_files(files: impl IntoIterator<Item = (impl AsRef<str>, impl Into<Bytes>)>) -> Self {
        let mut map = BTreeMap::new();
        let now = OffsetDateTime::now_utc();
        for (path, data) in files {
            let Ok(validated) = validate_path(path.as_ref()) else {
                // The panic here is DELIBERATE. MockBackend is intended to be
                // used in tests; panics are expected. There is no error result.
                panic!("MockBackend::with_files: invalid path {}", path.as_ref());
            };
            map.insert(validated, (now, data.into()));
        }
        Self {
            name: "mock".to_string(),
            container: "mock".to_string(),
            service_url: None,
            storage: Arc::new(RwLock::new(map)),
            failing: BTreeSet::new(),
            downloads: Mutex::new(Vec::new()),
        }
    }

    /// Container reported on every [`FileInfo`].
    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    /// Service URL reported on every [`FileInfo`].
    pub fn with_service_url(mut self, service_url: impl Into<String>) -> Self {
        self.service_url = Some(service_url.into());
        self
    }

    /// Keys for which upload, download and remove fail with a backend error.
    ///
    /// Panics on invalid paths, like [`with_files()`](Self::with_files).
    pub fn fail_on(mut self, names: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        for name in names {
            let Ok(validated) = validate_path(name.as_ref()) else {
                panic!("MockBackend::fail_on: invalid path {}", name.as_ref());
            };
            self.failing.insert(validated);
        }
        self
    }

    /// Keys passed to [`download()`](StorageBackend::download), in call order.
    pub fn downloads(&self) -> Vec<String> {
        self.downloads.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn file_info(&self, key: &str, size: u64, inserted: OffsetDateTime) -> FileInfo {
        FileInfo::new(key, size, inserted, &self.container).with_service_url(self.service_url.clone())
    }

    fn check_failure(&self, key: &str) -> Result<()> {
        if self.failing.contains(key) {
            exn::bail!(ErrorKind::BackendError("mock error".to_string()));
        }
        Ok(())
    }
}
impl Default for MockBackend {
    fn default() -> Self {
        let files: [(&str, &str); 0] = [];
        Self::with_files(files)
    }
}

#[async_trait]
impl StorageBackend for MockBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn upload(&self, content: ByteStream, options: UploadOptions) -> Result<FileInfo> {
        let key = validate_path(&options.name)?;
        self.check_failure(&key)?;
        let data = Bytes::from(concat(content).await?);
        let etag = blake3::hash(&data).to_hex().to_string();
        let now = OffsetDateTime::now_utc();
        let size = data.len() as u64;
        self.storage.write().await.insert(key.clone(), (now, data));
        Ok(self.file_info(&key, size, now).with_etag(etag))
    }

    fn download(&self, path: &str) -> ByteStream {
        self.downloads.lock().unwrap_or_else(PoisonError::into_inner).push(path.to_string());
        let lookup = validate_path(path).and_then(|key| self.check_failure(&key).map(|()| key));
        let storage = Arc::clone(&self.storage);
        Box::pin(stream! {
            let key = match lookup {
                Ok(key) => key,
                Err(e) => {
                    yield Err(e);
                    return;
                },
            };
            let data = storage.read().await.get(&key).map(|(_, data)| data.clone());
            match data {
                Some(data) => yield Ok(data),
                None => yield Err(exn::Exn::from(ErrorKind::NotFound(key))),
            }
        })
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> FileInfoStream<'a> {
        let validated_prefix = match prefix.map(validate_path).transpose() {
            Ok(pfx) => pfx,
            Err(e) => return Box::pin(futures::stream::once(async { Err(e) })),
        };

        Box::pin(stream! {
            // Snapshot matching entries under the read lock, then drop it
            // before yielding to avoid holding the lock across yield points.
            let entries: Vec<(String, (OffsetDateTime, u64))> = {
                let guard = self.storage.read().await;
                guard
                    .iter()
                    .filter(|(key, _)| has_prefix(key, validated_prefix.as_deref()))
                    .map(|(key, (inserted, data))| (key.clone(), (*inserted, data.len() as u64)))
                    .collect()
            };
            for (key, (inserted, size)) in entries {
                yield Ok(self.file_info(&key, size, inserted));
            }
        })
    }

    async fn remove(&self, path: &str) -> Result<bool> {
        let key = validate_path(path)?;
        self.check_failure(&key)?;
        Ok(self.storage.write().await.remove(&key).is_some())
    }

    async fn stat(&self, path: &str) -> Result<FileInfo> {
        let key = validate_path(path)?;
        let guard = self.storage.read().await;
        let Some((inserted, data)) = guard.get(&key) else {
            exn::bail!(ErrorKind::NotFound(key));
        };
        Ok(self.file_info(&key, data.len() as u64, *inserted))
    }
}
