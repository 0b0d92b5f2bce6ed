//! Storage models.
//!
//! Metadata returned by storage backends for uploads, listings and stats.

use time::OffsetDateTime;

/// File metadata returned by storage backends.
///
/// Carries enough addressing information (`service_url`, `container` and
/// `name`) to build an absolute URL for the stored file, see [`url()`](Self::url).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileInfo {
    /// Storage key, a `/`-separated path relative to the storage root
    pub name: String,
    /// File size in bytes
    pub size: u64,
    /// BLAKE3 hash of file content (hex), when the backend knows it
    pub etag: Option<String>,
    /// Last modified timestamp
    pub modified: OffsetDateTime,
    /// Namespace the backend stores files under
    pub container: String,
    /// Public base URL of the backend, if it has one
    pub service_url: Option<String>,
    /// Markup attached after listing; never populated by backends
    pub raw: Option<String>,
}
impl FileInfo {
    pub fn new(name: impl Into<String>, size: u64, modified: OffsetDateTime, container: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            size,
            etag: None,
            modified,
            container: container.into(),
            service_url: None,
            raw: None,
        }
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }

    pub fn with_service_url(mut self, service_url: Option<impl Into<String>>) -> Self {
        self.service_url = service_url.map(Into::into);
        self
    }

    pub fn with_raw(mut self, raw: impl Into<String>) -> Self {
        self.raw = Some(raw.into());
        self
    }

    /// Absolute URL of the file: `{service_url}/{container}/{name}`.
    ///
    /// Trailing slashes on the service URL are trimmed and an empty container
    /// is omitted. Returns `None` when the backend has no public URL.
    pub fn url(&self) -> Option<String> {
        let base = self.service_url.as_deref()?.trim_end_matches('/');
        Some(match self.container.is_empty() {
            true => format!("{base}/{}", self.name),
            false => format!("{base}/{}/{}", self.container, self.name),
        })
    }
}
