//! SVG-filtered storage backend decorator.
//!
//! Wraps another backend and restricts all operations to keys with an
//! `.svg` extension.

use crate::backend::{ByteStream, FileInfoStream, UploadOptions};
use crate::error::ErrorKind;
use crate::{BackendHandle, FileInfo, StorageBackend, error::Result};
use async_trait::async_trait;
use futures::StreamExt;
use std::path::Path;

const SVG_EXTENSION: &str = "svg";

/// Check if a key has `.svg` as its extension (case-insensitive).
fn is_svg_path(key: &str) -> bool {
    Path::new(key)
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(SVG_EXTENSION))
}

fn ensure_svg(key: &str) -> Result<()> {
    if !is_svg_path(key) {
        exn::bail!(ErrorKind::FilteredPath(key.to_string()));
    }
    Ok(())
}

/// SVG-filtered storage backend.
///
/// Wraps another backend and restricts all operations to `.svg` keys.
/// Other keys return `ErrorKind::FilteredPath`, and listings silently skip
/// them.
#[derive(Clone)]
pub struct SvgOnlyBackend {
    inner: BackendHandle,
}
impl SvgOnlyBackend {
    pub fn new(inner: BackendHandle) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl StorageBackend for SvgOnlyBackend {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn upload(&self, content: ByteStream, options: UploadOptions) -> Result<FileInfo> {
        ensure_svg(&options.name)?;
        self.inner.upload(content, options).await
    }

    fn download(&self, path: &str) -> ByteStream {
        match ensure_svg(path) {
            Ok(()) => self.inner.download(path),
            Err(e) => Box::pin(futures::stream::once(async { Err(e) })),
        }
    }

    fn list_stream<'a>(&'a self, prefix: Option<&'a str>) -> FileInfoStream<'a> {
        Box::pin(self.inner.list_stream(prefix).filter(|item| {
            std::future::ready(match item {
                Ok(info) => is_svg_path(&info.name),
                Err(_) => true, // propagate errors
            })
        }))
    }

    async fn remove(&self, path: &str) -> Result<bool> {
        ensure_svg(path)?;
        self.inner.remove(path).await
    }

    async fn stat(&self, path: &str) -> Result<FileInfo> {
        ensure_svg(path)?;
        self.inner.stat(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::LocalBackend;
    use crate::{concat, once};
    use std::sync::Arc;

    #[test]
    fn test_is_svg_path() {
        assert!(is_svg_path("file.svg"));
        assert!(is_svg_path("a/b/c/file.SVG"));
        assert!(!is_svg_path("file.svgz"));
        assert!(!is_svg_path("file.txt"));
        assert!(!is_svg_path("svg"));
        assert!(!is_svg_path(".svg"));
    }

    /// Helper: create a temp SvgOnlyBackend wrapping a LocalBackend.
    fn setup() -> (tempfile::TempDir, SvgOnlyBackend) {
        let temp_dir = tempfile::tempdir().unwrap();
        let local = LocalBackend::new("test", temp_dir.path()).unwrap();
        let backend: BackendHandle = Arc::new(local);
        (temp_dir, SvgOnlyBackend::new(backend))
    }

    #[tokio::test]
    async fn test_list_filters_by_extension() {
        let (dir, backend) = setup();
        backend.upload(once("<svg/>"), UploadOptions::new("icon.svg")).await.unwrap();
        // Write other files directly to filesystem (SvgOnlyBackend gates uploads)
        std::fs::write(dir.path().join("file.txt"), b"data").unwrap();
        std::fs::write(dir.path().join("README.md"), b"data").unwrap();

        let files = backend.list(None, 0, 10).await.unwrap();
        assert_eq!(files.len(), 1);
        assert_eq!(files[0].name, "icon.svg");
    }

    #[tokio::test]
    async fn test_upload_rejects_non_svg() {
        let (dir, backend) = setup();
        let err = backend.upload(once("data"), UploadOptions::new("file.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::FilteredPath(_)));
        assert!(!dir.path().join("file.txt").exists());
    }

    #[tokio::test]
    async fn test_download_rejects_non_svg() {
        let (dir, backend) = setup();
        std::fs::write(dir.path().join("file.txt"), b"data").unwrap();
        let err = concat(backend.download("file.txt")).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::FilteredPath(_)));
    }

    #[tokio::test]
    async fn test_remove_and_stat_reject_non_svg() {
        let (_dir, backend) = setup();
        assert!(matches!(&*backend.remove("file.txt").await.unwrap_err(), ErrorKind::FilteredPath(_)));
        assert!(matches!(&*backend.stat("file.txt").await.unwrap_err(), ErrorKind::FilteredPath(_)));
    }

    #[tokio::test]
    async fn test_svg_passes_through() {
        let (_dir, backend) = setup();
        backend.upload(once("<svg/>"), UploadOptions::new("a/icon.svg")).await.unwrap();
        assert_eq!(backend.stat("a/icon.svg").await.unwrap().size, 6);
        assert_eq!(concat(backend.download("a/icon.svg")).await.unwrap(), b"<svg/>");
        assert!(backend.remove("a/icon.svg").await.unwrap());
    }
}
