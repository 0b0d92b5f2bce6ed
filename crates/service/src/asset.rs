//! The asset service: validation, normalization, cleaning, persistence,
//! listing and archiving of SVG assets.

use crate::error::{ErrorKind, Result};
use crate::svg::{self, Viewport};
use crate::{CleanerHandle, FetcherHandle};
use exn::ResultExt;
use futures::future::try_join_all;
use iconvault_archive::{Archive, ArchiveBuilder};
use iconvault_config::{Config, DimensionMode};
use iconvault_storage::backend::{DEFAULT_SKIP, DEFAULT_TAKE};
use iconvault_storage::{BackendHandle, ByteStream, FileInfo, UploadOptions};
use std::sync::Arc;
use tracing::instrument;

/// Orchestrates the cleaner, storage and fetcher capabilities.
///
/// Holds no content between calls: every operation goes back to storage or
/// the fetcher.
pub struct AssetService {
    cleaner: CleanerHandle,
    storage: BackendHandle,
    fetcher: FetcherHandle,
    dimensions: DimensionMode,
    page_size: usize,
}
impl AssetService {
    pub fn new(cleaner: CleanerHandle, storage: BackendHandle, fetcher: FetcherHandle) -> Self {
        Self {
            cleaner,
            storage,
            fetcher,
            dimensions: DimensionMode::default(),
            page_size: DEFAULT_TAKE,
        }
    }

    /// Build every capability from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        let storage = crate::registry::storage_from_config(&config.storage)?;
        let fetcher = crate::registry::fetcher_from_config(&config.fetch)?;
        let cleaner: CleanerHandle = Arc::new(crate::cleaner::UsvgCleaner);
        Self::new(cleaner, storage, fetcher)
            .with_dimension_mode(config.geometry.dimensions)
            .with_page_size(config.listing.page_size)
    }

    pub fn with_dimension_mode(mut self, dimensions: DimensionMode) -> Self {
        self.dimensions = dimensions;
        self
    }

    pub fn with_page_size(mut self, page_size: usize) -> Result<Self> {
        if page_size == 0 {
            exn::bail!(ErrorKind::InvalidArgument("page size must be at least 1".to_string()));
        }
        self.page_size = page_size;
        Ok(self)
    }

    pub fn storage(&self) -> &BackendHandle {
        &self.storage
    }

    pub fn dimension_mode(&self) -> DimensionMode {
        self.dimensions
    }

    /// Accept markup only if it declares exactly one square `viewBox="0 0 N N"`.
    ///
    /// Anything else is a content defect: [`ErrorKind::UnprocessableEntity`],
    /// whose [`status()`](ErrorKind::status) is 422.
    #[instrument(skip(self, markup), fields(markup_size = markup.len()))]
    pub fn assert<'a>(&self, markup: &'a str) -> Result<&'a str> {
        if !svg::is_viewbox_correct(markup) {
            exn::bail!(ErrorKind::UnprocessableEntity(
                r#"expected a single square viewBox="0 0 N N""#.to_string()
            ));
        }
        Ok(markup)
    }

    /// Add a `viewBox` derived from `width` and `height` when there is none.
    ///
    /// Markup that already has a viewBox, or lacks either dimension, is
    /// returned unchanged, which makes this idempotent. The coordinates come
    /// from [`svg::measure`] under the configured [`DimensionMode`].
    #[instrument(skip(self, markup), fields(markup_size = markup.len()))]
    pub fn sanitize(&self, markup: &str) -> String {
        if svg::is_viewbox_present(markup) {
            return markup.to_string();
        }
        let Viewport {
            width: Some(width),
            height: Some(height),
        } = svg::viewport(markup)
        else {
            return markup.to_string();
        };
        match (svg::measure(width, self.dimensions), svg::measure(height, self.dimensions)) {
            (Some(w), Some(h)) => {
                tracing::debug!(width, height, w, h, "Injecting viewBox");
                svg::inject_viewbox(markup, &format!("0 0 {w} {h}"))
            },
            _ => {
                let mode = self.dimensions;
                tracing::warn!(width, height, ?mode, "Viewport cannot be measured, leaving markup as is");
                markup.to_string()
            },
        }
    }

    /// Delegate to the cleaner; its result or failure is returned as is.
    #[instrument(skip(self, markup), fields(markup_size = markup.len()))]
    pub async fn clean(&self, markup: &str) -> Result<String> {
        self.cleaner.clean(markup).await
    }

    /// Persist `content` under `filename`. Does not clean.
    #[instrument(skip(self, content))]
    pub async fn store(&self, content: ByteStream, filename: &str) -> Result<FileInfo> {
        let info = self
            .storage
            .upload(content, UploadOptions::new(filename))
            .await
            .or_raise(|| ErrorKind::Storage)?;
        tracing::info!(name = %info.name, size = info.size, "Asset stored");
        Ok(info)
    }

    /// One page of stored files, each with its markup attached as `raw`.
    ///
    /// Markup is fetched from each file's public URL. Fetches run
    /// concurrently, results keep the storage order.
    #[instrument(skip(self))]
    pub async fn list(&self, prefix: Option<&str>, skip: usize, take: usize) -> Result<Vec<FileInfo>> {
        let entries = self.storage.list(prefix, skip, take).await.or_raise(|| ErrorKind::Storage)?;
        tracing::debug!(entries = entries.len(), "Fetching listed assets");
        try_join_all(entries.into_iter().map(|entry| self.with_raw(entry))).await
    }

    /// [`list()`](Self::list) with the configured page size, from the start
    /// unless `skip` is given.
    pub async fn list_page(&self, prefix: Option<&str>, skip: Option<usize>) -> Result<Vec<FileInfo>> {
        self.list(prefix, skip.unwrap_or(DEFAULT_SKIP), self.page_size).await
    }

    async fn with_raw(&self, entry: FileInfo) -> Result<FileInfo> {
        let Some(url) = entry.url() else {
            exn::bail!(ErrorKind::Unaddressable(entry.name));
        };
        let raw = self.get(&url).await?;
        Ok(entry.with_raw(raw))
    }

    /// Fetch markup from an absolute URL.
    pub async fn get(&self, url: &str) -> Result<String> {
        self.fetcher.fetch(url).await
    }

    /// Delete `filename`. `false` if it did not exist.
    #[instrument(skip(self))]
    pub async fn remove(&self, filename: &str) -> Result<bool> {
        let removed = self.storage.remove(filename).await.or_raise(|| ErrorKind::Storage)?;
        tracing::info!(removed, "Asset removal");
        Ok(removed)
    }

    /// Bundle `filenames` into a streamed ZIP archive.
    ///
    /// Every file's download is requested up front, in order, and the
    /// archive is sealed before returning. No content is read until the
    /// archive is polled; read it to the end to get a complete file.
    #[instrument(skip_all)]
    pub fn zip<I>(&self, filenames: I) -> Archive
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        let mut builder = ArchiveBuilder::new();
        for filename in filenames {
            let filename = filename.as_ref();
            builder.append(filename, self.storage.download(filename));
        }
        builder.finalize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{DelayedFetcher, MockCleaner, MockFetcher, StorageFetcher};
    use std::time::Duration;
    use iconvault_storage::backend::MockBackend;
    use iconvault_storage::{StorageBackend, once};
    use rstest::rstest;

    const URL: &str = "https://url";
    const CONTAINER: &str = "my-test";

    fn mock_storage() -> MockBackend {
        MockBackend::default().with_service_url(URL).with_container(CONTAINER).fail_on(["error.txt"])
    }

    fn service_with(storage: Arc<MockBackend>, fetcher: Arc<MockFetcher>) -> AssetService {
        AssetService::new(Arc::new(MockCleaner), storage, fetcher)
    }

    fn service_with_fetcher(storage: Arc<MockBackend>, fetcher: FetcherHandle) -> AssetService {
        AssetService::new(Arc::new(MockCleaner), storage, fetcher)
    }

    fn service() -> AssetService {
        service_with(Arc::new(mock_storage()), Arc::new(MockFetcher::default()))
    }

    #[rstest]
    #[case(r#"<svg viewBox="0 0 10 15"></svg>"#)]
    #[case(r#"<svg width="10" height="10"></svg>"#)]
    #[case(r#"<svg viewBox="0 0 10"></svg>"#)]
    #[case("")]
    fn test_assert_rejects(#[case] markup: &str) {
        let err = service().assert(markup).unwrap_err();
        assert!(matches!(&*err, ErrorKind::UnprocessableEntity(_)));
        assert_eq!(err.status(), Some(422));
    }

    #[rstest]
    #[case(r#"<svg viewBox="0 0 10 10"></svg>"#)]
    #[case(r#"<svg viewBox="0 0 24.5 24.5" width="48"></svg>"#)]
    fn test_assert_accepts(#[case] markup: &str) {
        assert_eq!(service().assert(markup).unwrap(), markup);
    }

    #[rstest]
    #[case(DimensionMode::Literal, r#"<svg viewBox="0 0 2 2" width="32" height="16"></svg>"#)]
    #[case(DimensionMode::Numeric, r#"<svg viewBox="0 0 32 16" width="32" height="16"></svg>"#)]
    fn test_sanitize_injects_viewbox(#[case] mode: DimensionMode, #[case] expected: &str) {
        let service = service().with_dimension_mode(mode);
        let sanitized = service.sanitize(r#"<svg width="32" height="16"></svg>"#);
        assert_eq!(sanitized, expected);
        // A viewBox now exists, so sanitizing again changes nothing.
        assert_eq!(service.sanitize(&sanitized), sanitized);
    }

    #[test]
    fn test_sanitize_measures_literal_length() {
        let sanitized = service().sanitize(r#"<svg width="32px" height="100"></svg>"#);
        assert_eq!(sanitized, r#"<svg viewBox="0 0 4 3" width="32px" height="100"></svg>"#);
    }

    #[rstest]
    #[case(r#"<svg viewBox="0 0 1 2" width="32" height="16"></svg>"#)]
    #[case(r#"<svg viewBox="junk" width="32" height="16"></svg>"#)]
    #[case(r#"<svg width="32"></svg>"#)]
    #[case(r#"<svg height="16"></svg>"#)]
    #[case("<svg></svg>")]
    #[case(r#"<svg width="" height="16"></svg>"#)]
    fn test_sanitize_passes_through(#[case] markup: &str) {
        assert_eq!(service().sanitize(markup), markup);
    }

    #[test]
    fn test_sanitize_numeric_passes_through_unmeasurable() {
        let service = service().with_dimension_mode(DimensionMode::Numeric);
        let markup = r#"<svg width="auto" height="16"></svg>"#;
        assert_eq!(service.sanitize(markup), markup);
    }

    #[tokio::test]
    async fn test_clean() {
        let service = service();
        assert_eq!(service.clean("").await.unwrap(), "");
        assert_eq!(service.clean("test").await.unwrap(), "clean");
        let err = service.clean("<svg").await.unwrap_err();
        assert_eq!(*err, ErrorKind::InvalidMarkup);
    }

    #[tokio::test]
    async fn test_store() {
        let service = service();
        let info = service.store(once("stream"), "test.txt").await.unwrap();
        assert_eq!(info.name, "test.txt");
        assert_eq!(info.size, 6);
        let err = service.store(once("stream"), "error.txt").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_store_does_not_clean() {
        let storage = Arc::new(mock_storage());
        let service = service_with(storage.clone(), Arc::new(MockFetcher::default()));
        service.store(once("test"), "a.svg").await.unwrap();
        let stored = iconvault_storage::concat(storage.download("a.svg")).await.unwrap();
        assert_eq!(stored, b"test");
    }

    #[tokio::test]
    async fn test_remove() {
        let service = service();
        service.store(once("stream"), "test.txt").await.unwrap();
        assert!(service.remove("test.txt").await.unwrap());
        assert!(!service.remove("test.txt").await.unwrap());
        let err = service.remove("error.txt").await.unwrap_err();
        assert_eq!(*err, ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_list_attaches_raw() {
        let storage = Arc::new(mock_storage());
        storage.upload(once("<svg/>"), UploadOptions::new("test.svg")).await.unwrap();
        let fetcher = Arc::new(MockFetcher::default().with_body("https://url/my-test/test.svg", "<svg>raw</svg>"));
        let service = service_with(storage, fetcher.clone());

        let listed = service.list(None, 0, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].name, "test.svg");
        assert_eq!(listed[0].raw.as_deref(), Some("<svg>raw</svg>"));
        assert_eq!(fetcher.requests(), ["https://url/my-test/test.svg"]);
    }

    #[tokio::test]
    async fn test_list_keeps_storage_order() {
        let names = ["c.svg", "a.svg", "d.svg", "b.svg"];
        let storage = Arc::new(MockBackend::with_files(names.map(|n| (n, "x"))).with_service_url(URL));
        let fetcher = names.iter().fold(MockFetcher::default(), |fetcher, name| {
            fetcher.with_body(format!("https://url/mock/{name}"), format!("raw {name}"))
        });
        let service = service_with(storage, Arc::new(fetcher));

        let listed = service.list(None, 0, 10).await.unwrap();
        let pairs: Vec<_> = listed.iter().map(|f| (f.name.as_str(), f.raw.as_deref().unwrap())).collect();
        assert_eq!(
            pairs,
            [("a.svg", "raw a.svg"), ("b.svg", "raw b.svg"), ("c.svg", "raw c.svg"), ("d.svg", "raw d.svg")]
        );
    }

    #[tokio::test]
    async fn test_list_reassembles_concurrent_fetches_by_position() {
        let files = [("a.svg", "a"), ("b.svg", "b"), ("c.svg", "c")];
        let storage = Arc::new(MockBackend::with_files(files).with_service_url(URL));
        let fetcher = Arc::new(
            DelayedFetcher::default()
                .with_delay("https://url/mock/a.svg", Duration::from_millis(60))
                .with_delay("https://url/mock/b.svg", Duration::from_millis(30)),
        );
        let service = service_with_fetcher(storage, fetcher.clone());

        let listed = service.list(None, 0, 10).await.unwrap();
        let names: Vec<_> = listed.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.svg", "b.svg", "c.svg"]);
        for entry in &listed {
            assert_eq!(entry.raw.as_deref(), Some(format!("raw https://url/mock/{}", entry.name).as_str()));
        }
        // Finished in reverse, so positions were not taken from completion order.
        assert_eq!(
            fetcher.completed(),
            ["https://url/mock/c.svg", "https://url/mock/b.svg", "https://url/mock/a.svg"]
        );
        assert!(fetcher.peak() > 1);
    }

    #[tokio::test]
    async fn test_list_page_uses_page_size() {
        let storage = MockBackend::with_files((0..15).map(|i| (format!("{i:02}.svg"), "x"))).with_service_url(URL);
        let fetcher = (0..15).fold(MockFetcher::default(), |fetcher, i| {
            fetcher.with_body(format!("https://url/mock/{i:02}.svg"), "<svg/>")
        });
        let service = service_with(Arc::new(storage), Arc::new(fetcher));
        let first = service.list_page(None, None).await.unwrap();
        assert_eq!(first.len(), 10);
        assert_eq!(first[0].name, "00.svg");
        let service = service.with_page_size(4).unwrap();
        let page = service.list_page(None, Some(12)).await.unwrap();
        let names: Vec<_> = page.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["12.svg", "13.svg", "14.svg"]);
    }

    #[tokio::test]
    async fn test_list_requires_public_url() {
        let storage = Arc::new(MockBackend::with_files([("test.svg", "<svg/>")]));
        let service = service_with(storage, Arc::new(MockFetcher::default()));
        let err = service.list(None, 0, 10).await.unwrap_err();
        assert_eq!(*err, ErrorKind::Unaddressable("test.svg".to_string()));
    }

    #[tokio::test]
    async fn test_list_fetch_failure() {
        let storage = Arc::new(MockBackend::with_files([("test.svg", "<svg/>")]).with_service_url(URL));
        let service = service_with(storage, Arc::new(MockFetcher::default()));
        let err = service.list(None, 0, 10).await.unwrap_err();
        assert!(matches!(&*err, ErrorKind::Fetch(_)));
    }

    #[tokio::test]
    async fn test_get() {
        let fetcher = Arc::new(MockFetcher::default().with_body("http://example.org/", "<svg/>"));
        let service = service_with(Arc::new(mock_storage()), fetcher);
        assert_eq!(service.get("http://example.org/").await.unwrap(), "<svg/>");
    }

    #[tokio::test]
    async fn test_store_then_list_round_trip() {
        let storage = Arc::new(mock_storage());
        let fetcher = StorageFetcher {
            storage: storage.clone(),
            base: format!("{URL}/{CONTAINER}"),
        };
        let service = AssetService::new(Arc::new(MockCleaner), storage, Arc::new(fetcher));
        let markup = r#"<svg viewBox="0 0 24 24"><path d="M0 0h24v24H0z"/></svg>"#;
        service.store(once(markup), "icons/square.svg").await.unwrap();

        let listed = service.list(Some("icons"), 0, 10).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].raw.as_deref(), Some(markup));
        assert_eq!(service.get("https://url/my-test/icons/square.svg").await.unwrap(), markup);
    }

    #[tokio::test]
    async fn test_zip_downloads_each_file_once() {
        let storage = Arc::new(MockBackend::with_files([("a.svg", "<svg/>")]));
        let service = service_with(storage.clone(), Arc::new(MockFetcher::default()));
        let archive = service.zip(["a.svg"]);
        assert_eq!(archive.entry_count(), 1);
        assert_eq!(storage.downloads(), ["a.svg"]);

        let bytes = archive.collect_vec().await.unwrap();
        assert!(bytes.starts_with(b"PK\x03\x04"));
        assert_eq!(storage.downloads(), ["a.svg"]);
    }

    #[tokio::test]
    async fn test_zip_preserves_names_and_order() {
        let storage = Arc::new(MockBackend::with_files([("b.svg", "b"), ("dir/a.svg", "a")]));
        let service = service_with(storage.clone(), Arc::new(MockFetcher::default()));
        let archive = service.zip(vec!["dir/a.svg".to_string(), "b.svg".to_string()]);
        assert_eq!(storage.downloads(), ["dir/a.svg", "b.svg"]);
        let bytes = archive.collect_vec().await.unwrap();
        let first = bytes.windows(9).position(|w| w == b"dir/a.svg").unwrap();
        let second = bytes.windows(5).position(|w| w == b"b.svg").unwrap();
        assert!(first < second);
    }

    #[tokio::test]
    async fn test_zip_missing_file_fails_stream() {
        let service = service();
        let err = service.zip(["missing.svg"]).collect_vec().await.unwrap_err();
        assert_eq!(*err, iconvault_archive::error::ErrorKind::Source("missing.svg".to_string()));
    }

    #[rstest]
    #[case::zero_timeout(|config: &mut Config| config.fetch.timeout_secs = 0)]
    #[case::zero_page_size(|config: &mut Config| config.listing.page_size = 0)]
    #[case::relative_root(|config: &mut Config| config.storage.root = Some("assets".into()))]
    fn test_from_config_validates(#[case] break_config: fn(&mut Config)) {
        let temp = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.storage.root = Some(temp.path().to_path_buf());
        assert!(AssetService::from_config(&config).is_ok());
        break_config(&mut config);
        let err = AssetService::from_config(&config).err().unwrap();
        assert_eq!(*err, ErrorKind::Config);
    }

    #[test]
    fn test_page_size_must_be_positive() {
        let err = service().with_page_size(0).err().unwrap();
        assert!(matches!(&*err, ErrorKind::InvalidArgument(_)));
    }
}
