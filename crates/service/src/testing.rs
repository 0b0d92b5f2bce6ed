//! Test doubles for the cleaner, fetcher and rasterizer capabilities.

use crate::cleaner::Cleaner;
use crate::error::{ErrorKind, Result};
use crate::fetch::Fetcher;
use crate::rasterizer::{Dimensions, Rasterizer};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Turns `"test"` into `"clean"`, empty into empty, and rejects anything else.
#[derive(Debug, Default)]
pub(crate) struct MockCleaner;

#[async_trait]
impl Cleaner for MockCleaner {
    async fn clean(&self, markup: &str) -> Result<String> {
        match markup {
            "" => Ok(String::new()),
            "test" => Ok("clean".to_string()),
            _ => exn::bail!(ErrorKind::InvalidMarkup),
        }
    }
}

/// Serves canned bodies by URL and records every request.
#[derive(Debug, Default)]
pub(crate) struct MockFetcher {
    bodies: HashMap<String, String>,
    requests: Mutex<Vec<String>>,
}
impl MockFetcher {
    pub(crate) fn with_body(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.bodies.insert(url.into(), body.into());
        self
    }

    pub(crate) fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        self.requests.lock().unwrap_or_else(PoisonError::into_inner).push(url.to_string());
        match self.bodies.get(url) {
            Some(body) => Ok(body.clone()),
            None => exn::bail!(ErrorKind::Fetch(url.to_string())),
        }
    }
}

/// Echoes the markup back and records the requested sizes.
#[derive(Debug, Default)]
pub(crate) struct MockRasterizer {
    sizes: Mutex<Vec<Dimensions>>,
}
impl MockRasterizer {
    pub(crate) fn sizes(&self) -> Vec<Dimensions> {
        self.sizes.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Rasterizer for MockRasterizer {
    async fn render(&self, svg: &[u8], size: Dimensions) -> Result<Vec<u8>> {
        self.sizes.lock().unwrap_or_else(PoisonError::into_inner).push(size);
        Ok(svg.to_vec())
    }
}

/// Fetches `{base}/{name}` by downloading `name` from a storage backend,
/// closing the loop between `store` and `list`.
pub(crate) struct StorageFetcher {
    pub(crate) storage: iconvault_storage::BackendHandle,
    pub(crate) base: String,
}

#[async_trait]
impl Fetcher for StorageFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        use exn::ResultExt;
        let Some(name) = url.strip_prefix(&self.base) else {
            exn::bail!(ErrorKind::Fetch(url.to_string()));
        };
        let bytes = iconvault_storage::concat(self.storage.download(name.trim_start_matches('/')))
            .await
            .or_raise(|| ErrorKind::Fetch(url.to_string()))?;
        String::from_utf8(bytes).or_raise(|| ErrorKind::Fetch(url.to_string()))
    }
}

/// Answers `raw {url}` after a per-URL delay, tracking how many fetches
/// overlap and the order in which they finish.
#[derive(Debug, Default)]
pub(crate) struct DelayedFetcher {
    delays: HashMap<String, Duration>,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    completed: Mutex<Vec<String>>,
}
impl DelayedFetcher {
    pub(crate) fn with_delay(mut self, url: impl Into<String>, delay: Duration) -> Self {
        self.delays.insert(url.into(), delay);
        self
    }

    /// Highest number of fetches in flight at once.
    pub(crate) fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    pub(crate) fn completed(&self) -> Vec<String> {
        self.completed.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }
}

#[async_trait]
impl Fetcher for DelayedFetcher {
    async fn fetch(&self, url: &str) -> Result<String> {
        let running = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(running, Ordering::SeqCst);
        tokio::time::sleep(self.delays.get(url).copied().unwrap_or_default()).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.completed.lock().unwrap_or_else(PoisonError::into_inner).push(url.to_string());
        Ok(format!("raw {url}"))
    }
}
