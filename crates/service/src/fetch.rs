//! Outbound fetch capability.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use iconvault_config::FetchConfig;
use reqwest::Client;

/// Retrieves markup from an absolute URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String>;
}

/// [`Fetcher`] over HTTP(S).
///
/// Bounded by the configured transport timeout; any non-2xx status is an
/// error.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    http: Client,
}

impl HttpFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        tracing::debug!(timeout_secs = config.timeout_secs, "Creating HTTP fetcher");
        let http = Client::builder()
            .timeout(config.timeout())
            .user_agent(&config.user_agent)
            .build()
            .or_raise(|| ErrorKind::InvalidArgument("cannot build HTTP client".to_string()))?;
        Ok(Self { http })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, url: &str) -> Result<String> {
        let failed = || ErrorKind::Fetch(url.to_string());
        let response = self.http.get(url).send().await.or_raise(failed)?;
        let response = response.error_for_status().or_raise(failed)?;
        let body = response.text().await.or_raise(failed)?;
        tracing::debug!(size = body.len(), "Fetched");
        Ok(body)
    }
}
