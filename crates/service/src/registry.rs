//! Explicit wiring of the services from configuration.

use crate::asset::AssetService;
use crate::error::{ErrorKind, Result};
use crate::fetch::HttpFetcher;
use crate::raster::RasterService;
use crate::rasterizer::ResvgRasterizer;
use crate::FetcherHandle;
use exn::ResultExt;
use iconvault_config::{Config, FetchConfig, StorageConfig};
use iconvault_storage::BackendHandle;
use iconvault_storage::backend::{LocalBackend, SvgOnlyBackend};
use std::sync::Arc;

/// The configured storage backend: local files, optionally restricted to SVG.
pub fn storage_from_config(config: &StorageConfig) -> Result<BackendHandle> {
    let root = config.root().or_raise(|| ErrorKind::Config)?;
    let mut local = LocalBackend::new(&config.name, &root).or_raise(|| ErrorKind::Storage)?;
    if let Some(public_url) = &config.public_url {
        local = local.with_public_url(public_url);
    }
    tracing::debug!(name = %config.name, root = %root.display(), svg_only = config.svg_only, "Storage configured");
    let local: BackendHandle = Arc::new(local);
    Ok(match config.svg_only {
        true => Arc::new(SvgOnlyBackend::new(local)),
        false => local,
    })
}

pub fn fetcher_from_config(config: &FetchConfig) -> Result<FetcherHandle> {
    Ok(Arc::new(HttpFetcher::new(config)?))
}

/// Every service, built once and shared.
pub struct Services {
    assets: Arc<AssetService>,
    raster: RasterService,
}
impl Services {
    pub fn from_config(config: &Config) -> Result<Self> {
        let assets = Arc::new(AssetService::from_config(config)?);
        let raster = RasterService::new(Arc::clone(&assets), Arc::new(ResvgRasterizer));
        tracing::info!(storage = assets.storage().name(), "Services ready");
        Ok(Self { assets, raster })
    }

    pub fn assets(&self) -> &Arc<AssetService> {
        &self.assets
    }

    pub fn raster(&self) -> &RasterService {
        &self.raster
    }
}
