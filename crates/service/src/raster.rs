//! On-demand rasterization of stored vector assets.

use crate::asset::AssetService;
use crate::error::{ErrorKind, Result};
use crate::rasterizer::{Dimensions, ResvgRasterizer};
use crate::svg;
use crate::RasterizerHandle;
use exn::ResultExt;
use iconvault_config::{Config, DimensionMode};
use std::sync::Arc;
use tracing::instrument;

pub struct RasterService {
    assets: Arc<AssetService>,
    rasterizer: RasterizerHandle,
}
impl RasterService {
    pub fn new(assets: Arc<AssetService>, rasterizer: RasterizerHandle) -> Self {
        Self { assets, rasterizer }
    }

    /// A fresh asset service from `config` and the `resvg` rasterizer.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate().or_raise(|| ErrorKind::Config)?;
        let assets = Arc::new(AssetService::from_config(config)?);
        Ok(Self::new(assets, Arc::new(ResvgRasterizer)))
    }

    pub fn assets(&self) -> &Arc<AssetService> {
        &self.assets
    }

    /// Render the stored asset at `path`.
    ///
    /// Without `explicit` dimensions, the size is read from the asset's own
    /// `viewBox` width and height tokens and measured under the asset
    /// service's [`DimensionMode`]. The whole asset is buffered before
    /// rendering.
    #[instrument(skip(self))]
    pub async fn generate_from_svg(&self, path: &str, explicit: Option<Dimensions>) -> Result<Vec<u8>> {
        let svg = iconvault_storage::concat(self.assets.storage().download(path))
            .await
            .or_raise(|| ErrorKind::Storage)?;
        let size = match explicit {
            Some(size) => size,
            None => resolve_dimensions(&svg, self.assets.dimension_mode())?,
        };
        tracing::debug!(bytes = svg.len(), width = size.width, height = size.height, "Rasterizing");
        self.rasterizer.render(&svg, size).await
    }
}

fn resolve_dimensions(svg: &[u8], mode: DimensionMode) -> Result<Dimensions> {
    let markup = String::from_utf8_lossy(svg);
    let viewbox = svg::viewbox_dimensions(&markup);
    let width = viewbox.width.and_then(|w| svg::measure(w, mode));
    let height = viewbox.height.and_then(|h| svg::measure(h, mode));
    match (width, height) {
        (Some(width), Some(height)) => Ok(Dimensions::new(width, height)),
        _ => exn::bail!(ErrorKind::Dimensions),
    }
}
