//! SVG asset services.
//!
//! [`AssetService`] validates, normalizes, cleans, stores, lists and archives
//! SVG assets on top of three injected capabilities: a storage backend, a
//! [`Cleaner`] and a [`Fetcher`]. [`RasterService`] renders stored assets to
//! PNG through a [`Rasterizer`], and [`UploadEngine`] places uploaded files
//! under a destination directory. [`Services`] wires all of them from an
//! [`iconvault_config::Config`].
//!
//! ```no_run
//! use iconvault_config::Config;
//! use iconvault_service::Services;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let services = Services::from_config(&Config::load(None)?)?;
//! let markup = services.assets().sanitize(r#"<svg width="24" height="24"></svg>"#);
//! services.assets().assert(&markup)?;
//! # Ok(())
//! # }
//! ```

pub mod asset;
pub mod cleaner;
pub mod error;
pub mod fetch;
pub mod raster;
pub mod rasterizer;
pub mod registry;
pub mod svg;
#[cfg(test)]
mod testing;
pub mod upload;

pub use crate::asset::AssetService;
pub use crate::cleaner::{Cleaner, UsvgCleaner};
pub use crate::fetch::{Fetcher, HttpFetcher};
pub use crate::raster::RasterService;
pub use crate::rasterizer::{Dimensions, Rasterizer, ResvgRasterizer};
pub use crate::registry::Services;
pub use crate::upload::{StoredFile, UploadEngine};
use std::sync::Arc;

pub type CleanerHandle = Arc<dyn Cleaner>;
pub type FetcherHandle = Arc<dyn Fetcher>;
pub type RasterizerHandle = Arc<dyn Rasterizer>;
