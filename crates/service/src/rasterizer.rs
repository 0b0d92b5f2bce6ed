//! Rasterization capability.

use crate::error::{ErrorKind, Result};
use async_trait::async_trait;
use exn::ResultExt;
use resvg::{tiny_skia, usvg};

/// Target raster size in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}
impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Renders SVG markup to raster bytes.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn render(&self, svg: &[u8], size: Dimensions) -> Result<Vec<u8>>;
}

/// Renders to PNG with `resvg`.
///
/// The image is scaled uniformly to fit `size` and centered; any leftover
/// area stays transparent.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResvgRasterizer;

impl ResvgRasterizer {
    fn render_blocking(svg: &[u8], size: Dimensions) -> Result<Vec<u8>> {
        let tree = usvg::Tree::from_data(svg, &usvg::Options::default()).or_raise(|| ErrorKind::Rasterize)?;
        let Some(mut pixmap) = tiny_skia::Pixmap::new(size.width, size.height) else {
            exn::bail!(ErrorKind::Rasterize);
        };
        let source = tree.size();
        let (width, height) = (size.width as f32, size.height as f32);
        let scale = (width / source.width()).min(height / source.height());
        let transform = tiny_skia::Transform::from_row(
            scale,
            0.0,
            0.0,
            scale,
            (width - source.width() * scale) / 2.0,
            (height - source.height() * scale) / 2.0,
        );
        resvg::render(&tree, transform, &mut pixmap.as_mut());
        pixmap.encode_png().or_raise(|| ErrorKind::Rasterize)
    }
}

#[async_trait]
impl Rasterizer for ResvgRasterizer {
    #[tracing::instrument(skip(self, svg), fields(svg_size = svg.len(), width = size.width, height = size.height))]
    async fn render(&self, svg: &[u8], size: Dimensions) -> Result<Vec<u8>> {
        let svg = svg.to_vec();
        tokio::task::spawn_blocking(move || Self::render_blocking(&svg, size))
            .await
            .or_raise(|| ErrorKind::Task)?
    }
}
