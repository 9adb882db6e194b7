//! Decoded tiles and merged rasters.

use std::path::Path;

use image::{DynamicImage, ImageFormat, RgbaImage};

use crate::coord::CoordinateSystem;
use crate::error::TileError;

use super::index::{Extent, TileIndex};

/// One fetched tile: its address and decoded pixels.
#[derive(Debug, Clone)]
pub struct TileImage {
    pub index: TileIndex,
    pub pixels: RgbaImage,
}

impl TileImage {
    pub fn new(index: TileIndex, pixels: RgbaImage) -> Self {
        Self { index, pixels }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        self.pixels.dimensions()
    }
}

/// The product of a query: a stitched RGBA raster and the rectangle it covers.
#[derive(Debug, Clone)]
pub struct RasterResult {
    pub image: RgbaImage,
    pub extent: Extent,
    pub zoom: u8,
}

impl RasterResult {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// Re-express the extent in `system`; pixels are untouched.
    pub fn with_extent_in(mut self, system: CoordinateSystem) -> Self {
        self.extent = self.extent.convert(system);
        self
    }

    /// Write the raster to `path`, picking the format from its extension.
    ///
    /// JPEG output drops the alpha channel.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), TileError> {
        let path = path.as_ref();
        let failure = |message: String| TileError::OutputWriteFailure {
            path: path.to_path_buf(),
            message,
        };

        let format = ImageFormat::from_path(path).map_err(|e| failure(e.to_string()))?;
        let result = match format {
            ImageFormat::Jpeg => DynamicImage::ImageRgba8(self.image.clone())
                .to_rgb8()
                .save_with_format(path, format),
            _ => self.image.save_with_format(path, format),
        };
        result.map_err(|e| failure(e.to_string()))
    }
}
