//! Raster tile decoding.

use image::RgbaImage;

use super::decoder::{TileDecoder, TileKind};
use super::error::DecodeError;

/// Decodes PNG/JPEG payloads into RGBA pixels.
#[derive(Debug, Clone, Copy, Default)]
pub struct RasterDecoder;

/// A decoded raster tile.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterTile {
    image: RgbaImage,
}

impl RasterTile {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    /// `(width, height)` in pixels.
    pub fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }
}

impl TileDecoder for RasterDecoder {
    type Content = RasterTile;

    fn kind(&self) -> TileKind {
        TileKind::Raster
    }

    fn decode(&self, data: &[u8]) -> Result<RasterTile, DecodeError> {
        if data.is_empty() {
            return Err(DecodeError::new("empty raster payload"));
        }
        let image = image::load_from_memory(data)
            .map_err(|e| DecodeError::new(format!("invalid raster data: {}", e)))?;
        Ok(RasterTile {
            image: image.to_rgba8(),
        })
    }
}
