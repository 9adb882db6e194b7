//! Tile image decoding.
//!
//! Providers serve PNG or JPEG; the format is sniffed from the payload, not
//! trusted from the URL or cache-file extension. Every tile is normalized to
//! RGBA8 so tiles from one provider can always share a canvas.

use std::io::Cursor;

use image::{ImageReader, RgbaImage};

use crate::error::TileError;

use super::index::TileIndex;

// =============================================================================
// Tile Decoder
// =============================================================================

/// Decodes raw tile payloads into RGBA pixel arrays.
#[derive(Debug, Clone, Copy, Default)]
pub struct TileDecoder;

impl TileDecoder {
    pub fn new() -> Self {
        Self
    }

    /// Decode `source` into RGBA pixels.
    ///
    /// # Errors
    ///
    /// Returns `Decode`, attributed to `provider` and `tile`, when the bytes
    /// are empty, of an unrecognized format, or corrupt.
    pub fn decode(
        &self,
        provider: &str,
        tile: TileIndex,
        source: &[u8],
    ) -> Result<RgbaImage, TileError> {
        let failure = |message: String| TileError::Decode {
            provider: provider.to_string(),
            tile,
            message,
        };

        if source.is_empty() {
            return Err(failure("empty payload".to_string()));
        }

        let reader = ImageReader::new(Cursor::new(source))
            .with_guessed_format()
            .map_err(|e| failure(e.to_string()))?;
        if reader.format().is_none() {
            return Err(failure("unrecognized image format".to_string()));
        }

        let img = reader.decode().map_err(|e| failure(e.to_string()))?;
        Ok(img.to_rgba8())
    }
}
