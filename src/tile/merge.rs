//! Stitching fetched tiles into one raster.

use image::{imageops, RgbaImage};

use crate::error::TileError;

use super::index::{BoundingBox, Extent};
use super::raster::{RasterResult, TileImage};
use super::scheme::TileScheme;

/// Place every tile on a canvas sized to the index grid they span.
///
/// Columns map left to right by `x`; rows follow the scheme's
/// [`TileScheme::pixel_row`] orientation. Grid cells with no tile stay
/// transparent. The extent is the union of every tile's bounds in the
/// scheme's native system.
///
/// # Errors
///
/// - `EmptyTileSet` when `tiles` is empty
/// - `InconsistentTiles` when zooms or tile dimensions differ, or the grid
///   does not fit in a single image
pub fn merge_tiles<S: TileScheme + ?Sized>(
    scheme: &S,
    tiles: Vec<TileImage>,
) -> Result<RasterResult, TileError> {
    let first = tiles.first().ok_or(TileError::EmptyTileSet)?;
    let zoom = first.index.zoom;
    let (tile_w, tile_h) = first.dimensions();

    let mut min_x = first.index.x;
    let mut max_x = first.index.x;
    let mut min_y = first.index.y;
    let mut max_y = first.index.y;

    for tile in &tiles {
        if tile.index.zoom != zoom {
            return Err(TileError::InconsistentTiles {
                reason: format!(
                    "tile {} is at zoom {}, expected {}",
                    tile.index, tile.index.zoom, zoom
                ),
            });
        }
        if tile.dimensions() != (tile_w, tile_h) {
            let (w, h) = tile.dimensions();
            return Err(TileError::InconsistentTiles {
                reason: format!(
                    "tile {} is {w}x{h}, expected {tile_w}x{tile_h}",
                    tile.index
                ),
            });
        }
        min_x = min_x.min(tile.index.x);
        max_x = max_x.max(tile.index.x);
        min_y = min_y.min(tile.index.y);
        max_y = max_y.max(tile.index.y);
    }

    let cols = grid_span(min_x, max_x, tile_w)?;
    let rows = grid_span(min_y, max_y, tile_h)?;
    let mut canvas = RgbaImage::new(cols, rows);

    let native = scheme.native_system();
    let mut bounds: Option<BoundingBox> = None;

    for tile in &tiles {
        let col = tile.index.x - min_x;
        let row = scheme.pixel_row(tile.index.y, min_y, max_y);
        imageops::replace(
            &mut canvas,
            &tile.pixels,
            col * i64::from(tile_w),
            row * i64::from(tile_h),
        );

        let tile_bounds = scheme.bounds(tile.index, native);
        bounds = Some(match bounds {
            Some(acc) => acc.union(&tile_bounds),
            None => tile_bounds,
        });
    }

    let bounds = bounds.ok_or(TileError::EmptyTileSet)?;
    Ok(RasterResult {
        image: canvas,
        extent: Extent::from_bbox(&bounds, native),
        zoom,
    })
}

/// Pixel length of `min..=max` tiles of `tile_px` pixels each.
fn grid_span(min: i64, max: i64, tile_px: u32) -> Result<u32, TileError> {
    let tiles = max - min + 1;
    tiles
        .checked_mul(i64::from(tile_px))
        .and_then(|px| u32::try_from(px).ok())
        .ok_or_else(|| TileError::InconsistentTiles {
            reason: format!("grid of {tiles} tiles at {tile_px}px does not fit in one image"),
        })
}
