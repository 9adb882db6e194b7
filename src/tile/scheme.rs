//! Tile addressing schemes.
//!
//! Two strategies share one capability interface, [`TileScheme`]:
//!
//! - [`StandardScheme`]: slippy-map XYZ over web-Mercator, used by WGS84 and
//!   GCJ-02 providers. `y` grows southward from the north-west corner.
//! - [`LinearScheme`]: floor of BD-Mercator meters divided by a power-of-two
//!   pitch, used by BD-09 providers. Indices are signed and `y` grows
//!   northward from the equator.
//!
//! A provider's scheme is resolved once into a [`Scheme`] and held for the
//! lifetime of the map.

use std::f64::consts::PI;

use crate::coord::{self, CoordinateSystem};
use crate::error::TileError;

use super::index::{BoundingBox, TileIndex};
use super::merge::merge_tiles;
use super::raster::{RasterResult, TileImage};

/// Latitude clamp applied before addressing, matching the web-Mercator limit.
pub const MAX_LATITUDE: f64 = 85.051129;

/// Nudge applied to east/south edges so a box equal to one tile's bounds
/// yields exactly that tile.
const LL_EPSILON: f64 = 1e-11;

/// Guard against `floor` landing one tile early on exact tile edges.
const TILE_EPSILON: f64 = 1e-14;

/// Base zoom `K` of the linear scheme: pitch is `256 * 2^(K - zoom)` meters.
pub const LINEAR_BASE_ZOOM: u8 = 18;

/// Pixel size of one linear-scheme tile at the base zoom.
const LINEAR_TILE_METERS: f64 = 256.0;

// =============================================================================
// TileScheme Trait
// =============================================================================

/// Capability interface shared by every addressing scheme.
///
/// Zooms are expected to be validated against
/// [`MAX_SUPPORTED_ZOOM`](super::MAX_SUPPORTED_ZOOM) first.
pub trait TileScheme: Send + Sync {
    /// Coordinate system tile bounds are natively expressed in.
    fn native_system(&self) -> CoordinateSystem;

    /// Every tile overlapping `bbox` (native degrees) at `zoom`.
    ///
    /// The returned range is finite and ordered column-major; calling this
    /// twice with the same inputs yields the same sequence.
    fn enumerate(&self, bbox: &BoundingBox, zoom: u8) -> TileRange;

    /// The tile containing the native point `(lng, lat)`.
    fn tile_at(&self, lng: f64, lat: f64, zoom: u8) -> TileIndex;

    /// Geographic bounds of `tile`, expressed in `target`.
    fn bounds(&self, tile: TileIndex, target: CoordinateSystem) -> BoundingBox;

    /// Pixel row, in tiles from the top, of a tile row within `[min_y, max_y]`.
    fn pixel_row(&self, tile_y: i64, min_y: i64, max_y: i64) -> i64;

    /// Stitch fetched tiles into one raster with its native extent.
    fn merge(&self, tiles: Vec<TileImage>) -> Result<RasterResult, TileError> {
        merge_tiles(self, tiles)
    }
}

// =============================================================================
// Tile Range
// =============================================================================

/// Rectangular, inclusive range of tile indices at one zoom level.
///
/// Iterates x-major (all rows of the first column, then the next column).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileRange {
    min_x: i64,
    max_x: i64,
    min_y: i64,
    max_y: i64,
    zoom: u8,
    cursor: Option<(i64, i64)>,
}

impl TileRange {
    /// Create a range; an inverted range is empty.
    pub fn new(min_x: i64, max_x: i64, min_y: i64, max_y: i64, zoom: u8) -> Self {
        let cursor = (min_x <= max_x && min_y <= max_y).then_some((min_x, min_y));
        Self {
            min_x,
            max_x,
            min_y,
            max_y,
            zoom,
            cursor,
        }
    }

    pub fn zoom(&self) -> u8 {
        self.zoom
    }

    /// Number of columns and rows covered.
    pub fn dimensions(&self) -> (u64, u64) {
        if self.min_x > self.max_x || self.min_y > self.max_y {
            return (0, 0);
        }
        (
            (self.max_x - self.min_x + 1) as u64,
            (self.max_y - self.min_y + 1) as u64,
        )
    }

    /// Total number of tiles in the range, independent of iteration state.
    pub fn tile_count(&self) -> u64 {
        let (cols, rows) = self.dimensions();
        cols * rows
    }
}

impl Iterator for TileRange {
    type Item = TileIndex;

    fn next(&mut self) -> Option<TileIndex> {
        let (x, y) = self.cursor?;
        self.cursor = if y < self.max_y {
            Some((x, y + 1))
        } else if x < self.max_x {
            Some((x + 1, self.min_y))
        } else {
            None
        };
        Some(TileIndex::new(x, y, self.zoom))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.cursor {
            None => (0, Some(0)),
            Some((x, y)) => {
                let rows = self.max_y - self.min_y + 1;
                let remaining = (self.max_x - x) * rows + (self.max_y - y + 1);
                let remaining = usize::try_from(remaining).unwrap_or(usize::MAX);
                (remaining, Some(remaining))
            }
        }
    }
}

// =============================================================================
// Standard Scheme
// =============================================================================

/// Power-of-two XYZ scheme over web-Mercator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StandardScheme {
    system: CoordinateSystem,
}

impl StandardScheme {
    /// A standard scheme whose degrees are expressed in `system`
    /// (WGS84 for most providers, GCJ-02 for mainland-China mirrors).
    pub fn new(system: CoordinateSystem) -> Self {
        Self { system }
    }

    /// Fractional tile coordinates of `(lng, lat)` in `[0, 1]`.
    fn fraction(lng: f64, lat: f64) -> (f64, f64) {
        let x = lng / 360.0 + 0.5;
        let sin_lat = lat.to_radians().sin();
        let y = 0.5 - 0.25 * ((1.0 + sin_lat) / (1.0 - sin_lat)).ln() / PI;
        (x, y)
    }

    fn to_index(fraction: f64, tiles: i64) -> i64 {
        if fraction <= 0.0 {
            0
        } else if fraction >= 1.0 {
            tiles - 1
        } else {
            (((fraction + TILE_EPSILON) * tiles as f64).floor() as i64).min(tiles - 1)
        }
    }
}

impl TileScheme for StandardScheme {
    fn native_system(&self) -> CoordinateSystem {
        self.system
    }

    fn enumerate(&self, bbox: &BoundingBox, zoom: u8) -> TileRange {
        let west = bbox.west().max(-180.0);
        let south = bbox.south().max(-MAX_LATITUDE);
        let east = bbox.east().min(180.0);
        let north = bbox.north().min(MAX_LATITUDE);

        let upper_left = self.tile_at(west, north, zoom);
        let lower_right = self.tile_at(east - LL_EPSILON, south + LL_EPSILON, zoom);

        TileRange::new(
            upper_left.x,
            lower_right.x,
            upper_left.y,
            lower_right.y,
            zoom,
        )
    }

    fn tile_at(&self, lng: f64, lat: f64, zoom: u8) -> TileIndex {
        let tiles = 1i64 << zoom;
        let (x, y) = Self::fraction(lng, lat);
        TileIndex::new(Self::to_index(x, tiles), Self::to_index(y, tiles), zoom)
    }

    fn bounds(&self, tile: TileIndex, target: CoordinateSystem) -> BoundingBox {
        let tiles = (1i64 << tile.zoom) as f64;
        let lng = |x: i64| x as f64 / tiles * 360.0 - 180.0;
        let lat = |y: i64| (PI * (1.0 - 2.0 * y as f64 / tiles)).sinh().atan().to_degrees();

        let (west, north) = (lng(tile.x), lat(tile.y));
        let (east, south) = (lng(tile.x + 1), lat(tile.y + 1));
        project_bounds(self.system, target, west, south, east, north)
    }

    fn pixel_row(&self, tile_y: i64, min_y: i64, _max_y: i64) -> i64 {
        tile_y - min_y
    }
}

// =============================================================================
// Linear Scheme
// =============================================================================

/// BD-Mercator scheme: `index = floor(meters / (256 * 2^(K - zoom)))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearScheme {
    base_zoom: u8,
}

impl LinearScheme {
    pub fn new() -> Self {
        Self::with_base_zoom(LINEAR_BASE_ZOOM)
    }

    /// A linear scheme whose pitch is one 256-meter tile at `base_zoom`.
    fn with_base_zoom(base_zoom: u8) -> Self {
        Self { base_zoom }
    }

    /// Tile pitch in BD-Mercator meters at `zoom`.
    pub fn pitch(&self, zoom: u8) -> f64 {
        LINEAR_TILE_METERS * 2f64.powi(i32::from(self.base_zoom) - i32::from(zoom))
    }
}

impl Default for LinearScheme {
    fn default() -> Self {
        Self::new()
    }
}

impl TileScheme for LinearScheme {
    fn native_system(&self) -> CoordinateSystem {
        CoordinateSystem::Bd
    }

    fn enumerate(&self, bbox: &BoundingBox, zoom: u8) -> TileRange {
        let west = bbox.west().max(-180.0);
        let south = bbox.south().max(-MAX_LATITUDE);
        let east = bbox.east().min(180.0);
        let north = bbox.north().min(MAX_LATITUDE);

        let pitch = self.pitch(zoom);
        let (min_mx, min_my) = coord::bd09_to_mercator(west, south);
        let (max_mx, max_my) = coord::bd09_to_mercator(east, north);

        // East/north edges lying exactly on a tile boundary belong to the
        // previous tile.
        let edge = pitch * TILE_EPSILON;
        TileRange::new(
            (min_mx / pitch).floor() as i64,
            ((max_mx - edge) / pitch).floor() as i64,
            (min_my / pitch).floor() as i64,
            ((max_my - edge) / pitch).floor() as i64,
            zoom,
        )
    }

    fn tile_at(&self, lng: f64, lat: f64, zoom: u8) -> TileIndex {
        let pitch = self.pitch(zoom);
        let (mx, my) = coord::bd09_to_mercator(lng, lat);
        TileIndex::new(
            (mx / pitch).floor() as i64,
            (my / pitch).floor() as i64,
            zoom,
        )
    }

    fn bounds(&self, tile: TileIndex, target: CoordinateSystem) -> BoundingBox {
        let pitch = self.pitch(tile.zoom);
        let (west, south) =
            coord::mercator_to_bd09(tile.x as f64 * pitch, tile.y as f64 * pitch);
        let (east, north) =
            coord::mercator_to_bd09((tile.x + 1) as f64 * pitch, (tile.y + 1) as f64 * pitch);
        project_bounds(CoordinateSystem::Bd, target, west, south, east, north)
    }

    fn pixel_row(&self, tile_y: i64, _min_y: i64, max_y: i64) -> i64 {
        max_y - tile_y
    }
}

// =============================================================================
// Resolved Scheme
// =============================================================================

/// The scheme a provider uses, resolved once from its coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scheme {
    Standard(StandardScheme),
    Linear(LinearScheme),
}

impl Scheme {
    /// Select the scheme for tiles indexed in `system`.
    pub fn for_system(system: CoordinateSystem) -> Self {
        match system {
            CoordinateSystem::Standard | CoordinateSystem::Gcj => {
                Scheme::Standard(StandardScheme::new(system))
            }
            CoordinateSystem::Bd => Scheme::Linear(LinearScheme::new()),
        }
    }
}

impl TileScheme for Scheme {
    fn native_system(&self) -> CoordinateSystem {
        match self {
            Scheme::Standard(s) => s.native_system(),
            Scheme::Linear(s) => s.native_system(),
        }
    }

    fn enumerate(&self, bbox: &BoundingBox, zoom: u8) -> TileRange {
        match self {
            Scheme::Standard(s) => s.enumerate(bbox, zoom),
            Scheme::Linear(s) => s.enumerate(bbox, zoom),
        }
    }

    fn tile_at(&self, lng: f64, lat: f64, zoom: u8) -> TileIndex {
        match self {
            Scheme::Standard(s) => s.tile_at(lng, lat, zoom),
            Scheme::Linear(s) => s.tile_at(lng, lat, zoom),
        }
    }

    fn bounds(&self, tile: TileIndex, target: CoordinateSystem) -> BoundingBox {
        match self {
            Scheme::Standard(s) => s.bounds(tile, target),
            Scheme::Linear(s) => s.bounds(tile, target),
        }
    }

    fn pixel_row(&self, tile_y: i64, min_y: i64, max_y: i64) -> i64 {
        match self {
            Scheme::Standard(s) => s.pixel_row(tile_y, min_y, max_y),
            Scheme::Linear(s) => s.pixel_row(tile_y, min_y, max_y),
        }
    }
}

/// Convert native tile corners to `target`, corner by corner.
fn project_bounds(
    native: CoordinateSystem,
    target: CoordinateSystem,
    west: f64,
    south: f64,
    east: f64,
    north: f64,
) -> BoundingBox {
    let (west, south) = coord::convert(native, target, west, south);
    let (east, north) = coord::convert(native, target, east, north);
    BoundingBox::from_edges(west, south, east, north)
}
