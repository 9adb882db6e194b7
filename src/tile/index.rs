//! Tile indices, bounding boxes and extents.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::coord::{self, CoordinateSystem};
use crate::error::TileError;

// =============================================================================
// Tile Index
// =============================================================================

/// A tile address `(x, y, zoom)` under one provider's scheme.
///
/// Indices from different schemes are not comparable: the linear scheme
/// uses signed indices with y growing northward, the standard scheme uses
/// non-negative indices with y growing southward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TileIndex {
    pub x: i64,
    pub y: i64,
    pub zoom: u8,
}

impl TileIndex {
    pub const fn new(x: i64, y: i64, zoom: u8) -> Self {
        Self { x, y, zoom }
    }
}

impl fmt::Display for TileIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.x, self.y, self.zoom)
    }
}

// =============================================================================
// Bounding Box
// =============================================================================

/// Axis-aligned geographic rectangle in decimal degrees.
///
/// Always satisfies `west < east` and `south < north`. Boxes crossing the
/// antimeridian must be split with [`BoundingBox::split_antimeridian`]
/// before they reach the addressing layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BoundingBox {
    west: f64,
    south: f64,
    east: f64,
    north: f64,
}

impl BoundingBox {
    /// Create a validated bounding box.
    ///
    /// # Errors
    ///
    /// Returns `MalformedBoundingBox` if any edge is not finite, if an edge
    /// lies outside ±180° longitude / ±90° latitude, if `west > east` or
    /// `south > north`, or if the box has zero width or height.
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Result<Self, TileError> {
        let malformed = |reason: String| Err(TileError::MalformedBoundingBox { reason });

        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            return malformed(format!(
                "edges must be finite, got ({west}, {south}, {east}, {north})"
            ));
        }
        if !(-180.0..=180.0).contains(&west) || !(-180.0..=180.0).contains(&east) {
            return malformed(format!("longitude out of range: west {west}, east {east}"));
        }
        if !(-90.0..=90.0).contains(&south) || !(-90.0..=90.0).contains(&north) {
            return malformed(format!("latitude out of range: south {south}, north {north}"));
        }
        if west > east {
            return malformed(format!(
                "west {west} > east {east}; split antimeridian-crossing boxes first"
            ));
        }
        if south > north {
            return malformed(format!("south {south} > north {north}"));
        }
        if west == east || south == north {
            return malformed("zero-span box".to_string());
        }

        Ok(Self::from_edges(west, south, east, north))
    }

    /// Build a box without validation, for edges computed from tile bounds.
    pub(crate) fn from_edges(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// Split a possibly antimeridian-crossing box (`west > east`) into boxes
    /// that each satisfy `west < east`.
    pub fn split_antimeridian(
        west: f64,
        south: f64,
        east: f64,
        north: f64,
    ) -> Result<Vec<Self>, TileError> {
        if west > east {
            Ok(vec![
                Self::new(-180.0, south, east, north)?,
                Self::new(west, south, 180.0, north)?,
            ])
        } else {
            Ok(vec![Self::new(west, south, east, north)?])
        }
    }

    /// Build a box from spherical web-Mercator meters.
    pub fn from_web_mercator(
        left: f64,
        bottom: f64,
        right: f64,
        top: f64,
    ) -> Result<Self, TileError> {
        let (west, south) = coord::web_mercator_to_lnglat(left, bottom);
        let (east, north) = coord::web_mercator_to_lnglat(right, top);
        Self::new(west, south, east, north)
    }

    pub fn west(&self) -> f64 {
        self.west
    }

    pub fn south(&self) -> f64 {
        self.south
    }

    pub fn east(&self) -> f64 {
        self.east
    }

    pub fn north(&self) -> f64 {
        self.north
    }

    /// Longitude span in degrees.
    pub fn width(&self) -> f64 {
        self.east - self.west
    }

    /// Latitude span in degrees.
    pub fn height(&self) -> f64 {
        self.north - self.south
    }

    /// Re-express the box in another coordinate system by converting its
    /// south-west and north-east corners.
    ///
    /// Converted edges are clamped to ±180° / ±90°: datum offsets apply
    /// worldwide and can push a box touching the world edge just past it.
    pub fn convert(
        &self,
        from: CoordinateSystem,
        to: CoordinateSystem,
    ) -> Result<Self, TileError> {
        if from == to {
            return Ok(*self);
        }
        let (west, south) = coord::convert(from, to, self.west, self.south);
        let (east, north) = coord::convert(from, to, self.east, self.north);
        Self::new(
            west.clamp(-180.0, 180.0),
            south.clamp(-90.0, 90.0),
            east.clamp(-180.0, 180.0),
            north.clamp(-90.0, 90.0),
        )
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &Self) -> Self {
        Self::from_edges(
            self.west.min(other.west),
            self.south.min(other.south),
            self.east.max(other.east),
            self.north.max(other.north),
        )
    }
}

// =============================================================================
// Extent
// =============================================================================

/// The geographic rectangle a raster covers, in a stated coordinate system.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Extent {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub system: CoordinateSystem,
}

impl Extent {
    pub fn from_bbox(bbox: &BoundingBox, system: CoordinateSystem) -> Self {
        Self {
            west: bbox.west,
            south: bbox.south,
            east: bbox.east,
            north: bbox.north,
            system,
        }
    }

    /// Re-express the extent in `to` by converting its corners.
    pub fn convert(&self, to: CoordinateSystem) -> Self {
        let (west, south) = coord::convert(self.system, to, self.west, self.south);
        let (east, north) = coord::convert(self.system, to, self.east, self.north);
        Self {
            west,
            south,
            east,
            north,
            system: to,
        }
    }

    /// `(left, bottom, right, top)` in spherical web-Mercator meters.
    pub fn to_web_mercator(&self) -> (f64, f64, f64, f64) {
        let (left, bottom) = coord::lnglat_to_web_mercator(self.west, self.south);
        let (right, top) = coord::lnglat_to_web_mercator(self.east, self.north);
        (left, bottom, right, top)
    }

    /// Whether this extent covers `bbox`, allowing each edge to fall short
    /// by up to `tolerance` degrees.
    pub fn encloses(&self, bbox: &BoundingBox, tolerance: f64) -> bool {
        self.west <= bbox.west + tolerance
            && self.south <= bbox.south + tolerance
            && self.east >= bbox.east - tolerance
            && self.north >= bbox.north - tolerance
    }
}
