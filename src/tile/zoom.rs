//! Zoom selection.

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use super::index::BoundingBox;
use super::scheme::MAX_LATITUDE;
use crate::error::TileError;

/// Highest zoom any scheme addresses, whatever a provider declares.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Tolerance absorbing float noise when a span is exactly one tile wide.
const ZOOM_EPSILON: f64 = 1e-9;

/// Requested zoom: chosen from the query box, or forced by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Zoom {
    #[default]
    Auto,
    Level(u8),
}

impl fmt::Display for Zoom {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Zoom::Auto => f.write_str("auto"),
            Zoom::Level(z) => write!(f, "{z}"),
        }
    }
}

impl FromStr for Zoom {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("auto") {
            return Ok(Zoom::Auto);
        }
        s.parse::<u8>()
            .map(Zoom::Level)
            .map_err(|_| format!("zoom must be 'auto' or an integer 0-255, got '{s}'"))
    }
}

impl From<u8> for Zoom {
    fn from(zoom: u8) -> Self {
        Zoom::Level(zoom)
    }
}

/// Smallest zoom at which one standard tile is no larger than `bbox` along
/// its tighter axis.
///
/// Longitude and latitude are judged separately: the longitude candidate is
/// `log2(360 / lon_span)`, the latitude candidate is `log2(1 / y_span)` over
/// normalized web-Mercator `y`. The larger candidate wins, rounded up.
pub fn auto_zoom(bbox: &BoundingBox) -> u32 {
    let lon_zoom = (360.0 / bbox.width()).log2();

    let y_span = mercator_y(bbox.south()) - mercator_y(bbox.north());
    let lat_zoom = if y_span > 0.0 {
        (1.0 / y_span).log2()
    } else {
        f64::INFINITY
    };

    let zoom = (lon_zoom.max(lat_zoom) - ZOOM_EPSILON).ceil();
    if zoom.is_finite() {
        zoom.clamp(0.0, f64::from(u32::MAX)) as u32
    } else {
        u32::MAX
    }
}

/// Resolve a requested zoom against a provider's maximum.
///
/// `Auto` is clamped to `max_zoom`. An explicit level above `max_zoom` is an
/// error. `max_zoom` is itself capped at [`MAX_SUPPORTED_ZOOM`].
pub fn resolve_zoom(
    requested: Zoom,
    bbox: &BoundingBox,
    provider: &str,
    max_zoom: u8,
) -> Result<u8, TileError> {
    match requested {
        Zoom::Auto => {
            let zoom = auto_zoom(bbox).min(u32::from(max_zoom.min(MAX_SUPPORTED_ZOOM)));
            Ok(zoom as u8)
        }
        Zoom::Level(zoom) => validate_zoom(zoom, provider, max_zoom),
    }
}

/// Check an explicit zoom against `[0, min(max_zoom, MAX_SUPPORTED_ZOOM)]`.
pub fn validate_zoom(zoom: u8, provider: &str, max_zoom: u8) -> Result<u8, TileError> {
    let max_zoom = max_zoom.min(MAX_SUPPORTED_ZOOM);
    if zoom > max_zoom {
        return Err(TileError::InvalidZoom {
            provider: provider.to_string(),
            zoom,
            max_zoom,
        });
    }
    Ok(zoom)
}

/// Normalized web-Mercator `y` in `[0, 1]`, growing southward.
fn mercator_y(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    0.5 - (PI / 4.0 + lat / 2.0).tan().ln() / (2.0 * PI)
}
