//! Coordinate systems and transforms.
//!
//! Three progressively composed systems are supported:
//!
//! ```text
//!   STANDARD (WGS84) ──wgs84_to_gcj02──▶ GCJ-02 ──gcj02_to_bd09──▶ BD-09
//!                    ◀─gcj02_to_wgs84──          ◀─bd09_to_gcj02──
//! ```
//!
//! BD-09 has no closed form against WGS84; it always goes through GCJ-02.
//! All functions here are pure and safe to call from any thread.

mod baidu;
mod transform;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TileError;

pub use baidu::{bd09_to_mercator, mercator_to_bd09};
pub use transform::{
    bd09_to_gcj02, bd09_to_wgs84, gcj02_to_bd09, gcj02_to_wgs84, out_of_china, wgs84_to_bd09,
    wgs84_to_gcj02,
};

/// Radius of the spherical web-Mercator earth, in meters.
pub const WEB_MERCATOR_RADIUS: f64 = 6_378_137.0;

/// Latitude limit of the square web-Mercator world.
pub const WEB_MERCATOR_MAX_LAT: f64 = 85.051_128_779_806_59;

/// Coordinate system a provider indexes its tiles in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum CoordinateSystem {
    /// WGS84 longitude/latitude.
    #[default]
    #[serde(rename = "wgs", alias = "wgs84", alias = "standard")]
    Standard,

    /// GCJ-02, the obfuscated system mandated for maps of mainland China.
    #[serde(rename = "gcj", alias = "gcj02")]
    Gcj,

    /// BD-09, a second obfuscation on top of GCJ-02.
    #[serde(rename = "bd", alias = "bd09")]
    Bd,
}

impl CoordinateSystem {
    /// Short tag used in catalogs and on the command line.
    pub fn as_str(&self) -> &'static str {
        match self {
            CoordinateSystem::Standard => "wgs",
            CoordinateSystem::Gcj => "gcj",
            CoordinateSystem::Bd => "bd",
        }
    }
}

impl fmt::Display for CoordinateSystem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for CoordinateSystem {
    type Err = TileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "wgs" | "wgs84" | "standard" => Ok(CoordinateSystem::Standard),
            "gcj" | "gcj02" => Ok(CoordinateSystem::Gcj),
            "bd" | "bd09" => Ok(CoordinateSystem::Bd),
            _ => Err(TileError::UnsupportedCoordinateSystem(s.to_string())),
        }
    }
}

/// Convert a point expressed in `system` to WGS84.
pub fn to_standard(system: CoordinateSystem, lng: f64, lat: f64) -> (f64, f64) {
    match system {
        CoordinateSystem::Standard => (lng, lat),
        CoordinateSystem::Gcj => gcj02_to_wgs84(lng, lat),
        CoordinateSystem::Bd => bd09_to_wgs84(lng, lat),
    }
}

/// Convert a WGS84 point into `system`.
pub fn from_standard(system: CoordinateSystem, lng: f64, lat: f64) -> (f64, f64) {
    match system {
        CoordinateSystem::Standard => (lng, lat),
        CoordinateSystem::Gcj => wgs84_to_gcj02(lng, lat),
        CoordinateSystem::Bd => wgs84_to_bd09(lng, lat),
    }
}

/// Convert a point between any two systems.
///
/// GCJ <-> BD uses the direct pair rather than a detour through WGS84, which
/// would double the drift.
pub fn convert(from: CoordinateSystem, to: CoordinateSystem, lng: f64, lat: f64) -> (f64, f64) {
    use CoordinateSystem::*;

    match (from, to) {
        (a, b) if a == b => (lng, lat),
        (Gcj, Bd) => gcj02_to_bd09(lng, lat),
        (Bd, Gcj) => bd09_to_gcj02(lng, lat),
        (Standard, to) => from_standard(to, lng, lat),
        (from, _) => to_standard(from, lng, lat),
    }
}

/// Project longitude/latitude to spherical web-Mercator meters.
pub fn lnglat_to_web_mercator(lng: f64, lat: f64) -> (f64, f64) {
    let x = WEB_MERCATOR_RADIUS * lng.to_radians();
    let y = if lat >= 90.0 {
        f64::INFINITY
    } else if lat <= -90.0 {
        f64::NEG_INFINITY
    } else {
        WEB_MERCATOR_RADIUS * (std::f64::consts::FRAC_PI_4 + 0.5 * lat.to_radians()).tan().ln()
    };
    (x, y)
}

/// Unproject spherical web-Mercator meters to longitude/latitude.
pub fn web_mercator_to_lnglat(x: f64, y: f64) -> (f64, f64) {
    let lng = (x / WEB_MERCATOR_RADIUS).to_degrees();
    let lat = (2.0 * (y / WEB_MERCATOR_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees();
    (lng, lat)
}
