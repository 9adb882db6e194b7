//! GCJ-02 and BD-09 obfuscation transforms.
//!
//! Both directions are empirical fits: the "reverse" functions subtract the
//! forward offset evaluated at the obfuscated point rather than inverting it,
//! so a round trip drifts by up to a few meters. Callers must tolerate this.

use std::f64::consts::PI;

/// Semi-major axis of the Krasovsky 1940 ellipsoid used by GCJ-02.
const KRASOVSKY_A: f64 = 6_378_245.0;

/// First eccentricity squared of the Krasovsky 1940 ellipsoid.
const KRASOVSKY_EE: f64 = 0.006_693_421_622_965_943;

/// `PI * 3000 / 180`, the angular scale of the BD-09 perturbation.
const X_PI: f64 = PI * 3000.0 / 180.0;

/// Offset, in degrees, that BD-09 adds on top of GCJ-02.
const BD_LNG_OFFSET: f64 = 0.0065;
const BD_LAT_OFFSET: f64 = 0.006;

/// Whether a point lies outside mainland China, where GCJ-02 equals WGS84.
#[inline]
pub fn out_of_china(lng: f64, lat: f64) -> bool {
    !(lng > 73.66 && lng < 135.05 && lat > 3.86 && lat < 53.55)
}

/// Convert WGS84 to GCJ-02.
pub fn wgs84_to_gcj02(lng: f64, lat: f64) -> (f64, f64) {
    if out_of_china(lng, lat) {
        return (lng, lat);
    }
    let (dlng, dlat) = gcj02_offset(lng, lat);
    (lng + dlng, lat + dlat)
}

/// Convert GCJ-02 to WGS84.
pub fn gcj02_to_wgs84(lng: f64, lat: f64) -> (f64, f64) {
    if out_of_china(lng, lat) {
        return (lng, lat);
    }
    let (dlng, dlat) = gcj02_offset(lng, lat);
    (lng - dlng, lat - dlat)
}

/// Convert GCJ-02 to BD-09.
pub fn gcj02_to_bd09(lng: f64, lat: f64) -> (f64, f64) {
    let z = (lng * lng + lat * lat).sqrt() + 0.00002 * (lat * X_PI).sin();
    let theta = lat.atan2(lng) + 0.000003 * (lng * X_PI).cos();
    (
        z * theta.cos() + BD_LNG_OFFSET,
        z * theta.sin() + BD_LAT_OFFSET,
    )
}

/// Convert BD-09 to GCJ-02.
pub fn bd09_to_gcj02(lng: f64, lat: f64) -> (f64, f64) {
    let x = lng - BD_LNG_OFFSET;
    let y = lat - BD_LAT_OFFSET;
    let z = (x * x + y * y).sqrt() - 0.00002 * (y * X_PI).sin();
    let theta = y.atan2(x) - 0.000003 * (x * X_PI).cos();
    (z * theta.cos(), z * theta.sin())
}

/// Convert WGS84 to BD-09 through GCJ-02.
pub fn wgs84_to_bd09(lng: f64, lat: f64) -> (f64, f64) {
    let (lng, lat) = wgs84_to_gcj02(lng, lat);
    gcj02_to_bd09(lng, lat)
}

/// Convert BD-09 to WGS84 through GCJ-02.
pub fn bd09_to_wgs84(lng: f64, lat: f64) -> (f64, f64) {
    let (lng, lat) = bd09_to_gcj02(lng, lat);
    gcj02_to_wgs84(lng, lat)
}

/// Offset `(dlng, dlat)` in degrees that GCJ-02 applies at `(lng, lat)`.
fn gcj02_offset(lng: f64, lat: f64) -> (f64, f64) {
    let dlat = transform_lat(lng - 105.0, lat - 35.0);
    let dlng = transform_lng(lng - 105.0, lat - 35.0);

    let rad_lat = lat / 180.0 * PI;
    let magic = 1.0 - KRASOVSKY_EE * rad_lat.sin().powi(2);
    let sqrt_magic = magic.sqrt();

    let dlat = (dlat * 180.0) / ((KRASOVSKY_A * (1.0 - KRASOVSKY_EE)) / (magic * sqrt_magic) * PI);
    let dlng = (dlng * 180.0) / (KRASOVSKY_A / sqrt_magic * rad_lat.cos() * PI);
    (dlng, dlat)
}

fn transform_lat(lng: f64, lat: f64) -> f64 {
    let mut ret = -100.0
        + 2.0 * lng
        + 3.0 * lat
        + 0.2 * lat * lat
        + 0.1 * lng * lat
        + 0.2 * lng.abs().sqrt();
    ret += (20.0 * (6.0 * lng * PI).sin() + 20.0 * (2.0 * lng * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (lat * PI).sin() + 40.0 * (lat / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (160.0 * (lat / 12.0 * PI).sin() + 320.0 * (lat * PI / 30.0).sin()) * 2.0 / 3.0;
    ret
}

fn transform_lng(lng: f64, lat: f64) -> f64 {
    let mut ret =
        300.0 + lng + 2.0 * lat + 0.1 * lng * lng + 0.1 * lng * lat + 0.1 * lng.abs().sqrt();
    ret += (20.0 * (6.0 * lng * PI).sin() + 20.0 * (2.0 * lng * PI).sin()) * 2.0 / 3.0;
    ret += (20.0 * (lng * PI).sin() + 40.0 * (lng / 3.0 * PI).sin()) * 2.0 / 3.0;
    ret += (150.0 * (lng / 12.0 * PI).sin() + 300.0 * (lng / 30.0 * PI).sin()) * 2.0 / 3.0;
    ret
}
