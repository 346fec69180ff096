//! Spherical (Web) Mercator, EPSG:3857.

use std::f64::consts::PI;

use crate::geographic::WGS84_A;

/// Latitude limit of the square Web Mercator world (degrees).
pub const MAX_LATITUDE: f64 = 85.051_128_779_806_59;

/// Project WGS84 lon/lat (degrees) to Web Mercator meters.
///
/// Latitudes beyond [`MAX_LATITUDE`] are clamped to the edge of the world.
pub fn forward(lon: f64, lat: f64) -> (f64, f64) {
    let lat = lat.clamp(-MAX_LATITUDE, MAX_LATITUDE);
    let x = WGS84_A * lon.to_radians();
    let y = WGS84_A * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    (x, y)
}

/// Unproject Web Mercator meters to WGS84 lon/lat (degrees).
pub fn inverse(x: f64, y: f64) -> (f64, f64) {
    let lon = (x / WGS84_A).to_degrees();
    let lat = (2.0 * (y / WGS84_A).exp().atan() - PI / 2.0).to_degrees();
    (lon, lat)
}
