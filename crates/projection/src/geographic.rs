//! WGS84 ellipsoid constants and geographic coordinate helpers.

/// WGS84 semi-major axis (meters)
pub const WGS84_A: f64 = 6_378_137.0;
/// WGS84 flattening
pub const WGS84_F: f64 = 1.0 / 298.257_223_563;

/// First eccentricity squared of the WGS84 ellipsoid.
pub fn wgs84_e2() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

/// Wrap a longitude in degrees into [-180, 180).
pub fn normalize_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 {
        180.0
    } else {
        wrapped
    }
}

/// Check that a longitude/latitude pair is finite and inside the valid range.
pub fn is_valid_lon_lat(lon: f64, lat: f64) -> bool {
    lon.is_finite() && lat.is_finite() && (-90.0..=90.0).contains(&lat) && lon.abs() <= 540.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lon() {
        assert_eq!(normalize_lon(0.0), 0.0);
        assert_eq!(normalize_lon(190.0), -170.0);
        assert_eq!(normalize_lon(-190.0), 170.0);
        assert_eq!(normalize_lon(180.0), 180.0);
        assert_eq!(normalize_lon(-180.0), -180.0);
    }

    #[test]
    fn test_valid_lon_lat() {
        assert!(is_valid_lon_lat(-58.4, -34.6));
        assert!(!is_valid_lon_lat(0.0, 91.0));
        assert!(!is_valid_lon_lat(f64::NAN, 0.0));
    }
}
