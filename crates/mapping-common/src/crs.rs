//! Coordinate Reference System codes and parsing.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// CRS codes supported by the pipeline.
///
/// The named variants have closed-form transforms. Any other EPSG code is
/// kept as [`CrsCode::Epsg`] and resolved from its PROJ definition when a
/// transform is built.
///
/// Equality is on the normalized code, so `"epsg:4326"`, `"CRS:84"` and
/// `"urn:ogc:def:crs:EPSG::4326"` all compare equal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum CrsCode {
    /// WGS84 Geographic (lon/lat in degrees)
    Epsg4326,
    /// NAD83 Geographic, handled as WGS84 (sub-meter datum shift ignored)
    Epsg4269,
    /// Web Mercator (meters)
    Epsg3857,
    /// WGS84 / UTM, EPSG:326NN (north) or EPSG:327NN (south)
    Utm { zone: u8, north: bool },
    /// Any other EPSG code, e.g. EPSG:22185 (POSGAR 94 / Argentina 5)
    Epsg(u32),
}

impl CrsCode {
    /// Build a code from a numeric EPSG identifier.
    ///
    /// Codes outside the EPSG dataset range are rejected here; whether an
    /// in-range code has a definition is only known when transforming.
    pub fn from_epsg(code: u32) -> Result<Self, CrsParseError> {
        match code {
            4326 => Ok(CrsCode::Epsg4326),
            4269 => Ok(CrsCode::Epsg4269),
            3857 | 900913 => Ok(CrsCode::Epsg3857),
            32601..=32660 => Ok(CrsCode::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Ok(CrsCode::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            1024..=32767 => Ok(CrsCode::Epsg(code)),
            _ => Err(CrsParseError::UnsupportedCrs(format!("EPSG:{}", code))),
        }
    }

    /// Numeric EPSG identifier of this CRS.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Epsg4269 => 4269,
            CrsCode::Epsg3857 => 3857,
            CrsCode::Utm { zone, north: true } => 32600 + *zone as u32,
            CrsCode::Utm { zone, north: false } => 32700 + *zone as u32,
            CrsCode::Epsg(code) => *code,
        }
    }

    /// Check if this is a geographic (lon/lat) CRS.
    ///
    /// Always false for [`CrsCode::Epsg`], whose kind is not known here.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326 | CrsCode::Epsg4269)
    }

    /// UTM zone covering a WGS84 longitude/latitude.
    pub fn utm_for_lon_lat(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i64).rem_euclid(60) as u8 + 1;
        CrsCode::Utm {
            zone,
            north: lat >= 0.0,
        }
    }
}

impl FromStr for CrsCode {
    type Err = CrsParseError;

    /// Accepts formats like:
    /// - "EPSG:4326" / "epsg:32633"
    /// - "CRS:84" and "urn:ogc:def:crs:OGC:1.3:CRS84" (WGS84 lon/lat)
    /// - "urn:ogc:def:crs:EPSG::3857"
    /// - "+init=epsg:4326"
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase();
        let normalized = normalized.trim_start_matches("+INIT=");

        if matches!(
            normalized,
            "CRS:84" | "CRS84" | "URN:OGC:DEF:CRS:OGC:1.3:CRS84" | "URN:OGC:DEF:CRS:OGC::CRS84"
        ) {
            return Ok(CrsCode::Epsg4326);
        }

        let digits = normalized
            .strip_prefix("EPSG:")
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG::"))
            .or_else(|| normalized.strip_prefix("URN:OGC:DEF:CRS:EPSG:"))
            .ok_or_else(|| CrsParseError::UnsupportedCrs(s.to_string()))?;

        // URNs may carry a version component ("EPSG:6.6:4326")
        let digits = digits.rsplit(':').next().unwrap_or(digits);
        let code: u32 = digits
            .parse()
            .map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))?;
        CrsCode::from_epsg(code).map_err(|_| CrsParseError::UnsupportedCrs(s.to_string()))
    }
}

impl TryFrom<String> for CrsCode {
    type Error = CrsParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CrsCode> for String {
    fn from(code: CrsCode) -> Self {
        code.to_string()
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CrsParseError {
    #[error("Unsupported CRS: {0}")]
    UnsupportedCrs(String),
}
