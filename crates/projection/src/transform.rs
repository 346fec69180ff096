//! Point and geometry reprojection between CRSs.
//!
//! Every transformation goes through WGS84 lon/lat: the source coordinate is
//! unprojected, then projected into the destination CRS. Geographic, Web
//! Mercator and UTM use closed-form formulas; other EPSG codes are resolved
//! to a proj4rs definition.

use geo::{coord, Coord, MapCoords, MultiPolygon};
use mapping_common::{BoundingBox, CrsCode, MappingError, MappingResult, ShapeWithProps};
use proj4rs::proj::Proj;

use crate::geographic::{is_valid_lon_lat, normalize_lon};
use crate::mercator;
use crate::utm::TransverseMercator;

const WGS84_LON_LAT: &str = "+proj=longlat +datum=WGS84 +no_defs";

/// Conversion between one CRS and WGS84 (lon, lat) in degrees.
enum LonLatBridge {
    Geographic,
    Mercator,
    Utm(TransverseMercator),
    Proj { crs: Box<Proj>, wgs84: Box<Proj> },
}

impl LonLatBridge {
    fn new(crs: CrsCode) -> MappingResult<Self> {
        Ok(match crs {
            CrsCode::Epsg4326 | CrsCode::Epsg4269 => LonLatBridge::Geographic,
            CrsCode::Epsg3857 => LonLatBridge::Mercator,
            CrsCode::Utm { zone, north } => LonLatBridge::Utm(TransverseMercator::utm(zone, north)),
            CrsCode::Epsg(code) => {
                let epsg = u16::try_from(code)
                    .map_err(|_| MappingError::projection(format!("{} has no definition", crs)))?;
                let definition = Proj::from_epsg_code(epsg).map_err(|e| {
                    MappingError::projection(format!("{} has no usable definition: {:?}", crs, e))
                })?;
                let wgs84 = Proj::from_proj_string(WGS84_LON_LAT).map_err(|e| {
                    MappingError::projection(format!("invalid WGS84 definition: {:?}", e))
                })?;
                LonLatBridge::Proj {
                    crs: Box::new(definition),
                    wgs84: Box::new(wgs84),
                }
            }
        })
    }

    /// Unproject `(x, y)` to WGS84 (lon, lat) in degrees.
    fn unproject(&self, x: f64, y: f64) -> MappingResult<(f64, f64)> {
        Ok(match self {
            LonLatBridge::Geographic => (x, y),
            LonLatBridge::Mercator => mercator::inverse(x, y),
            LonLatBridge::Utm(tm) => tm.inverse(x, y),
            LonLatBridge::Proj { crs, wgs84 } => {
                let mut point = if crs.is_latlong() {
                    (x.to_radians(), y.to_radians(), 0.0)
                } else {
                    (x, y, 0.0)
                };
                proj4rs::transform::transform(crs, wgs84, &mut point)
                    .map_err(|e| MappingError::projection(format!("inverse failed: {:?}", e)))?;
                (point.0.to_degrees(), point.1.to_degrees())
            }
        })
    }

    /// Project WGS84 (lon, lat) in degrees.
    fn project(&self, lon: f64, lat: f64) -> MappingResult<(f64, f64)> {
        Ok(match self {
            LonLatBridge::Geographic => (normalize_lon(lon), lat),
            LonLatBridge::Mercator => mercator::forward(lon, lat),
            LonLatBridge::Utm(tm) => tm.forward(lon, lat),
            LonLatBridge::Proj { crs, wgs84 } => {
                let mut point = (lon.to_radians(), lat.to_radians(), 0.0);
                proj4rs::transform::transform(wgs84, crs, &mut point)
                    .map_err(|e| MappingError::projection(format!("forward failed: {:?}", e)))?;
                if crs.is_latlong() {
                    (point.0.to_degrees(), point.1.to_degrees())
                } else {
                    (point.0, point.1)
                }
            }
        })
    }
}

/// A reusable transform from `src` to `dst`.
///
/// Building one resolves both CRS definitions, so geometries are mapped
/// with a single transformer rather than one per coordinate.
pub struct Transformer {
    src: CrsCode,
    dst: CrsCode,
    from: LonLatBridge,
    to: LonLatBridge,
}

impl Transformer {
    /// Fails with a projection error when either CRS has no definition.
    pub fn new(src: CrsCode, dst: CrsCode) -> MappingResult<Self> {
        Ok(Self {
            src,
            dst,
            from: LonLatBridge::new(src)?,
            to: LonLatBridge::new(dst)?,
        })
    }

    /// Transform a single coordinate.
    ///
    /// Fails with a projection error when the coordinate is not finite or
    /// falls outside the valid geographic range.
    pub fn transform(&self, x: f64, y: f64) -> MappingResult<(f64, f64)> {
        if !x.is_finite() || !y.is_finite() {
            return Err(MappingError::projection(format!(
                "non-finite coordinate ({}, {}) in {}",
                x, y, self.src
            )));
        }
        if self.src == self.dst {
            return Ok((x, y));
        }

        let (lon, lat) = self.from.unproject(x, y)?;
        if !is_valid_lon_lat(lon, lat) {
            return Err(MappingError::projection(format!(
                "coordinate ({}, {}) in {} is outside the valid range (lon {}, lat {})",
                x, y, self.src, lon, lat
            )));
        }
        let (px, py) = self.to.project(lon, lat)?;
        if !px.is_finite() || !py.is_finite() {
            return Err(MappingError::projection(format!(
                "lon {} lat {} has no finite coordinate in {}",
                lon, lat, self.dst
            )));
        }
        Ok((px, py))
    }

    fn transform_coord(&self, c: Coord<f64>) -> MappingResult<Coord<f64>> {
        let (x, y) = self.transform(c.x, c.y)?;
        Ok(coord! { x: x, y: y })
    }
}

/// Transform a single coordinate from `src` to `dst`.
///
/// Fails with a projection error when the coordinate is not finite or
/// falls outside the valid geographic range.
pub fn transform_point(x: f64, y: f64, src: CrsCode, dst: CrsCode) -> MappingResult<(f64, f64)> {
    if src == dst && x.is_finite() && y.is_finite() {
        return Ok((x, y));
    }
    Transformer::new(src, dst)?.transform(x, y)
}

/// Reproject every coordinate of `shape` from `src` to `dst`.
///
/// Returns a clone when both CRSs are equal.
pub fn reproject(
    shape: &MultiPolygon<f64>,
    src: CrsCode,
    dst: CrsCode,
) -> MappingResult<MultiPolygon<f64>> {
    if src == dst {
        return Ok(shape.clone());
    }
    let transformer = Transformer::new(src, dst)?;
    shape.try_map_coords(|c| transformer.transform_coord(c))
}

/// Reproject the geometry of each shape, keeping its properties.
pub fn reproject_shapes(
    shapes: &[ShapeWithProps],
    src: CrsCode,
    dst: CrsCode,
) -> MappingResult<Vec<ShapeWithProps>> {
    if src == dst {
        return Ok(shapes.to_vec());
    }
    tracing::debug!(count = shapes.len(), %src, %dst, "Reprojecting shapes");
    let transformer = Transformer::new(src, dst)?;
    shapes
        .iter()
        .map(|s| {
            let geometry = s.geometry.try_map_coords(|c| transformer.transform_coord(c))?;
            Ok(s.with_geometry(geometry))
        })
        .collect()
}

/// Reproject a bounding box by transforming its four corners.
///
/// The result is the axis-aligned box around the transformed corners.
pub fn reproject_bbox(
    bbox: &BoundingBox,
    src: CrsCode,
    dst: CrsCode,
) -> MappingResult<BoundingBox> {
    if src == dst {
        return Ok(*bbox);
    }
    let corners = [
        (bbox.min_x, bbox.min_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
        (bbox.min_x, bbox.max_y),
    ];
    let transformer = Transformer::new(src, dst)?;
    let mut projected = Vec::with_capacity(corners.len());
    for (x, y) in corners {
        projected.push(transformer.transform(x, y)?);
    }
    BoundingBox::from_points(projected)
        .ok_or_else(|| MappingError::projection("empty bounding box"))
}
