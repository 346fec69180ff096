//! GeoJSON FeatureCollection types and conversion to and from shapes.
//!
//! Only Polygon and MultiPolygon geometries carry meaning in the pipeline;
//! features with other geometry types are skipped on read. The legacy
//! `crs` member (`{"type": "name", "properties": {"name": ...}}`) is read
//! and written so that files in projected CRSs round-trip.

use geo::{Coord, LineString, MultiPolygon, Polygon};
use mapping_common::{CrsCode, MappingError, MappingResult, PropValue, Props, ShapeWithProps};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A GeoJSON FeatureCollection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeatureCollection {
    /// Type identifier (always "FeatureCollection").
    #[serde(rename = "type")]
    pub type_: String,

    /// Legacy named CRS member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub crs: Option<NamedCrs>,

    pub features: Vec<Feature>,
}

/// A GeoJSON Feature. Geometry is kept as raw JSON until converted, so
/// unsupported geometry types can be skipped instead of failing the parse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feature {
    #[serde(rename = "type")]
    pub type_: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,

    pub geometry: Option<Value>,

    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// `{"type": "name", "properties": {"name": "EPSG:32721"}}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCrs {
    #[serde(rename = "type")]
    pub type_: String,
    pub properties: NamedCrsProperties,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NamedCrsProperties {
    pub name: String,
}

impl NamedCrs {
    pub fn from_code(crs: CrsCode) -> Self {
        Self {
            type_: "name".to_string(),
            properties: NamedCrsProperties {
                name: format!("urn:ogc:def:crs:EPSG::{}", crs.epsg()),
            },
        }
    }
}

/// Polygon coordinates: rings of positions; extra dimensions are ignored.
type PolygonCoords = Vec<Vec<Vec<f64>>>;

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum AreaGeometry {
    Polygon { coordinates: PolygonCoords },
    MultiPolygon { coordinates: Vec<PolygonCoords> },
}

impl FeatureCollection {
    /// Parse a FeatureCollection document.
    pub fn parse(text: &str) -> MappingResult<Self> {
        let collection: FeatureCollection = serde_json::from_str(text)?;
        if collection.type_ != "FeatureCollection" {
            return Err(MappingError::Vector(format!(
                "expected a FeatureCollection, found {}",
                collection.type_
            )));
        }
        Ok(collection)
    }

    /// CRS of the collection; EPSG:4326 when no `crs` member is present.
    pub fn crs_code(&self) -> MappingResult<CrsCode> {
        match &self.crs {
            Some(named) => Ok(named.properties.name.parse()?),
            None => Ok(CrsCode::Epsg4326),
        }
    }

    /// Convert every polygonal feature to a shape.
    ///
    /// Features without geometry or with a non-polygonal geometry are
    /// skipped with a warning. Malformed polygon coordinates are an error.
    pub fn to_shapes(&self) -> MappingResult<Vec<ShapeWithProps>> {
        let mut shapes = Vec::with_capacity(self.features.len());
        for (i, feature) in self.features.iter().enumerate() {
            let Some(geometry) = &feature.geometry else {
                tracing::warn!(feature = i, "Skipping feature without geometry");
                continue;
            };
            let kind = geometry.get("type").and_then(Value::as_str).unwrap_or("<missing>");
            if kind != "Polygon" && kind != "MultiPolygon" {
                tracing::warn!(feature = i, geometry = kind, "Skipping non-polygonal feature");
                continue;
            }

            let parsed: AreaGeometry = serde_json::from_value(geometry.clone())
                .map_err(|e| MappingError::Vector(format!("feature {}: {}", i, e)))?;
            let multi = match parsed {
                AreaGeometry::Polygon { coordinates } => {
                    MultiPolygon::new(vec![polygon_from_coords(&coordinates, i)?])
                }
                AreaGeometry::MultiPolygon { coordinates } => MultiPolygon::new(
                    coordinates
                        .iter()
                        .map(|p| polygon_from_coords(p, i))
                        .collect::<MappingResult<_>>()?,
                ),
            };

            shapes.push(ShapeWithProps::new(multi, props_from_json(feature.properties.as_ref())));
        }
        Ok(shapes)
    }

    /// Build a collection from shapes. Single-polygon shapes are written as
    /// `Polygon`, others as `MultiPolygon`. The `crs` member is only written
    /// for CRSs other than EPSG:4326; empty geometries are skipped.
    pub fn from_shapes(shapes: &[ShapeWithProps], crs: CrsCode) -> Self {
        let features = shapes
            .iter()
            .filter(|s| !s.geometry.0.is_empty())
            .map(|s| Feature {
                type_: "Feature".to_string(),
                id: None,
                geometry: Some(geometry_to_json(&s.geometry)),
                properties: Some(props_to_json(&s.props)),
            })
            .collect();

        Self {
            type_: "FeatureCollection".to_string(),
            crs: (crs != CrsCode::Epsg4326).then(|| NamedCrs::from_code(crs)),
            features,
        }
    }
}

fn ring_from_coords(ring: &[Vec<f64>], feature: usize) -> MappingResult<LineString<f64>> {
    ring.iter()
        .map(|pos| match pos.as_slice() {
            [x, y, ..] => Ok(Coord { x: *x, y: *y }),
            _ => Err(MappingError::Vector(format!(
                "feature {}: position with fewer than 2 coordinates",
                feature
            ))),
        })
        .collect::<MappingResult<Vec<_>>>()
        .map(LineString::new)
}

fn polygon_from_coords(rings: &PolygonCoords, feature: usize) -> MappingResult<Polygon<f64>> {
    let mut rings = rings.iter();
    let exterior = rings.next().ok_or_else(|| {
        MappingError::Vector(format!("feature {}: polygon without rings", feature))
    })?;
    let exterior = ring_from_coords(exterior, feature)?;
    let interiors = rings
        .map(|r| ring_from_coords(r, feature))
        .collect::<MappingResult<Vec<_>>>()?;
    Ok(Polygon::new(exterior, interiors))
}

fn ring_to_json(ring: &LineString<f64>) -> Value {
    Value::Array(ring.coords().map(|c| serde_json::json!([c.x, c.y])).collect())
}

fn polygon_to_json(polygon: &Polygon<f64>) -> Value {
    let mut rings = vec![ring_to_json(polygon.exterior())];
    rings.extend(polygon.interiors().iter().map(ring_to_json));
    Value::Array(rings)
}

fn geometry_to_json(geometry: &MultiPolygon<f64>) -> Value {
    match geometry.0.as_slice() {
        [single] => serde_json::json!({
            "type": "Polygon",
            "coordinates": polygon_to_json(single),
        }),
        polygons => serde_json::json!({
            "type": "MultiPolygon",
            "coordinates": polygons.iter().map(polygon_to_json).collect::<Vec<_>>(),
        }),
    }
}

/// Scalar JSON properties become shape props; nulls, arrays and objects
/// are dropped.
fn props_from_json(properties: Option<&Map<String, Value>>) -> Props {
    properties
        .into_iter()
        .flatten()
        .filter_map(|(key, value)| {
            let prop = match value {
                Value::Number(n) => PropValue::Number(n.as_f64()?),
                Value::Bool(b) => PropValue::Bool(*b),
                Value::String(s) => PropValue::Text(s.clone()),
                _ => return None,
            };
            Some((key.clone(), prop))
        })
        .collect()
}

fn props_to_json(props: &Props) -> Map<String, Value> {
    props
        .iter()
        .map(|(key, value)| {
            let json = match value {
                PropValue::Number(n) => serde_json::Number::from_f64(*n)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                PropValue::Bool(b) => Value::Bool(*b),
                PropValue::Text(s) => Value::String(s.clone()),
            };
            (key.clone(), json)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use mapping_common::PROB;

    const SAMPLE: &str = r#"{
        "type": "FeatureCollection",
        "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::32721"}},
        "features": [
            {"type": "Feature",
             "geometry": {"type": "Polygon",
                          "coordinates": [[[0, 0], [4, 0], [4, 4], [0, 4], [0, 0]]]},
             "properties": {"name": "villa 31", "surveyed": true,
                            "households": 120, "notes": null}},
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [1, 1]},
             "properties": {}},
            {"type": "Feature",
             "geometry": {"type": "MultiPolygon", "coordinates": [
                [[[10, 10, 5], [12, 10, 5], [12, 12, 5], [10, 10, 5]]],
                [[[20, 20], [22, 20], [22, 22], [20, 20]]]
             ]},
             "properties": null}
        ]
    }"#;

    #[test]
    fn test_parse_reads_crs_member() {
        let fc = FeatureCollection::parse(SAMPLE).unwrap();
        assert_eq!(fc.crs_code().unwrap(), CrsCode::Utm { zone: 21, north: false });
    }

    #[test]
    fn test_non_polygonal_features_skipped() {
        let shapes = FeatureCollection::parse(SAMPLE).unwrap().to_shapes().unwrap();
        assert_eq!(shapes.len(), 2);
        assert_eq!(shapes[1].geometry.0.len(), 2);
    }

    #[test]
    fn test_scalar_properties_kept() {
        let shapes = FeatureCollection::parse(SAMPLE).unwrap().to_shapes().unwrap();
        let props = &shapes[0].props;
        assert_eq!(props.get("name"), Some(&PropValue::Text("villa 31".into())));
        assert_eq!(props.get("surveyed"), Some(&PropValue::Bool(true)));
        assert_eq!(props.get_f64("households"), Some(120.0));
        assert!(props.get("notes").is_none());
    }

    #[test]
    fn test_missing_crs_defaults_to_wgs84() {
        let fc =
            FeatureCollection::parse(r#"{"type": "FeatureCollection", "features": []}"#).unwrap();
        assert_eq!(fc.crs_code().unwrap(), CrsCode::Epsg4326);
    }

    #[test]
    fn test_rejects_other_document_types() {
        let err = FeatureCollection::parse(r#"{"type": "Feature", "features": []}"#).unwrap_err();
        assert!(matches!(err, MappingError::Vector(_)));
    }

    #[test]
    fn test_single_polygon_written_as_polygon() {
        let shape = ShapeWithProps::with_prob(
            mapping_common::BoundingBox::new(0.0, 0.0, 1.0, 1.0).to_multi_polygon(),
            0.7,
        );
        let fc = FeatureCollection::from_shapes(&[shape], CrsCode::Epsg4326);
        assert!(fc.crs.is_none());
        let geometry = fc.features[0].geometry.as_ref().unwrap();
        assert_eq!(geometry["type"], "Polygon");
        assert_eq!(fc.features[0].properties.as_ref().unwrap()[PROB], 0.7);
    }
}
