//! File-level GeoJSON round trips.

use geo::{Area, MultiPolygon, Polygon};
use mapping_common::{BoundingBox, CrsCode, Props, ShapeWithProps, PROB, PROB_MEAN};
use test_utils::{assert_approx_eq, detections, unit_box_grid};
use vector_io::{read_shapes, write_shapes};

#[test]
fn test_detections_roundtrip() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out/detections.geojson");

    let shapes: Vec<ShapeWithProps> = detections(&unit_box_grid(2, 2), &[0.4, 0.6, 0.8, 0.35])
        .into_iter()
        .map(|s| s.with_prop(PROB_MEAN, 0.5))
        .collect();
    write_shapes(&path, &shapes, CrsCode::Epsg4326).unwrap();

    let layer = read_shapes(&path).unwrap();
    assert_eq!(layer.crs, CrsCode::Epsg4326);
    assert_eq!(layer.shapes, shapes);
}

#[test]
fn test_projected_layer_keeps_crs_and_holes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("truth.geojson");

    let outer = BoundingBox::new(0.0, 0.0, 10.0, 10.0).to_polygon();
    let hole = BoundingBox::new(2.0, 2.0, 4.0, 4.0).to_polygon();
    let with_hole = Polygon::new(outer.exterior().clone(), vec![hole.exterior().clone()]);
    let second = BoundingBox::new(20.0, 0.0, 21.0, 1.0).to_polygon();
    let shape = ShapeWithProps::new(
        MultiPolygon::new(vec![with_hole, second]),
        Props::new().with("name", "block 7"),
    );

    let utm = CrsCode::Utm { zone: 21, north: false };
    write_shapes(&path, &[shape], utm).unwrap();

    let layer = read_shapes(&path).unwrap();
    assert_eq!(layer.crs, utm);
    assert_eq!(layer.shapes.len(), 1);
    assert_approx_eq!(layer.shapes[0].geometry.unsigned_area(), 100.0 - 4.0 + 1.0, 1e-9);
    assert!(layer.shapes[0].props.get_f64(PROB).is_none());
}

#[test]
fn test_missing_file_is_io_error() {
    let err = read_shapes("/nonexistent/truth.geojson").unwrap_err();
    assert!(matches!(err, mapping_common::MappingError::Io(_)));
}
