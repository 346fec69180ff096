//! Inference over in-memory rasters and GeoTIFFs with stub classifiers.

use std::cell::Cell;

use detection::{checkpoint_path, predict_raster, predict_rasters, DetectConfig, Tile};
use mapping_common::{
    BoundingBox, CrsCode, GeoTransform, MappingError, MappingResult, ShapeWithProps, Window,
};
use raster_io::{MemoryRaster, PixelBlock};
use test_utils::{assert_approx_eq, to_f32, write_rgb_geotiff, GeoTiffOptions};
use vector_io::VectorLayer;

const WEST: f64 = -58.5;
const NORTH: f64 = -34.5;
const PIXEL: f64 = 0.001;

/// 8x8 image, white on the left half and black on the right.
fn half_bright() -> Vec<u8> {
    let mut pixels = Vec::with_capacity(8 * 8 * 3);
    for _row in 0..8 {
        for col in 0..8 {
            let v = if col < 4 { 255 } else { 0 };
            pixels.extend_from_slice(&[v, v, v]);
        }
    }
    pixels
}

fn raster() -> MemoryRaster {
    let block = PixelBlock::new(8, 8, 3, to_f32(&half_bright())).unwrap();
    MemoryRaster::new(
        "half",
        block,
        CrsCode::Epsg4326,
        GeoTransform::from_origin(WEST, NORTH, PIXEL, PIXEL),
    )
}

fn config() -> DetectConfig {
    DetectConfig {
        size: 4,
        rescale_intensity: false,
        ..Default::default()
    }
}

/// Scores a tile with its mean normalized value.
fn mean_value(batch: &[Tile]) -> MappingResult<Vec<f32>> {
    Ok(batch
        .iter()
        .map(|t| t.data.iter().sum::<f32>() / t.data.len() as f32)
        .collect())
}

// ============================================================================
// Single raster
// ============================================================================

#[test]
fn test_bright_windows_are_detections() {
    let (detections, report) = predict_raster(&mut raster(), &mean_value, &config(), None).unwrap();

    assert_eq!(report.windows, 4);
    assert_eq!(report.scored, 4);
    assert_eq!(detections.len(), 2);
    assert!(detections.iter().all(|d| d.prob() == Some(1.0)));

    let bbox = detections[0].bounding_box().unwrap();
    assert_approx_eq!(bbox.min_x, WEST, 1e-9);
    assert_approx_eq!(bbox.max_x, WEST + 4.0 * PIXEL, 1e-9);
    assert_approx_eq!(bbox.max_y, NORTH, 1e-9);
    assert_approx_eq!(bbox.min_y, NORTH - 4.0 * PIXEL, 1e-9);
}

#[test]
fn test_score_equal_to_threshold_is_not_a_detection() {
    let at_threshold = |batch: &[Tile]| -> MappingResult<Vec<f32>> { Ok(vec![0.3; batch.len()]) };
    let (detections, _) = predict_raster(&mut raster(), &at_threshold, &config(), None).unwrap();
    assert!(detections.is_empty());
}

#[test]
fn test_batches_respect_batch_size() {
    let calls = Cell::new(0);
    let sizes = std::cell::RefCell::new(Vec::new());
    let counting = |batch: &[Tile]| -> MappingResult<Vec<f32>> {
        calls.set(calls.get() + 1);
        sizes.borrow_mut().push(batch.len());
        mean_value(batch)
    };
    let config = DetectConfig {
        batch_size: 3,
        ..config()
    };
    let (_, report) = predict_raster(&mut raster(), &counting, &config, None).unwrap();

    assert_eq!(calls.get(), 2);
    assert_eq!(report.batches, 2);
    assert_eq!(*sizes.borrow(), vec![3, 1]);
}

#[test]
fn test_step_size_overlaps_windows() {
    let config = DetectConfig {
        step_size: Some(2),
        ..config()
    };
    let (detections, report) = predict_raster(&mut raster(), &mean_value, &config, None).unwrap();
    // 3x3 windows; the middle column straddles both halves, scores 0.5 and is kept
    assert_eq!(report.windows, 9);
    assert_eq!(detections.len(), 6);
}

#[test]
fn test_unreadable_window_skipped() {
    let mut raster = raster().with_unreadable_window(Window::square(0, 0, 4));
    let (detections, report) = predict_raster(&mut raster, &mean_value, &config(), None).unwrap();
    assert_eq!(report.skipped_read_errors, 1);
    assert_eq!(report.scored, 3);
    assert_eq!(detections.len(), 1);
}

#[test]
fn test_strict_mode_fails_on_unreadable_window() {
    let mut raster = raster().with_unreadable_window(Window::square(0, 0, 4));
    let config = DetectConfig {
        strict: true,
        ..config()
    };
    let err = predict_raster(&mut raster, &mean_value, &config, None).unwrap_err();
    assert!(matches!(err, MappingError::RasterRead { .. }));
}

/// 8 columns by 300 rows, so percentiles are sampled in two strips.
fn tall_raster() -> MemoryRaster {
    let data: Vec<f32> = (0..8 * 300).flat_map(|i| [(i % 256) as f32; 3]).collect();
    MemoryRaster::new(
        "tall",
        PixelBlock::new(8, 300, 3, data).unwrap(),
        CrsCode::Epsg4326,
        GeoTransform::from_origin(WEST, NORTH, PIXEL, PIXEL),
    )
}

#[test]
fn test_unreadable_percentile_strip_does_not_fail_raster() {
    let mut raster = tall_raster().with_unreadable_window(Window::new(0, 256, 8, 44));
    let config = DetectConfig {
        rescale_intensity: true,
        ..config()
    };
    let (_, report) = predict_raster(&mut raster, &mean_value, &config, None).unwrap();

    assert_eq!(report.skipped_percentile_strips, 1);
    assert_eq!(report.skipped_read_errors, 0);
    assert_eq!(report.windows, 150);
    assert_eq!(report.scored, 150);
}

#[test]
fn test_strict_mode_fails_on_unreadable_percentile_strip() {
    let mut raster = tall_raster().with_unreadable_window(Window::new(0, 256, 8, 44));
    let config = DetectConfig {
        rescale_intensity: true,
        strict: true,
        ..config()
    };
    let err = predict_raster(&mut raster, &mean_value, &config, None).unwrap_err();
    assert!(matches!(err, MappingError::RasterRead { window, .. } if window.row_off == 256));
}

#[test]
fn test_classifier_error_propagates() {
    let failing = |_: &[Tile]| -> MappingResult<Vec<f32>> {
        Err(MappingError::Classifier("model offline".into()))
    };
    let err = predict_raster(&mut raster(), &failing, &config(), None).unwrap_err();
    assert!(matches!(err, MappingError::Classifier(_)));
}

#[test]
fn test_short_score_vector_is_an_error() {
    let short = |_: &[Tile]| -> MappingResult<Vec<f32>> { Ok(vec![1.0]) };
    assert!(predict_raster(&mut raster(), &short, &config(), None).is_err());
}

#[test]
fn test_contour_skips_windows_before_scoring() {
    // Top-left window only
    let contour = VectorLayer {
        shapes: vec![ShapeWithProps::new(
            BoundingBox::new(WEST + 0.001, NORTH - 0.003, WEST + 0.002, NORTH - 0.001)
                .to_multi_polygon(),
            Default::default(),
        )],
        crs: CrsCode::Epsg4326,
    };
    let (detections, report) =
        predict_raster(&mut raster(), &mean_value, &config(), Some(&contour)).unwrap();
    assert_eq!(report.windows, 1);
    assert_eq!(detections.len(), 1);
}

// ============================================================================
// Multiple rasters and checkpoints
// ============================================================================

#[test]
fn test_checkpoint_skips_rescoring() {
    let inputs = tempfile::tempdir().unwrap();
    let checkpoints = tempfile::tempdir().unwrap();
    let options = GeoTiffOptions {
        epsg: 4326,
        west: WEST,
        north: NORTH,
        pixel_size: PIXEL,
        rows_per_strip: 4,
    };
    let path = inputs.path().join("scene.tif");
    write_rgb_geotiff(&path, 8, 8, &half_bright(), &options).unwrap();

    let config = DetectConfig {
        size: 4,
        checkpoint_dir: Some(checkpoints.path().to_path_buf()),
        ..Default::default()
    };

    let (first, reports) = predict_rasters(&[path.clone()], &mean_value, &config, None).unwrap();
    assert_eq!(first.len(), 2);
    assert!(!reports[0].from_checkpoint);
    assert_eq!(reports[0].raster, "scene");
    assert!(checkpoint_path(checkpoints.path(), "scene").exists());

    let never = |_: &[Tile]| -> MappingResult<Vec<f32>> {
        Err(MappingError::Classifier("should not be called".into()))
    };
    let (second, reports) = predict_rasters(&[path], &never, &config, None).unwrap();
    assert!(reports[0].from_checkpoint);
    assert_eq!(reports[0].raster, "scene");
    assert_eq!(second, first);
}

#[test]
fn test_same_stem_in_two_directories_rejected_before_scoring() {
    let inputs = tempfile::tempdir().unwrap();
    let checkpoints = tempfile::tempdir().unwrap();
    let mut paths = Vec::new();
    for (dir, west) in [("a", WEST), ("b", 10.0)] {
        let options = GeoTiffOptions {
            epsg: 4326,
            west,
            north: NORTH,
            pixel_size: PIXEL,
            rows_per_strip: 4,
        };
        std::fs::create_dir_all(inputs.path().join(dir)).unwrap();
        let path = inputs.path().join(dir).join("scene.tif");
        write_rgb_geotiff(&path, 8, 8, &half_bright(), &options).unwrap();
        paths.push(path);
    }

    let config = DetectConfig {
        size: 4,
        checkpoint_dir: Some(checkpoints.path().to_path_buf()),
        ..Default::default()
    };
    let calls = Cell::new(0);
    let counting = |batch: &[Tile]| -> MappingResult<Vec<f32>> {
        calls.set(calls.get() + 1);
        mean_value(batch)
    };

    let err = predict_rasters(&paths, &counting, &config, None).unwrap_err();
    assert!(matches!(err, MappingError::Validation { ref field, .. } if field == "file stem"));
    assert_eq!(calls.get(), 0);
    assert!(!checkpoint_path(checkpoints.path(), "scene").exists());
}

#[test]
fn test_predict_rasters_validates_config() {
    let config = DetectConfig {
        threshold: 2.0,
        ..config()
    };
    let err = predict_rasters(&[], &mean_value, &config, None).unwrap_err();
    assert!(matches!(err, MappingError::Configuration(_)));
}
