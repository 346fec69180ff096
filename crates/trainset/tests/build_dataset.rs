//! Dataset building over in-memory rasters and synthetic GeoTIFFs.

use std::fs;
use std::path::Path;

use mapping_common::{BoundingBox, CrsCode, GeoTransform, MappingError, ShapeWithProps, Window};
use raster_io::{MemoryRaster, PixelBlock};
use test_utils::{create_checkerboard, create_solid_rgb, to_f32, write_rgb_geotiff, GeoTiffOptions};
use trainset::{create_dataset_dirs, read_metadata, CnnTrainsetBuilder, TrainsetConfig};
use vector_io::{read_shapes, write_shapes, VectorLayer};

fn memory_raster(pixels: &[u8], width: usize, height: usize) -> MemoryRaster {
    let block = PixelBlock::new(width, height, 3, to_f32(pixels)).unwrap();
    MemoryRaster::new("memory", block, CrsCode::Epsg3857, GeoTransform::identity())
}

/// Ground truth covering the two top-left 2x2 windows of an identity raster.
/// The third window only touches it.
fn top_left_truth() -> VectorLayer {
    VectorLayer {
        shapes: vec![ShapeWithProps::new(
            BoundingBox::new(0.0, 0.0, 4.0, 2.0).to_multi_polygon(),
            Default::default(),
        )],
        crs: CrsCode::Epsg3857,
    }
}

fn small_config() -> TrainsetConfig {
    TrainsetConfig {
        size: 2,
        step_size: 2,
        rescale_intensity: false,
        test_size: 0.0,
        validation_size: 0.0,
        ..Default::default()
    }
}

fn jpgs_in(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|n| n.ends_with(".jpg"))
        .collect();
    names.sort();
    names
}

// ============================================================================
// Per-raster processing
// ============================================================================

#[test]
fn test_positive_windows_written_to_t() {
    let out = tempfile::tempdir().unwrap();
    create_dataset_dirs(out.path()).unwrap();
    let builder = CnnTrainsetBuilder::new(Vec::new(), top_left_truth(), small_config());

    let mut raster = memory_raster(&create_checkerboard(8, 8, 1), 8, 8);
    let report = builder.process_raster(&mut raster, "scene", out.path()).unwrap();

    assert_eq!(report.windows, 16);
    assert_eq!(report.positives, 2);
    assert_eq!(report.negatives, 14);
    assert_eq!(report.written, 4);
    assert_eq!(
        jpgs_in(&out.path().join("train/t")),
        vec!["scene__0_0.jpg".to_string(), "scene__0_2.jpg".to_string()]
    );
    assert_eq!(jpgs_in(&out.path().join("train/f")).len(), 2);
    assert!(jpgs_in(&out.path().join("test/t")).is_empty());
}

#[test]
fn test_unreadable_window_is_skipped() {
    let out = tempfile::tempdir().unwrap();
    create_dataset_dirs(out.path()).unwrap();
    let builder = CnnTrainsetBuilder::new(Vec::new(), top_left_truth(), small_config());

    let mut raster = memory_raster(&create_checkerboard(8, 8, 1), 8, 8)
        .with_unreadable_window(Window::square(0, 0, 2));
    let report = builder.process_raster(&mut raster, "scene", out.path()).unwrap();

    assert_eq!(report.skipped_read_errors, 1);
    assert_eq!(report.written, 3);
    assert_eq!(jpgs_in(&out.path().join("train/t")), vec!["scene__0_2.jpg".to_string()]);
}

#[test]
fn test_strict_mode_fails_on_read_error() {
    let out = tempfile::tempdir().unwrap();
    create_dataset_dirs(out.path()).unwrap();
    let config = TrainsetConfig {
        strict: true,
        ..small_config()
    };
    let builder = CnnTrainsetBuilder::new(Vec::new(), top_left_truth(), config);

    let mut raster = memory_raster(&create_checkerboard(8, 8, 1), 8, 8)
        .with_unreadable_window(Window::square(0, 0, 2));
    let err = builder.process_raster(&mut raster, "scene", out.path()).unwrap_err();
    assert!(matches!(err, MappingError::RasterRead { .. }));
}

#[test]
fn test_unreadable_percentile_strip_is_left_out() {
    let out = tempfile::tempdir().unwrap();
    create_dataset_dirs(out.path()).unwrap();
    let config = TrainsetConfig {
        rescale_intensity: true,
        ..small_config()
    };
    let builder = CnnTrainsetBuilder::new(Vec::new(), top_left_truth(), config);

    // Percentiles are sampled in 256-row strips; the second one fails.
    let mut raster = memory_raster(&create_checkerboard(8, 300, 1), 8, 300)
        .with_unreadable_window(Window::new(0, 256, 8, 44));
    let report = builder.process_raster(&mut raster, "tall", out.path()).unwrap();

    assert_eq!(report.skipped_percentile_strips, 1);
    assert_eq!(report.skipped_read_errors, 0);
    assert_eq!(report.positives, 2);
    assert_eq!(jpgs_in(&out.path().join("train/t")).len(), 2);
}

#[test]
fn test_low_contrast_tiles_skipped() {
    let out = tempfile::tempdir().unwrap();
    create_dataset_dirs(out.path()).unwrap();
    let builder = CnnTrainsetBuilder::new(Vec::new(), top_left_truth(), small_config());

    let mut raster = memory_raster(&create_solid_rgb(8, 8, [90, 120, 60]), 8, 8);
    let report = builder.process_raster(&mut raster, "flat", out.path()).unwrap();

    assert_eq!(report.written, 0);
    assert_eq!(report.skipped_low_contrast, 4);
}

#[test]
fn test_contour_limits_windows() {
    let out = tempfile::tempdir().unwrap();
    create_dataset_dirs(out.path()).unwrap();
    let contour = VectorLayer {
        // Strictly inside the left half
        shapes: vec![ShapeWithProps::new(
            BoundingBox::new(0.5, 0.5, 3.5, 7.5).to_multi_polygon(),
            Default::default(),
        )],
        crs: CrsCode::Epsg3857,
    };
    let builder =
        CnnTrainsetBuilder::new(Vec::new(), top_left_truth(), small_config()).with_contour(contour);

    let mut raster = memory_raster(&create_checkerboard(8, 8, 1), 8, 8);
    let report = builder.process_raster(&mut raster, "scene", out.path()).unwrap();
    assert_eq!(report.windows, 8);
    assert_eq!(report.positives, 2);
}

#[test]
fn test_same_seed_picks_same_negatives() {
    let run = || {
        let out = tempfile::tempdir().unwrap();
        create_dataset_dirs(out.path()).unwrap();
        let builder = CnnTrainsetBuilder::new(Vec::new(), top_left_truth(), small_config());
        let mut raster = memory_raster(&create_checkerboard(8, 8, 1), 8, 8);
        builder.process_raster(&mut raster, "scene", out.path()).unwrap();
        jpgs_in(&out.path().join("train/f"))
    };
    assert_eq!(run(), run());
}

// ============================================================================
// Full build from files
// ============================================================================

fn write_inputs(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let raster_path = dir.join("scene.tif");
    let pixels = create_checkerboard(32, 32, 2);
    write_rgb_geotiff(&raster_path, 32, 32, &pixels, &GeoTiffOptions::default()).unwrap();

    // Top-left 16x16 pixels of the default georeferencing
    let truth = ShapeWithProps::new(
        BoundingBox::new(300_000.0, 6_199_984.0, 300_016.0, 6_200_000.0).to_multi_polygon(),
        Default::default(),
    );
    let truth_path = dir.join("truth.geojson");
    write_shapes(&truth_path, &[truth], CrsCode::Utm { zone: 21, north: false }).unwrap();
    (raster_path, truth_path)
}

#[test]
fn test_build_writes_split_layout_and_metadata() {
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (raster_path, truth_path) = write_inputs(inputs.path());

    let config = TrainsetConfig {
        size: 8,
        step_size: 8,
        ..Default::default()
    };
    let truth = read_shapes(&truth_path).unwrap();
    let builder = CnnTrainsetBuilder::new(vec![raster_path], truth, config);
    let summary = builder.build(out.path()).unwrap();

    let report = &summary.rasters[0];
    assert_eq!((report.windows, report.positives, report.negatives), (16, 4, 12));
    assert_eq!(summary.written(), 8);

    for subset in ["test", "validation"] {
        assert_eq!(jpgs_in(&out.path().join(subset).join("t")).len(), 1);
        assert_eq!(jpgs_in(&out.path().join(subset).join("f")).len(), 1);
    }
    assert_eq!(jpgs_in(&out.path().join("train/t")).len(), 2);
    assert_eq!(jpgs_in(&out.path().join("train/f")).len(), 2);

    let metadata = read_metadata(out.path()).unwrap();
    assert_eq!(metadata.size, 8);
    assert_eq!(metadata.step_size, 8);
    assert!(metadata.rescale_intensity);
}

#[test]
fn test_build_rejects_duplicate_stems_before_writing() {
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (raster_path, truth_path) = write_inputs(inputs.path());
    let mut rasters = Vec::new();
    for dir in ["a", "b"] {
        fs::create_dir_all(inputs.path().join(dir)).unwrap();
        let path = inputs.path().join(dir).join("scene.tif");
        fs::copy(&raster_path, &path).unwrap();
        rasters.push(path);
    }

    let config = TrainsetConfig {
        size: 8,
        step_size: 8,
        ..Default::default()
    };
    let builder = CnnTrainsetBuilder::new(rasters, read_shapes(&truth_path).unwrap(), config);
    let err = builder.build(out.path()).unwrap_err();
    assert!(matches!(err, MappingError::Validation { ref field, .. } if field == "file stem"));
    assert!(!out.path().join("metadata.json").exists());
}

#[test]
fn test_build_rejects_window_larger_than_raster() {
    let inputs = tempfile::tempdir().unwrap();
    let out = tempfile::tempdir().unwrap();
    let (raster_path, truth_path) = write_inputs(inputs.path());

    let config = TrainsetConfig {
        size: 64,
        step_size: 64,
        ..Default::default()
    };
    let truth = read_shapes(&truth_path).unwrap();
    let builder = CnnTrainsetBuilder::new(vec![raster_path], truth, config);
    let err = builder.build(out.path()).unwrap_err();
    assert!(matches!(err, MappingError::Configuration(_)));
    assert!(!out.path().join("metadata.json").exists());
}

#[test]
fn test_build_rejects_invalid_config_before_reading() {
    let out = tempfile::tempdir().unwrap();
    let config = TrainsetConfig {
        balancing_multiplier: 0.0,
        ..Default::default()
    };
    let builder = CnnTrainsetBuilder::new(vec!["missing.tif".into()], top_left_truth(), config);
    assert!(matches!(builder.build(out.path()), Err(MappingError::Configuration(_))));
}
