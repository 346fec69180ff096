//! Sliding-window scoring of rasters.

use std::path::{Path, PathBuf};

use mapping_common::{CrsCode, GeoTransform, MappingError, MappingResult, ShapeWithProps, Window};
use raster_io::{
    compute_intensity_percentiles, raster_stem, rescale_intensity, validate_rasters, GeoTiffRaster,
    RasterSource, RGB_BANDS,
};
use tiling::{sliding_windows, window_multi_polygon, CoverageContour};
use vector_io::VectorLayer;

use crate::checkpoint::{load_checkpoint, save_checkpoint};
use crate::classifier::Classifier;
use crate::config::DetectConfig;
use crate::preprocess::Tile;

/// Outcome of scoring one raster. `raster` is the file stem, the same key
/// checkpoints use.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PredictReport {
    pub raster: String,
    pub windows: usize,
    pub scored: usize,
    pub detections: usize,
    pub skipped_read_errors: usize,
    /// Strips left out of the intensity percentiles.
    pub skipped_percentile_strips: usize,
    pub batches: usize,
    /// Detections came from an existing checkpoint.
    pub from_checkpoint: bool,
}

/// Windows waiting for a classifier call.
struct Batch<'a> {
    classifier: &'a dyn Classifier,
    config: &'a DetectConfig,
    raster_crs: CrsCode,
    transform: GeoTransform,
    windows: Vec<Window>,
    tiles: Vec<Tile>,
}

impl Batch<'_> {
    fn push(&mut self, window: Window, tile: Tile) {
        self.windows.push(window);
        self.tiles.push(tile);
    }

    fn is_full(&self) -> bool {
        self.tiles.len() >= self.config.batch_size
    }

    /// Score pending tiles, append detections above the threshold and
    /// clear the batch.
    fn flush(
        &mut self,
        detections: &mut Vec<ShapeWithProps>,
        report: &mut PredictReport,
    ) -> MappingResult<()> {
        if self.tiles.is_empty() {
            return Ok(());
        }
        let scores = self.classifier.predict(&self.tiles)?;
        if scores.len() != self.tiles.len() {
            return Err(MappingError::Classifier(format!(
                "classifier returned {} scores for {} tiles",
                scores.len(),
                self.tiles.len()
            )));
        }

        let before = detections.len();
        for (window, score) in self.windows.iter().zip(&scores) {
            // In f32: a score equal to the threshold is not a detection
            if *score > self.config.threshold as f32 {
                let prob = *score as f64;
                let window_box = window_multi_polygon(window, &self.transform);
                let geometry =
                    projection::reproject(&window_box, self.raster_crs, CrsCode::Epsg4326)?;
                tracing::debug!(%window, prob, "Detection");
                detections.push(ShapeWithProps::with_prob(geometry, prob));
            }
        }

        report.scored += self.tiles.len();
        report.batches += 1;
        tracing::debug!(
            tiles = self.tiles.len(),
            detections = detections.len() - before,
            "Scored batch"
        );

        self.windows.clear();
        self.tiles.clear();
        Ok(())
    }
}

/// Score every window of `raster` and return the windows above the
/// threshold as WGS84 boxes carrying `prob`.
///
/// With a contour, windows not touching it are skipped before reading.
/// Unreadable windows are logged and skipped unless `config.strict` is set.
pub fn predict_raster(
    raster: &mut dyn RasterSource,
    classifier: &dyn Classifier,
    config: &DetectConfig,
    contour: Option<&VectorLayer>,
) -> MappingResult<(Vec<ShapeWithProps>, PredictReport)> {
    let name = raster.name();
    let raster_crs = raster.crs();
    let transform = raster.transform();

    let mut first_read_error = None;
    let mut skipped_percentile_strips = 0;
    let in_range = if config.rescale_intensity {
        let stats = compute_intensity_percentiles(
            raster,
            &RGB_BANDS,
            config.lower_cut,
            config.upper_cut,
            config.sample_stride,
        )?;
        skipped_percentile_strips = stats.skipped.len();
        let range = stats.range();
        first_read_error = stats.skipped.into_iter().next();
        Some(range)
    } else {
        None
    };

    let contour = contour
        .map(|c| CoverageContour::prepare(&c.shapes, c.crs, raster_crs))
        .transpose()?;
    let windows: Vec<Window> = sliding_windows(
        config.size,
        config.step(),
        raster.width(),
        raster.height(),
        config.boundary_policy,
    )
    .filter(|w| contour.as_ref().map_or(true, |c| c.keeps(w, &transform)))
    .collect();

    let mut report = PredictReport {
        raster: raster_stem(Path::new(&name)),
        windows: windows.len(),
        skipped_percentile_strips,
        ..Default::default()
    };
    tracing::info!(raster = %name, windows = report.windows, "Scoring raster");

    let mut batch = Batch {
        classifier,
        config,
        raster_crs,
        transform,
        windows: Vec::with_capacity(config.batch_size),
        tiles: Vec::with_capacity(config.batch_size),
    };
    let mut detections = Vec::new();

    for window in windows {
        let block = match raster.read_window(&window, &RGB_BANDS) {
            Ok(block) => block,
            Err(e) if e.is_recoverable() => {
                tracing::warn!(raster = %name, %window, error = %e, "Skipping unreadable window");
                report.skipped_read_errors += 1;
                first_read_error.get_or_insert(e);
                continue;
            }
            Err(e) => return Err(e),
        };
        let tile = config.preprocessing.apply(&rescale_intensity(&block, in_range));
        batch.push(window, tile);
        if batch.is_full() {
            batch.flush(&mut detections, &mut report)?;
        }
    }
    batch.flush(&mut detections, &mut report)?;

    report.detections = detections.len();
    tracing::info!(
        raster = %name,
        scored = report.scored,
        detections = report.detections,
        skipped_read_errors = report.skipped_read_errors,
        skipped_percentile_strips = report.skipped_percentile_strips,
        "Finished raster"
    );

    match first_read_error {
        Some(e) if config.strict => Err(e),
        _ => Ok((detections, report)),
    }
}

/// Score every raster in `paths`, in order, and concatenate the detections.
///
/// With a checkpoint directory, rasters that already have a checkpoint are
/// loaded from it, and newly scored rasters are checkpointed.
pub fn predict_rasters(
    paths: &[PathBuf],
    classifier: &dyn Classifier,
    config: &DetectConfig,
    contour: Option<&VectorLayer>,
) -> MappingResult<(Vec<ShapeWithProps>, Vec<PredictReport>)> {
    config.validate()?;
    validate_rasters(paths, config.size)?;

    let mut all = Vec::new();
    let mut reports = Vec::with_capacity(paths.len());

    for path in paths {
        let stem = raster_stem(path);

        if let Some(dir) = &config.checkpoint_dir {
            if let Some(cached) = load_checkpoint(dir, &stem)? {
                reports.push(PredictReport {
                    raster: stem,
                    detections: cached.len(),
                    from_checkpoint: true,
                    ..Default::default()
                });
                all.extend(cached);
                continue;
            }
        }

        let mut raster = GeoTiffRaster::open(path)?;
        let (detections, report) = predict_raster(&mut raster, classifier, config, contour)?;
        if let Some(dir) = &config.checkpoint_dir {
            save_checkpoint(dir, &stem, &detections)?;
        }
        all.extend(detections);
        reports.push(report);
    }

    tracing::info!(rasters = paths.len(), detections = all.len(), "Scored all rasters");
    Ok((all, reports))
}
