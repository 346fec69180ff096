//! Dataset building: tile every raster, label the windows against the
//! ground truth, balance and split them, and write the JPEG tiles.

use std::fs;
use std::path::{Path, PathBuf};

use mapping_common::{MappingError, MappingResult, Window};
use rand::rngs::StdRng;
use rand::SeedableRng;
use raster_io::{
    compute_intensity_percentiles, is_low_contrast, raster_stem, rescale_intensity,
    validate_rasters, GeoTiffRaster, RasterSource, RGB_BANDS,
};
use rayon::prelude::*;
use tiling::{sliding_windows, tile_file_name, CoverageContour, GroundTruth, WindowLabel};
use vector_io::VectorLayer;

use crate::config::TrainsetConfig;
use crate::metadata::{write_metadata, DatasetMetadata};
use crate::split::{split_dataset, Subset};
use crate::writer::{write_tile, DEFAULT_JPEG_QUALITY};

/// Outcome of processing one raster.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RasterReport {
    pub raster: String,
    /// Windows enumerated (after the contour filter).
    pub windows: usize,
    pub positives: usize,
    pub negatives: usize,
    /// Tiles written to disk.
    pub written: usize,
    pub skipped_read_errors: usize,
    pub skipped_low_contrast: usize,
    /// Strips left out of the intensity percentiles.
    pub skipped_percentile_strips: usize,
}

/// Totals over all rasters of a build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuildSummary {
    pub rasters: Vec<RasterReport>,
}

impl BuildSummary {
    pub fn written(&self) -> usize {
        self.rasters.iter().map(|r| r.written).sum()
    }

    pub fn skipped_read_errors(&self) -> usize {
        self.rasters.iter().map(|r| r.skipped_read_errors).sum()
    }

    pub fn skipped_low_contrast(&self) -> usize {
        self.rasters.iter().map(|r| r.skipped_low_contrast).sum()
    }
}

/// Seed for one raster's shuffle, independent of processing order.
pub fn raster_seed(base: u64, stem: &str) -> u64 {
    // FNV-1a
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in stem.bytes() {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(0x0100_0000_01b3);
    }
    base ^ hash
}

/// Create `{train,validation,test}/{t,f}` under `output_dir`.
pub fn create_dataset_dirs(output_dir: &Path) -> MappingResult<()> {
    for subset in Subset::ALL {
        for label in [WindowLabel::Positive, WindowLabel::Negative] {
            fs::create_dir_all(output_dir.join(subset.dir_name()).join(label.dir_name()))?;
        }
    }
    Ok(())
}

/// Builds a CNN training dataset from rasters and ground-truth polygons.
#[derive(Debug, Clone)]
pub struct CnnTrainsetBuilder {
    config: TrainsetConfig,
    rasters: Vec<PathBuf>,
    ground_truth: VectorLayer,
    contour: Option<VectorLayer>,
}

impl CnnTrainsetBuilder {
    pub fn new(rasters: Vec<PathBuf>, ground_truth: VectorLayer, config: TrainsetConfig) -> Self {
        Self {
            config,
            rasters,
            ground_truth,
            contour: None,
        }
    }

    /// Only windows touching `contour` are used.
    pub fn with_contour(mut self, contour: VectorLayer) -> Self {
        self.contour = Some(contour);
        self
    }

    pub fn config(&self) -> &TrainsetConfig {
        &self.config
    }

    /// Validate inputs, process every raster and write `metadata.json`.
    ///
    /// Rasters are processed on a rayon pool of `jobs` threads. The first
    /// fatal error from any raster aborts the build.
    pub fn build(&self, output_dir: &Path) -> MappingResult<BuildSummary> {
        self.config.validate()?;
        if self.rasters.is_empty() {
            return Err(MappingError::configuration("no rasters to process"));
        }
        validate_rasters(&self.rasters, self.config.size)?;
        create_dataset_dirs(output_dir)?;

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(self.config.jobs)
            .build()
            .map_err(|e| {
                MappingError::configuration(format!("failed to start worker pool: {}", e))
            })?;

        tracing::info!(
            rasters = self.rasters.len(),
            size = self.config.size,
            step_size = self.config.step_size,
            threads = pool.current_num_threads(),
            output = %output_dir.display(),
            "Building dataset"
        );

        let rasters = pool.install(|| {
            self.rasters
                .par_iter()
                .map(|path| {
                    let mut raster = GeoTiffRaster::open(path)?;
                    self.process_raster(&mut raster, &raster_stem(path), output_dir)
                })
                .collect::<MappingResult<Vec<_>>>()
        })?;

        write_metadata(output_dir, &DatasetMetadata::from_config(&self.config))?;

        let summary = BuildSummary { rasters };
        tracing::info!(
            written = summary.written(),
            skipped_read_errors = summary.skipped_read_errors(),
            skipped_low_contrast = summary.skipped_low_contrast(),
            "Dataset complete"
        );
        Ok(summary)
    }

    /// Tile, label, split and write one raster. Expects the dataset
    /// directories to exist.
    pub fn process_raster(
        &self,
        raster: &mut dyn RasterSource,
        stem: &str,
        output_dir: &Path,
    ) -> MappingResult<RasterReport> {
        let config = &self.config;
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

        let truth = GroundTruth::prepare(
            &self.ground_truth.shapes,
            self.ground_truth.crs,
            raster_crs,
            config.buffer_size,
            &raster.bounds(),
        )?;
        let contour = self
            .contour
            .as_ref()
            .map(|c| CoverageContour::prepare(&c.shapes, c.crs, raster_crs))
            .transpose()?;

        let windows: Vec<Window> = sliding_windows(
            config.size,
            config.step_size,
            raster.width(),
            raster.height(),
            config.boundary_policy,
        )
        .filter(|w| contour.as_ref().map_or(true, |c| c.keeps(w, &transform)))
        .collect();

        let mut report = RasterReport {
            raster: stem.to_string(),
            windows: windows.len(),
            skipped_percentile_strips,
            ..Default::default()
        };

        let (positives, negatives) = truth.partition_windows(windows, &transform);
        report.positives = positives.len();
        report.negatives = negatives.len();
        tracing::info!(
            raster = %name,
            windows = report.windows,
            positives = report.positives,
            negatives = report.negatives,
            polygons = truth.len(),
            "Labeled windows"
        );

        let mut rng = StdRng::seed_from_u64(raster_seed(config.seed, stem));
        let split = split_dataset(
            positives,
            negatives,
            config.test_size,
            config.validation_size,
            config.balancing_multiplier,
            &mut rng,
        )?;

        for subset in Subset::ALL {
            let pair = split.subset(subset);
            for (label, windows) in [
                (WindowLabel::Positive, &pair.positive),
                (WindowLabel::Negative, &pair.negative),
            ] {
                let dir = output_dir.join(subset.dir_name()).join(label.dir_name());
                for window in windows {
                    let block = match raster.read_window(window, &RGB_BANDS) {
                        Ok(block) => block,
                        Err(e) if e.is_recoverable() => {
                            tracing::warn!(
                                raster = %name,
                                %window,
                                error = %e,
                                "Skipping unreadable window"
                            );
                            report.skipped_read_errors += 1;
                            first_read_error.get_or_insert(e);
                            continue;
                        }
                        Err(e) => return Err(e),
                    };

                    let tile = rescale_intensity(&block, in_range);
                    if is_low_contrast(&tile) {
                        tracing::debug!(raster = %name, %window, "Skipping low-contrast tile");
                        report.skipped_low_contrast += 1;
                        continue;
                    }

                    let path = dir.join(tile_file_name(stem, window));
                    write_tile(&path, &tile, DEFAULT_JPEG_QUALITY)?;
                    report.written += 1;
                }
            }
        }

        tracing::info!(
            raster = %name,
            written = report.written,
            skipped_read_errors = report.skipped_read_errors,
            skipped_low_contrast = report.skipped_low_contrast,
            skipped_percentile_strips = report.skipped_percentile_strips,
            "Finished raster"
        );

        match first_read_error {
            Some(e) if config.strict => Err(e),
            _ => Ok(report),
        }
    }
}
