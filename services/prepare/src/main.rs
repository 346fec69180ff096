//! Training dataset builder.
//!
//! Tiles a directory of GeoTIFFs, labels each window against ground-truth
//! polygons, and writes a balanced train/validation/test JPEG dataset.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tiling::BoundaryPolicy;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};
use trainset::CnnTrainsetBuilder;

#[derive(Parser, Debug)]
#[command(name = "prepare")]
#[command(about = "Build a CNN training dataset from rasters and ground-truth polygons")]
struct Args {
    /// Raster file or directory searched recursively for GeoTIFFs
    rasters: PathBuf,

    /// GeoJSON file of ground-truth polygons
    vector: PathBuf,

    /// Output dataset directory
    output_dir: PathBuf,

    /// YAML configuration file; flags override its values
    #[arg(short, long, env = "PREPARE_CONFIG")]
    config: Option<PathBuf>,

    /// GeoJSON area of interest; windows outside it are ignored
    #[arg(long)]
    contour: Option<PathBuf>,

    /// Window size in pixels
    #[arg(long)]
    size: Option<usize>,

    /// Step between windows in pixels
    #[arg(long)]
    step_size: Option<usize>,

    /// Buffer applied to ground-truth polygons (raster CRS units)
    #[arg(long)]
    buffer_size: Option<f64>,

    /// Write raw pixel values instead of percentile-stretched ones
    #[arg(long)]
    no_rescale_intensity: bool,

    /// Lower percentile cut for intensity rescaling
    #[arg(long)]
    lower_cut: Option<f64>,

    /// Upper percentile cut for intensity rescaling
    #[arg(long)]
    upper_cut: Option<f64>,

    /// Sample every n-th pixel when computing percentiles
    #[arg(long)]
    sample_stride: Option<usize>,

    /// Fraction of each class used for testing
    #[arg(long)]
    test_size: Option<f64>,

    /// Fraction of each class used for validation
    #[arg(long)]
    validation_size: Option<f64>,

    /// Negative samples per positive sample
    #[arg(long)]
    balancing_multiplier: Option<f64>,

    /// strict_stride or clip_to_bounds
    #[arg(long)]
    boundary_policy: Option<BoundaryPolicy>,

    /// Shuffle seed
    #[arg(long, env = "PREPARE_SEED")]
    seed: Option<u64>,

    /// Rasters processed in parallel (0 = one per CPU)
    #[arg(short, long, env = "PREPARE_JOBS")]
    jobs: Option<usize>,

    /// Fail when any window of a raster could not be read
    #[arg(long)]
    strict: bool,

    /// Log level
    #[arg(long, default_value = "info", env = "RUST_LOG")]
    log_level: String,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    let builder = fmt().with_env_filter(filter).with_target(true).with_level(true);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    let mut config = config::load_config(args.config.as_deref())?;
    if let Some(v) = args.size {
        config.size = v;
    }
    if let Some(v) = args.step_size {
        config.step_size = v;
    }
    if let Some(v) = args.buffer_size {
        config.buffer_size = v;
    }
    if args.no_rescale_intensity {
        config.rescale_intensity = false;
    }
    if let Some(v) = args.lower_cut {
        config.lower_cut = v;
    }
    if let Some(v) = args.upper_cut {
        config.upper_cut = v;
    }
    if let Some(v) = args.sample_stride {
        config.sample_stride = v;
    }
    if let Some(v) = args.test_size {
        config.test_size = v;
    }
    if let Some(v) = args.validation_size {
        config.validation_size = v;
    }
    if let Some(v) = args.balancing_multiplier {
        config.balancing_multiplier = v;
    }
    if let Some(v) = args.boundary_policy {
        config.boundary_policy = v;
    }
    if let Some(v) = args.seed {
        config.seed = v;
    }
    if let Some(v) = args.jobs {
        config.jobs = v;
    }
    if args.strict {
        config.strict = true;
    }
    config.validate().context("Invalid configuration")?;

    info!(?config, "Starting dataset build");

    let rasters = raster_io::all_raster_files(&args.rasters)
        .with_context(|| format!("Failed to list rasters in {}", args.rasters.display()))?;
    if rasters.is_empty() {
        bail!("No GeoTIFF files found in {}", args.rasters.display());
    }

    let ground_truth = vector_io::read_shapes(&args.vector)
        .with_context(|| format!("Failed to read ground truth {}", args.vector.display()))?;
    let mut builder = CnnTrainsetBuilder::new(rasters, ground_truth, config);
    if let Some(contour) = &args.contour {
        let layer = vector_io::read_shapes(contour)
            .with_context(|| format!("Failed to read contour {}", contour.display()))?;
        builder = builder.with_contour(layer);
    }

    let summary = builder
        .build(&args.output_dir)
        .with_context(|| format!("Failed to build dataset in {}", args.output_dir.display()))?;

    info!(
        rasters = summary.rasters.len(),
        written = summary.written(),
        skipped_read_errors = summary.skipped_read_errors(),
        skipped_low_contrast = summary.skipped_low_contrast(),
        output = %args.output_dir.display(),
        "Done"
    );
    Ok(())
}
