//! Settlement detection.
//!
//! Scores sliding windows over every GeoTIFF in a directory with a served
//! classifier, filters and dissolves the detections, and writes them as a
//! WGS84 GeoJSON file.

mod config;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Parser;
use detection::{HttpClassifier, Preprocessing};
use mapping_common::CrsCode;
use post_process::MergedProbability;
use tiling::BoundaryPolicy;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::ServiceConfig;

#[derive(Parser, Debug)]
#[command(name = "detect")]
#[command(about = "Detect settlements in rasters with a served CNN classifier")]
struct Args {
    /// Prediction endpoint of the classifier
    #[arg(env = "CLASSIFIER_URL")]
    model_url: String,

    /// Raster file or directory searched recursively for GeoTIFFs
    input_dir: PathBuf,

    /// Output GeoJSON file
    output: PathBuf,

    /// YAML configuration with `detect` and `post_process` sections
    #[arg(short, long, env = "DETECT_CONFIG")]
    config: Option<PathBuf>,

    /// Training dataset whose metadata supplies window size and rescaling
    #[arg(long)]
    dataset_dir: Option<PathBuf>,

    /// Window size in pixels
    #[arg(long)]
    size: Option<usize>,

    /// Step between windows in pixels (defaults to the window size)
    #[arg(long)]
    step_size: Option<usize>,

    /// Windows scoring above this are detections
    #[arg(long)]
    threshold: Option<f64>,

    /// Tiles per classifier request
    #[arg(long)]
    batch_size: Option<usize>,

    /// Score raw pixel values instead of percentile-stretched ones
    #[arg(long)]
    no_rescale_intensity: bool,

    #[arg(long)]
    lower_cut: Option<f64>,

    #[arg(long)]
    upper_cut: Option<f64>,

    /// identity, unit_scale or symmetric
    #[arg(long)]
    preprocessing: Option<Preprocessing>,

    /// strict_stride or clip_to_bounds
    #[arg(long)]
    boundary_policy: Option<BoundaryPolicy>,

    /// GeoJSON area of interest; windows outside it are not scored
    #[arg(long)]
    contour: Option<PathBuf>,

    /// Directory caching per-raster detections between runs
    #[arg(long, env = "DETECT_CHECKPOINT_DIR")]
    checkpoint_dir: Option<PathBuf>,

    /// Classifier request timeout in seconds
    #[arg(long, default_value = "120")]
    timeout_secs: u64,

    /// Fail when any window of a raster could not be read
    #[arg(long)]
    strict: bool,

    /// Neighbors a detection needs to keep a non-zero mean
    #[arg(long)]
    neighbours: Option<usize>,

    /// Minimum mean neighbor probability
    #[arg(long)]
    mean_threshold: Option<f64>,

    /// Buffer applied before dissolving, in degrees
    #[arg(long)]
    buffer_size: Option<f64>,

    /// absorbed_mean or running_mean
    #[arg(long)]
    merged_probability: Option<MergedProbability>,

    /// Write raw window detections without filtering or dissolving
    #[arg(long)]
    skip_post_process: bool,

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

fn resolve_config(args: &Args) -> Result<ServiceConfig> {
    let mut config = ServiceConfig::load(args.config.as_deref())?;

    if let Some(dir) = &args.dataset_dir {
        let metadata = trainset::read_metadata(dir)
            .with_context(|| format!("Failed to read dataset metadata in {}", dir.display()))?;
        info!(
            size = metadata.size,
            rescale = metadata.rescale_intensity,
            "Using dataset parameters"
        );
        config.apply_metadata(&metadata);
    }

    let detect = &mut config.detect;
    if let Some(v) = args.size {
        detect.size = v;
    }
    if args.step_size.is_some() {
        detect.step_size = args.step_size;
    }
    if let Some(v) = args.threshold {
        detect.threshold = v;
    }
    if let Some(v) = args.batch_size {
        detect.batch_size = v;
    }
    if args.no_rescale_intensity {
        detect.rescale_intensity = false;
    }
    if let Some(v) = args.lower_cut {
        detect.lower_cut = v;
    }
    if let Some(v) = args.upper_cut {
        detect.upper_cut = v;
    }
    if let Some(v) = args.preprocessing {
        detect.preprocessing = v;
    }
    if let Some(v) = args.boundary_policy {
        detect.boundary_policy = v;
    }
    if args.checkpoint_dir.is_some() {
        detect.checkpoint_dir = args.checkpoint_dir.clone();
    }
    if args.strict {
        detect.strict = true;
    }

    let post = &mut config.post_process;
    if let Some(v) = args.neighbours {
        post.neighbours = v;
    }
    if let Some(v) = args.mean_threshold {
        post.mean_threshold = v;
    }
    if args.buffer_size.is_some() {
        post.buffer_size = args.buffer_size;
    }
    if let Some(v) = args.merged_probability {
        post.merged_probability = v;
    }

    config.detect.validate().context("Invalid detect configuration")?;
    config.post_process.validate().context("Invalid post-process configuration")?;
    Ok(config)
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_tracing(&args.log_level, args.log_json);

    let config = resolve_config(&args)?;
    info!(?config, model_url = %args.model_url, "Starting detection");

    let rasters = raster_io::all_raster_files(&args.input_dir)
        .with_context(|| format!("Failed to list rasters in {}", args.input_dir.display()))?;
    if rasters.is_empty() {
        bail!("No GeoTIFF files found in {}", args.input_dir.display());
    }

    let contour = args
        .contour
        .as_ref()
        .map(|path| {
            vector_io::read_shapes(path)
                .with_context(|| format!("Failed to read contour {}", path.display()))
        })
        .transpose()?;

    let timeout = std::time::Duration::from_secs(args.timeout_secs);
    let classifier = HttpClassifier::with_timeout(&args.model_url, timeout)?;
    let (detections, reports) =
        detection::predict_rasters(&rasters, &classifier, &config.detect, contour.as_ref())
            .context("Inference failed")?;

    let cached = reports.iter().filter(|r| r.from_checkpoint).count();
    let skipped: usize = reports.iter().map(|r| r.skipped_read_errors).sum();
    let strips: usize = reports.iter().map(|r| r.skipped_percentile_strips).sum();
    info!(
        rasters = reports.len(),
        from_checkpoint = cached,
        skipped_read_errors = skipped,
        skipped_percentile_strips = strips,
        detections = detections.len(),
        "Inference complete"
    );

    let shapes = if args.skip_post_process {
        detections
    } else {
        let shapes = post_process::post_process(&detections, &config.post_process);
        info!(before = detections.len(), after = shapes.len(), "Post-processing complete");
        shapes
    };

    vector_io::write_shapes(&args.output, &shapes, CrsCode::Epsg4326)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(shapes = shapes.len(), output = %args.output.display(), "Done");
    Ok(())
}
