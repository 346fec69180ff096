//! Standalone post-processing of detection windows.
//!
//! Dissolves overlapping windows into outlines, or with `--blocks` selects
//! the reference blocks that the windows cover.

mod config;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use post_process::{dissolve, filter_by_mean_neighbor_probability, select_blocks, MergedProbability};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::DissolveConfig;

#[derive(Parser, Debug)]
#[command(name = "dissolve")]
#[command(about = "Dissolve detection windows or select the blocks they cover")]
struct Args {
    /// GeoJSON file of detection windows
    input: PathBuf,

    /// Output GeoJSON file
    output: PathBuf,

    /// YAML configuration file; flags override its values
    #[arg(short, long, env = "DISSOLVE_CONFIG")]
    config: Option<PathBuf>,

    /// GeoJSON file of blocks; selects covered blocks instead of dissolving
    #[arg(long)]
    blocks: Option<PathBuf>,

    /// Buffer applied before dissolving, in input CRS units
    #[arg(long)]
    buffer_size: Option<f64>,

    /// absorbed_mean or running_mean
    #[arg(long)]
    merged_probability: Option<MergedProbability>,

    /// Covered fraction a block needs to be selected
    #[arg(long)]
    min_coverage: Option<f64>,

    /// Filter by mean neighbor probability first, requiring this many neighbors
    #[arg(long)]
    neighbours: Option<usize>,

    /// Minimum mean neighbor probability for the filter
    #[arg(long)]
    mean_threshold: Option<f64>,

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

    let mut config = DissolveConfig::load(args.config.as_deref())?;
    let post = &mut config.post_process;
    if args.buffer_size.is_some() {
        post.buffer_size = args.buffer_size;
    }
    if let Some(v) = args.merged_probability {
        post.merged_probability = v;
    }
    if let Some(v) = args.min_coverage {
        post.min_coverage = v;
    }
    if let Some(v) = args.neighbours {
        post.neighbours = v;
        config.neighbor_filter = true;
    }
    if let Some(v) = args.mean_threshold {
        config.post_process.mean_threshold = v;
    }
    config.post_process.validate().context("Invalid configuration")?;

    let layer = vector_io::read_shapes(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    info!(shapes = layer.shapes.len(), crs = %layer.crs, "Loaded detections");

    let post = &config.post_process;
    let windows = if config.neighbor_filter {
        let (neighbours, threshold) = (post.neighbours, post.mean_threshold);
        let kept = filter_by_mean_neighbor_probability(&layer.shapes, neighbours, threshold);
        info!(before = layer.shapes.len(), after = kept.len(), "Neighbor filter applied");
        kept
    } else {
        layer.shapes
    };

    let (shapes, crs) = match &args.blocks {
        Some(path) => {
            let blocks = vector_io::read_shapes(path)
                .with_context(|| format!("Failed to read blocks {}", path.display()))?;
            let windows = projection::reproject_shapes(&windows, layer.crs, blocks.crs)
                .context("Failed to reproject windows into the blocks CRS")?;
            let selected = select_blocks(&blocks.shapes, &windows, post.min_coverage);
            info!(blocks = blocks.shapes.len(), selected = selected.len(), "Blocks selected");
            (selected, blocks.crs)
        }
        None => {
            let merged = dissolve(&windows, post.buffer_size, post.merged_probability);
            info!(before = windows.len(), after = merged.len(), "Dissolved");
            (merged, layer.crs)
        }
    };

    vector_io::write_shapes(&args.output, &shapes, crs)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!(shapes = shapes.len(), output = %args.output.display(), "Done");
    Ok(())
}
