//! Per-raster detection checkpoints.
//!
//! A raster whose checkpoint file exists is not rescored. The file's
//! presence is the only signal; its contents are trusted as written.

use std::path::{Path, PathBuf};

use mapping_common::{CrsCode, MappingResult, ShapeWithProps};

pub fn checkpoint_path(dir: &Path, raster_stem: &str) -> PathBuf {
    dir.join(format!("{}.geojson", raster_stem))
}

/// Cached detections for `raster_stem`, if a checkpoint exists.
pub fn load_checkpoint(
    dir: &Path,
    raster_stem: &str,
) -> MappingResult<Option<Vec<ShapeWithProps>>> {
    let path = checkpoint_path(dir, raster_stem);
    if !path.exists() {
        return Ok(None);
    }
    let layer = vector_io::read_shapes(&path)?;
    let shapes = projection::reproject_shapes(&layer.shapes, layer.crs, CrsCode::Epsg4326)?;
    tracing::info!(path = %path.display(), detections = shapes.len(), "Loaded checkpoint");
    Ok(Some(shapes))
}

/// Store WGS84 detections for `raster_stem`.
pub fn save_checkpoint(
    dir: &Path,
    raster_stem: &str,
    shapes: &[ShapeWithProps],
) -> MappingResult<()> {
    let path = checkpoint_path(dir, raster_stem);
    vector_io::write_shapes(&path, shapes, CrsCode::Epsg4326)?;
    tracing::debug!(path = %path.display(), detections = shapes.len(), "Saved checkpoint");
    Ok(())
}
