//! Pre-flight checks run on every input raster before any tiling starts.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use mapping_common::{CrsCode, MappingError, MappingResult};

use crate::discovery::raster_stem;
use crate::geotiff::GeoTiffRaster;
use crate::source::RasterSource;

/// Minimum number of bands: windows are read as RGB.
pub const MIN_BANDS: usize = 3;

/// Shape and CRS of one raster, as seen by the pre-flight check.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterInfo {
    pub path: PathBuf,
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub crs: CrsCode,
}

impl RasterInfo {
    pub fn of(path: impl Into<PathBuf>, raster: &dyn RasterSource) -> Self {
        Self {
            path: path.into(),
            width: raster.width(),
            height: raster.height(),
            bands: raster.band_count(),
            crs: raster.crs(),
        }
    }
}

/// Check a set of rasters against each other and the window size.
///
/// Every raster needs at least [`MIN_BANDS`] bands, the same band count and
/// CRS as the first raster, and at least `size` pixels in both dimensions.
/// File stems must be unique: tile names, shuffle seeds and checkpoints are
/// keyed on them.
pub fn validate_raster_infos(infos: &[RasterInfo], size: usize) -> MappingResult<()> {
    let Some(first) = infos.first() else {
        return Ok(());
    };

    let mut stems: HashMap<String, &Path> = HashMap::with_capacity(infos.len());
    for info in infos {
        let stem = raster_stem(&info.path);
        if let Some(other) = stems.get(&stem) {
            return Err(MappingError::validation(
                &info.path,
                "file stem",
                format!("a stem not already used by {}", other.display()),
                stem,
            ));
        }
        stems.insert(stem, &info.path);

        if info.bands < MIN_BANDS {
            return Err(MappingError::validation(
                &info.path,
                "band count",
                format!("at least {}", MIN_BANDS),
                info.bands,
            ));
        }
        if info.bands != first.bands {
            return Err(MappingError::validation(
                &info.path,
                "band count",
                format!("{} (as in {})", first.bands, first.path.display()),
                info.bands,
            ));
        }
        if info.crs != first.crs {
            return Err(MappingError::validation(
                &info.path,
                "CRS",
                format!("{} (as in {})", first.crs, first.path.display()),
                info.crs,
            ));
        }
        if info.width < size || info.height < size {
            return Err(MappingError::configuration(format!(
                "tile size {} is larger than raster {} ({}x{})",
                size,
                info.path.display(),
                info.width,
                info.height
            )));
        }
    }
    Ok(())
}

/// Open every GeoTIFF in `paths` and run [`validate_raster_infos`].
pub fn validate_rasters(paths: &[impl AsRef<Path>], size: usize) -> MappingResult<Vec<RasterInfo>> {
    let mut infos = Vec::with_capacity(paths.len());
    for path in paths {
        let path = path.as_ref();
        let raster = GeoTiffRaster::open(path)?;
        infos.push(RasterInfo::of(path, &raster));
    }
    validate_raster_infos(&infos, size)?;
    tracing::info!(rasters = infos.len(), size, "Raster pre-flight checks passed");
    Ok(infos)
}
