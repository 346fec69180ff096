//! Raster access for the settlement-mapper pipeline.
//!
//! - [`RasterSource`]: window-addressable raster trait
//! - [`GeoTiffRaster`]: GeoTIFF implementation with an LRU chunk cache
//! - [`MemoryRaster`]: in-memory implementation for synthetic inputs
//! - intensity percentiles, 8-bit rescaling and low-contrast detection
//! - raster discovery and pre-flight validation

pub mod chunk_cache;
pub mod discovery;
pub mod geotiff;
pub mod intensity;
pub mod memory;
pub mod source;
pub mod validate;

pub use chunk_cache::CacheStats;
pub use discovery::{all_raster_files, raster_stem};
pub use geotiff::GeoTiffRaster;
pub use intensity::{
    compute_intensity_percentiles, is_low_contrast, percentile, rescale_intensity,
    IntensityPercentiles,
};
pub use memory::MemoryRaster;
pub use source::{PixelBlock, RasterSource, RgbTile};
pub use validate::{validate_raster_infos, validate_rasters, RasterInfo};

/// Bands read for RGB tiles.
pub const RGB_BANDS: [usize; 3] = [0, 1, 2];
