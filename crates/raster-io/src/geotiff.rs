//! Windowed GeoTIFF reader on top of the `tiff` decoder.
//!
//! Supports stripped and tiled files with chunky (pixel-interleaved) planar
//! configuration and 8/16-bit unsigned, 16-bit signed or 32/64-bit float
//! samples. Georeferencing is taken from the GeoTIFF tags:
//! - CRS: ProjectedCSTypeGeoKey (3072), else GeographicTypeGeoKey (2048)
//! - affine: ModelTransformationTag, else ModelPixelScale + ModelTiepoint

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use mapping_common::{CrsCode, GeoTransform, MappingError, MappingResult, Window};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

use crate::chunk_cache::{CacheStats, ChunkCache};
use crate::source::{PixelBlock, RasterSource};

/// Default decoded-chunk budget per open raster.
pub const DEFAULT_CACHE_BYTES: usize = 128 * 1024 * 1024;

const GEO_KEY_GEOGRAPHIC_TYPE: u32 = 2048;
const GEO_KEY_PROJECTED_CS_TYPE: u32 = 3072;
const GEO_KEY_USER_DEFINED: u32 = 32767;

const PLANAR_CONFIG_SEPARATE: u32 = 2;

/// A GeoTIFF opened for windowed reads.
///
/// The file handle is held until the raster is dropped.
pub struct GeoTiffRaster {
    path: PathBuf,
    decoder: Decoder<BufReader<File>>,
    width: usize,
    height: usize,
    bands: usize,
    crs: CrsCode,
    transform: GeoTransform,
    chunk_width: usize,
    chunk_height: usize,
    chunks_across: usize,
    cache: ChunkCache,
}

impl std::fmt::Debug for GeoTiffRaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeoTiffRaster")
            .field("path", &self.path)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bands", &self.bands)
            .field("crs", &self.crs)
            .finish()
    }
}

impl GeoTiffRaster {
    pub fn open(path: impl AsRef<Path>) -> MappingResult<Self> {
        Self::open_with_cache_limit(path, DEFAULT_CACHE_BYTES)
    }

    pub fn open_with_cache_limit(
        path: impl AsRef<Path>,
        cache_bytes: usize,
    ) -> MappingResult<Self> {
        let path = path.as_ref().to_path_buf();
        let open_error = |message: String| MappingError::RasterOpen {
            path: path.clone(),
            message,
        };

        let file = File::open(&path).map_err(|e| open_error(e.to_string()))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| open_error(format!("not a TIFF: {}", e)))?;

        let (width, height) = decoder
            .dimensions()
            .map_err(|e| open_error(format!("cannot read dimensions: {}", e)))?;

        let bands = tag_u32(&mut decoder, Tag::SamplesPerPixel).unwrap_or(1) as usize;
        if tag_u32(&mut decoder, Tag::PlanarConfiguration) == Some(PLANAR_CONFIG_SEPARATE) {
            return Err(open_error(
                "separate planar configuration is not supported".to_string(),
            ));
        }

        let crs = read_crs(&mut decoder).map_err(open_error)?;
        let transform = read_transform(&mut decoder).map_err(open_error)?;

        let (chunk_width, chunk_height) = decoder.chunk_dimensions();
        let (chunk_width, chunk_height) = (chunk_width as usize, chunk_height as usize);
        if chunk_width == 0 || chunk_height == 0 {
            return Err(open_error("zero-sized strips or tiles".to_string()));
        }
        let chunks_across = (width as usize).div_ceil(chunk_width);

        tracing::debug!(
            path = %path.display(),
            width,
            height,
            bands,
            %crs,
            chunk_width,
            chunk_height,
            "Opened GeoTIFF"
        );

        Ok(Self {
            path,
            decoder,
            width: width as usize,
            height: height as usize,
            bands,
            crs,
            transform,
            chunk_width,
            chunk_height,
            chunks_across,
            cache: ChunkCache::new(cache_bytes),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Size of the valid data in chunk `(chunk_row, chunk_col)`; edge chunks
    /// are cropped to the raster.
    fn chunk_data_size(&self, chunk_row: usize, chunk_col: usize) -> (usize, usize) {
        let w = self.chunk_width.min(self.width - chunk_col * self.chunk_width);
        let h = self.chunk_height.min(self.height - chunk_row * self.chunk_height);
        (w, h)
    }

    fn decode_chunk(&mut self, index: u32) -> Result<Vec<f32>, String> {
        let result = self
            .decoder
            .read_chunk(index)
            .map_err(|e| format!("chunk {}: {}", index, e))?;
        samples_to_f32(result).ok_or_else(|| format!("chunk {}: unsupported sample format", index))
    }

    /// Run `f` on decoded chunk `index`, decoding it on a cache miss.
    fn with_chunk<T>(&mut self, index: u32, f: impl FnOnce(&[f32]) -> T) -> Result<T, String> {
        if let Some(data) = self.cache.get(index) {
            return Ok(f(data));
        }
        let data = self.decode_chunk(index)?;
        let out = f(&data);
        self.cache.insert(index, data);
        Ok(out)
    }

    fn read_error(&self, window: &Window, message: impl Into<String>) -> MappingError {
        MappingError::RasterRead {
            path: self.path.clone(),
            window: *window,
            message: message.into(),
        }
    }
}

impl RasterSource for GeoTiffRaster {
    fn width(&self) -> usize {
        self.width
    }

    fn height(&self) -> usize {
        self.height
    }

    fn band_count(&self) -> usize {
        self.bands
    }

    fn crs(&self) -> CrsCode {
        self.crs
    }

    fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn name(&self) -> String {
        self.path.display().to_string()
    }

    fn read_window(&mut self, window: &Window, bands: &[usize]) -> MappingResult<PixelBlock> {
        if window.width == 0 || window.height == 0 || !window.fits_within(self.width, self.height) {
            return Err(self.read_error(window, "window exceeds raster bounds"));
        }
        if let Some(band) = bands.iter().find(|&&b| b >= self.bands) {
            return Err(self.read_error(window, format!("band {} does not exist", band)));
        }

        let spp = self.bands;
        let out_bands = bands.len();
        let mut data = vec![0.0_f32; window.pixel_count() * out_bands];

        let first_chunk_row = window.row_off / self.chunk_height;
        let last_chunk_row = (window.row_end() - 1) / self.chunk_height;
        let first_chunk_col = window.col_off / self.chunk_width;
        let last_chunk_col = (window.col_end() - 1) / self.chunk_width;

        for chunk_row in first_chunk_row..=last_chunk_row {
            for chunk_col in first_chunk_col..=last_chunk_col {
                let index = (chunk_row * self.chunks_across + chunk_col) as u32;
                let (data_w, data_h) = self.chunk_data_size(chunk_row, chunk_col);
                let chunk_x0 = chunk_col * self.chunk_width;
                let chunk_y0 = chunk_row * self.chunk_height;

                // Overlap of the window with this chunk, in raster pixels
                let row_start = window.row_off.max(chunk_y0);
                let row_end = window.row_end().min(chunk_y0 + data_h);
                let col_start = window.col_off.max(chunk_x0);
                let col_end = window.col_end().min(chunk_x0 + data_w);

                let copied = self.with_chunk(index, |chunk| {
                    if chunk.len() < data_w * data_h * spp {
                        return false;
                    }
                    for row in row_start..row_end {
                        let src_row = (row - chunk_y0) * data_w;
                        let dst_row = (row - window.row_off) * window.width;
                        for col in col_start..col_end {
                            let src = (src_row + col - chunk_x0) * spp;
                            let dst = (dst_row + col - window.col_off) * out_bands;
                            for (i, &band) in bands.iter().enumerate() {
                                data[dst + i] = chunk[src + band];
                            }
                        }
                    }
                    true
                });

                match copied {
                    Ok(true) => {}
                    Ok(false) => {
                        return Err(self.read_error(window, format!("chunk {} is truncated", index)))
                    }
                    Err(message) => return Err(self.read_error(window, message)),
                }
            }
        }

        Ok(PixelBlock {
            width: window.width,
            height: window.height,
            bands: out_bands,
            data,
        })
    }
}

fn tag_u32(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Option<u32> {
    decoder.find_tag(tag).ok().flatten().and_then(|v| v.into_u32().ok())
}

fn tag_f64_vec(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Option<Vec<f64>> {
    decoder
        .find_tag(tag)
        .ok()
        .flatten()
        .and_then(|v| v.into_f64_vec().ok())
}

fn read_crs(decoder: &mut Decoder<BufReader<File>>) -> Result<CrsCode, String> {
    let keys = decoder
        .find_tag(Tag::GeoKeyDirectoryTag)
        .ok()
        .flatten()
        .and_then(|v| v.into_u32_vec().ok())
        .ok_or_else(|| "missing GeoKeyDirectory tag".to_string())?;

    let projected = geo_key(&keys, GEO_KEY_PROJECTED_CS_TYPE);
    let geographic = geo_key(&keys, GEO_KEY_GEOGRAPHIC_TYPE);

    let code = match (projected, geographic) {
        (Some(code), _) if code != GEO_KEY_USER_DEFINED => code,
        (_, Some(code)) if code != GEO_KEY_USER_DEFINED => code,
        (None, None) => return Err("GeoKeyDirectory has no CRS key".to_string()),
        _ => return Err("user-defined CRS is not supported".to_string()),
    };
    CrsCode::from_epsg(code).map_err(|e| e.to_string())
}

/// Value of a GeoKey stored inline in the directory (TIFFTagLocation 0).
///
/// The directory is a 4-value header followed by 4-value entries
/// `(key_id, tag_location, count, value)`.
fn geo_key(directory: &[u32], key_id: u32) -> Option<u32> {
    let declared = *directory.get(3)? as usize;
    directory
        .get(4..)?
        .chunks_exact(4)
        .take(declared)
        .find(|entry| entry[0] == key_id && entry[1] == 0)
        .map(|entry| entry[3])
}

fn read_transform(decoder: &mut Decoder<BufReader<File>>) -> Result<GeoTransform, String> {
    if let Some(m) = tag_f64_vec(decoder, Tag::ModelTransformationTag) {
        if m.len() >= 8 {
            return Ok(GeoTransform::new(m[0], m[1], m[3], m[4], m[5], m[7]));
        }
    }

    let scale = tag_f64_vec(decoder, Tag::ModelPixelScaleTag)
        .filter(|s| s.len() >= 2)
        .ok_or_else(|| "missing ModelPixelScale and ModelTransformation tags".to_string())?;
    let tie = tag_f64_vec(decoder, Tag::ModelTiepointTag)
        .filter(|t| t.len() >= 6)
        .ok_or_else(|| "missing ModelTiepoint tag".to_string())?;

    let (sx, sy) = (scale[0], scale[1]);
    let (i, j, x, y) = (tie[0], tie[1], tie[3], tie[4]);
    Ok(GeoTransform::new(sx, 0.0, x - i * sx, 0.0, -sy, y + j * sy))
}

fn samples_to_f32(result: DecodingResult) -> Option<Vec<f32>> {
    match result {
        DecodingResult::U8(v) => Some(v.into_iter().map(f32::from).collect()),
        DecodingResult::U16(v) => Some(v.into_iter().map(f32::from).collect()),
        DecodingResult::I16(v) => Some(v.into_iter().map(f32::from).collect()),
        DecodingResult::F32(v) => Some(v),
        DecodingResult::F64(v) => Some(v.into_iter().map(|x| x as f32).collect()),
        _ => None,
    }
}
