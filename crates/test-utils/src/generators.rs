//! Synthetic imagery generators.
//!
//! All generators return 8-bit RGB pixels, pixel-interleaved in row-major
//! order (`[r, g, b, r, g, b, ...]`), so they can be written as GeoTIFFs or
//! wrapped as in-memory rasters.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use tiff::encoder::{colortype, TiffEncoder};
use tiff::tags::Tag;

/// Creates an RGB image with predictable values.
///
/// Pixel (row, col) is `[col % 256, row % 256, (row + col) % 256]`, so reads
/// can be checked against their source coordinates.
///
/// # Example
///
/// ```
/// use test_utils::create_rgb_gradient;
///
/// let pixels = create_rgb_gradient(4, 2);
/// assert_eq!(pixels.len(), 4 * 2 * 3);
/// assert_eq!(&pixels[3..6], &[1, 0, 1]); // col=1, row=0
/// ```
pub fn create_rgb_gradient(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let (r, g, b) = (col % 256, row % 256, (row + col) % 256);
            pixels.extend_from_slice(&[r as u8, g as u8, b as u8]);
        }
    }
    pixels
}

/// Creates a uniform RGB image. Every tile cut from it is low contrast.
pub fn create_solid_rgb(width: usize, height: usize, rgb: [u8; 3]) -> Vec<u8> {
    rgb.iter().copied().cycle().take(width * height * 3).collect()
}

/// Creates a black and white checkerboard with `cell`-pixel squares.
pub fn create_checkerboard(width: usize, height: usize, cell: usize) -> Vec<u8> {
    let cell = cell.max(1);
    let mut pixels = Vec::with_capacity(width * height * 3);
    for row in 0..height {
        for col in 0..width {
            let v = if (row / cell + col / cell) % 2 == 0 { 0 } else { 255 };
            pixels.extend_from_slice(&[v, v, v]);
        }
    }
    pixels
}

/// Widen 8-bit samples to `f32`.
pub fn to_f32(pixels: &[u8]) -> Vec<f32> {
    pixels.iter().map(|&v| v as f32).collect()
}

/// Georeferencing written into synthetic GeoTIFFs.
#[derive(Debug, Clone, Copy)]
pub struct GeoTiffOptions {
    /// EPSG code stored as ProjectedCSTypeGeoKey (or GeographicTypeGeoKey
    /// for 4326/4269)
    pub epsg: u16,
    /// World X of the top-left corner
    pub west: f64,
    /// World Y of the top-left corner
    pub north: f64,
    /// Pixel size (positive, north-up)
    pub pixel_size: f64,
    /// Rows per strip; small values exercise multi-strip reads
    pub rows_per_strip: u32,
}

impl Default for GeoTiffOptions {
    fn default() -> Self {
        Self {
            epsg: 32721,
            west: 300_000.0,
            north: 6_200_000.0,
            pixel_size: 1.0,
            rows_per_strip: 8,
        }
    }
}

/// Write an 8-bit RGB GeoTIFF with ModelPixelScale, ModelTiepoint and
/// GeoKeyDirectory tags.
pub fn write_rgb_geotiff(
    path: impl AsRef<Path>,
    width: usize,
    height: usize,
    pixels: &[u8],
    options: &GeoTiffOptions,
) -> tiff::TiffResult<()> {
    let file = File::create(path)?;
    let mut tiff = TiffEncoder::new(BufWriter::new(file))?;
    let mut image = tiff.new_image::<colortype::RGB8>(width as u32, height as u32)?;
    image.rows_per_strip(options.rows_per_strip)?;

    let geographic = matches!(options.epsg, 4326 | 4269);
    // GTModelType: 1 projected, 2 geographic
    let (model_type, crs_key) = if geographic { (2, 2048) } else { (1, 3072) };
    let geo_keys: [u16; 12] = [1, 1, 0, 2, 1024, 0, 1, model_type, crs_key, 0, 1, options.epsg];

    image
        .encoder()
        .write_tag(Tag::ModelPixelScaleTag, &[options.pixel_size, options.pixel_size, 0.0][..])?;
    image.encoder().write_tag(
        Tag::ModelTiepointTag,
        &[0.0, 0.0, 0.0, options.west, options.north, 0.0][..],
    )?;
    image.encoder().write_tag(Tag::GeoKeyDirectoryTag, &geo_keys[..])?;

    image.write_data(pixels)?;
    Ok(())
}
