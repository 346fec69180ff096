//! The raster access trait and the pixel buffers it produces.

use mapping_common::{BoundingBox, CrsCode, GeoTransform, MappingResult, Window};

/// Pixel values of a window, stored pixel-interleaved: row-major with the
/// band index varying fastest.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelBlock {
    pub width: usize,
    pub height: usize,
    pub bands: usize,
    pub data: Vec<f32>,
}

impl PixelBlock {
    /// Wrap interleaved data. Returns `None` when the length does not match
    /// `width * height * bands`.
    pub fn new(width: usize, height: usize, bands: usize, data: Vec<f32>) -> Option<Self> {
        (data.len() == width * height * bands).then_some(Self {
            width,
            height,
            bands,
            data,
        })
    }

    pub fn zeros(width: usize, height: usize, bands: usize) -> Self {
        Self {
            width,
            height,
            bands,
            data: vec![0.0; width * height * bands],
        }
    }

    /// Value of `band` (0-based) at (`row`, `col`).
    pub fn get(&self, row: usize, col: usize, band: usize) -> f32 {
        self.data[(row * self.width + col) * self.bands + band]
    }

    /// All band values of one pixel.
    pub fn pixel(&self, row: usize, col: usize) -> &[f32] {
        let start = (row * self.width + col) * self.bands;
        &self.data[start..start + self.bands]
    }

    /// Iterate over every pixel's band values in row-major order.
    pub fn pixels(&self) -> impl Iterator<Item = &[f32]> {
        self.data.chunks_exact(self.bands.max(1))
    }
}

/// An 8-bit RGB tile, pixel-interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct RgbTile {
    pub width: usize,
    pub height: usize,
    pub data: Vec<u8>,
}

impl RgbTile {
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 3]> + '_ {
        self.data.chunks_exact(3).map(|p| [p[0], p[1], p[2]])
    }
}

/// Read-only, window-addressable access to a georeferenced raster.
///
/// Band indices are 0-based.
pub trait RasterSource {
    fn width(&self) -> usize;

    fn height(&self) -> usize;

    fn band_count(&self) -> usize;

    fn crs(&self) -> CrsCode;

    /// Pixel-to-world affine transform.
    fn transform(&self) -> GeoTransform;

    /// Read the requested bands of `window`.
    ///
    /// Fails with a raster read error when the window falls outside the
    /// raster, a band index is invalid, or the underlying data cannot be
    /// decoded.
    fn read_window(&mut self, window: &Window, bands: &[usize]) -> MappingResult<PixelBlock>;

    /// Name used in logs and error messages.
    fn name(&self) -> String {
        String::from("<raster>")
    }

    /// World extent of the full grid.
    fn bounds(&self) -> BoundingBox {
        self.transform().raster_bounds(self.width(), self.height())
    }
}
