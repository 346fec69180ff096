//! In-memory raster, used for synthetic inputs and tests.

use std::collections::HashSet;
use std::path::PathBuf;

use mapping_common::{CrsCode, GeoTransform, MappingError, MappingResult, Window};

use crate::source::{PixelBlock, RasterSource};

/// A fully materialized raster held as one interleaved `f32` buffer.
#[derive(Debug, Clone)]
pub struct MemoryRaster {
    name: String,
    pixels: PixelBlock,
    crs: CrsCode,
    transform: GeoTransform,
    unreadable: HashSet<Window>,
}

impl MemoryRaster {
    pub fn new(
        name: impl Into<String>,
        pixels: PixelBlock,
        crs: CrsCode,
        transform: GeoTransform,
    ) -> Self {
        Self {
            name: name.into(),
            pixels,
            crs,
            transform,
            unreadable: HashSet::new(),
        }
    }

    /// Make reads of exactly `window` fail, simulating a corrupt region.
    pub fn with_unreadable_window(mut self, window: Window) -> Self {
        self.unreadable.insert(window);
        self
    }

    fn read_error(&self, window: &Window, message: impl Into<String>) -> MappingError {
        MappingError::RasterRead {
            path: PathBuf::from(&self.name),
            window: *window,
            message: message.into(),
        }
    }
}

impl RasterSource for MemoryRaster {
    fn width(&self) -> usize {
        self.pixels.width
    }

    fn height(&self) -> usize {
        self.pixels.height
    }

    fn band_count(&self) -> usize {
        self.pixels.bands
    }

    fn crs(&self) -> CrsCode {
        self.crs
    }

    fn transform(&self) -> GeoTransform {
        self.transform
    }

    fn name(&self) -> String {
        self.name.clone()
    }

    fn read_window(&mut self, window: &Window, bands: &[usize]) -> MappingResult<PixelBlock> {
        if self.unreadable.contains(window) {
            return Err(self.read_error(window, "region is unreadable"));
        }
        if !window.fits_within(self.width(), self.height()) {
            return Err(self.read_error(window, "window exceeds raster bounds"));
        }
        if let Some(band) = bands.iter().find(|&&b| b >= self.pixels.bands) {
            return Err(self.read_error(window, format!("band {} does not exist", band)));
        }

        let mut data = Vec::with_capacity(window.pixel_count() * bands.len());
        for row in window.row_off..window.row_end() {
            for col in window.col_off..window.col_end() {
                let pixel = self.pixels.pixel(row, col);
                data.extend(bands.iter().map(|&b| pixel[b]));
            }
        }

        Ok(PixelBlock {
            width: window.width,
            height: window.height,
            bands: bands.len(),
            data,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient(width: usize, height: usize) -> MemoryRaster {
        let mut data = Vec::new();
        for row in 0..height {
            for col in 0..width {
                data.extend([col as f32, row as f32, 7.0]);
            }
        }
        MemoryRaster::new(
            "gradient",
            PixelBlock::new(width, height, 3, data).unwrap(),
            CrsCode::Epsg3857,
            GeoTransform::from_origin(0.0, 0.0, 1.0, 1.0),
        )
    }

    #[test]
    fn test_read_window_selects_bands() {
        let mut raster = gradient(4, 4);
        let block = raster.read_window(&Window::square(1, 2, 2), &[1, 0]).unwrap();
        assert_eq!(block.bands, 2);
        assert_eq!(block.pixel(0, 0), &[2.0, 1.0]);
        assert_eq!(block.pixel(1, 1), &[3.0, 2.0]);
    }

    #[test]
    fn test_read_outside_fails() {
        let mut raster = gradient(4, 4);
        let err = raster.read_window(&Window::square(3, 3, 2), &[0]).unwrap_err();
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_unreadable_window() {
        let window = Window::square(0, 0, 2);
        let mut raster = gradient(4, 4).with_unreadable_window(window);
        assert!(raster.read_window(&window, &[0]).is_err());
        assert!(raster.read_window(&Window::square(2, 0, 2), &[0]).is_ok());
    }
}
