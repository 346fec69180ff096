//! Pixel-space windows over a raster grid.

use serde::{Deserialize, Serialize};
use std::fmt;

/// An axis-aligned rectangle in pixel space.
///
/// Offsets are measured from the top-left pixel of the raster; `col_off`
/// grows to the right and `row_off` grows downwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Window {
    pub col_off: usize,
    pub row_off: usize,
    pub width: usize,
    pub height: usize,
}

impl Window {
    pub fn new(col_off: usize, row_off: usize, width: usize, height: usize) -> Self {
        Self {
            col_off,
            row_off,
            width,
            height,
        }
    }

    /// A `size x size` window with its top-left corner at (`col_off`, `row_off`).
    pub fn square(col_off: usize, row_off: usize, size: usize) -> Self {
        Self::new(col_off, row_off, size, size)
    }

    /// Exclusive right column.
    pub fn col_end(&self) -> usize {
        self.col_off + self.width
    }

    /// Exclusive bottom row.
    pub fn row_end(&self) -> usize {
        self.row_off + self.height
    }

    /// Check that the window lies entirely inside a `width x height` grid.
    pub fn fits_within(&self, width: usize, height: usize) -> bool {
        self.col_end() <= width && self.row_end() <= height
    }

    pub fn pixel_count(&self) -> usize {
        self.width * self.height
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "(row {}, col {}, {}x{})",
            self.row_off, self.col_off, self.width, self.height
        )
    }
}
