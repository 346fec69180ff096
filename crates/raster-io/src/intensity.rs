//! Intensity statistics and 8-bit conversion of RGB windows.

use mapping_common::{MappingError, MappingResult, Window};

use crate::source::{PixelBlock, RasterSource, RgbTile};

/// Rows read per strip while sampling a full raster.
const STRIP_ROWS: usize = 256;

/// Luminance weights (ITU-R BT.709) used for contrast checks.
const LUMA_WEIGHTS: [f64; 3] = [0.2125, 0.7154, 0.0721];

/// A tile whose central 98% luminance range spans less than this fraction of
/// the full float range counts as low contrast.
pub const LOW_CONTRAST_FRACTION: f64 = 0.05;

/// Percentile of sorted values with linear interpolation between the
/// closest ranks. `p` is in [0, 100].
pub fn percentile(sorted: &[f32], p: f64) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }
    let rank = (p.clamp(0.0, 100.0) / 100.0) * (sorted.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    let frac = rank - lo as f64;
    Some(sorted[lo] as f64 + (sorted[hi] as f64 - sorted[lo] as f64) * frac)
}

/// Global intensity range of a raster, with the strips that could not be
/// read while sampling it.
#[derive(Debug)]
pub struct IntensityPercentiles {
    pub low: f64,
    pub high: f64,
    /// Finite values the percentiles were taken over.
    pub samples: usize,
    /// Read errors of skipped strips, in raster order.
    pub skipped: Vec<MappingError>,
}

impl IntensityPercentiles {
    /// `(low, high)`, as taken by [`rescale_intensity`].
    pub fn range(&self) -> (f64, f64) {
        (self.low, self.high)
    }
}

/// Global `(lower_cut, upper_cut)` percentiles over `bands` of the whole
/// raster, pooled across bands.
///
/// The raster is read in full-width row strips. With `sample_stride > 1`
/// only every n-th row and column is sampled. Strips that fail with a
/// recoverable read error are left out of the sample; the call fails only
/// when no finite value remains.
pub fn compute_intensity_percentiles(
    raster: &mut dyn RasterSource,
    bands: &[usize],
    lower_cut: f64,
    upper_cut: f64,
    sample_stride: usize,
) -> MappingResult<IntensityPercentiles> {
    if !(0.0..=100.0).contains(&lower_cut)
        || !(0.0..=100.0).contains(&upper_cut)
        || lower_cut > upper_cut
    {
        return Err(MappingError::configuration(format!(
            "percentile cuts must satisfy 0 <= lower <= upper <= 100, got {} and {}",
            lower_cut, upper_cut
        )));
    }
    let stride = sample_stride.max(1);
    let (width, height) = (raster.width(), raster.height());

    let mut values: Vec<f32> =
        Vec::with_capacity(width.div_ceil(stride) * height.div_ceil(stride) * bands.len());
    let mut skipped = Vec::new();

    let mut row = 0;
    while row < height {
        let rows = STRIP_ROWS.min(height - row);
        let window = Window::new(0, row, width, rows);
        row += rows;

        let strip = match raster.read_window(&window, bands) {
            Ok(strip) => strip,
            Err(e) if e.is_recoverable() => {
                tracing::warn!(
                    raster = %raster.name(),
                    %window,
                    error = %e,
                    "Leaving unreadable strip out of intensity percentiles"
                );
                skipped.push(e);
                continue;
            }
            Err(e) => return Err(e),
        };
        for r in 0..rows {
            if (window.row_off + r) % stride != 0 {
                continue;
            }
            for c in (0..width).step_by(stride) {
                values.extend_from_slice(strip.pixel(r, c));
            }
        }
    }

    values.retain(|v| v.is_finite());
    values.sort_by(f32::total_cmp);

    let low = percentile(&values, lower_cut).ok_or_else(|| {
        MappingError::configuration(format!("raster {} has no valid pixels", raster.name()))
    })?;
    let high = percentile(&values, upper_cut).unwrap_or(low);

    tracing::debug!(
        raster = %raster.name(),
        samples = values.len(),
        skipped_strips = skipped.len(),
        low,
        high,
        "Computed intensity percentiles"
    );
    Ok(IntensityPercentiles {
        low,
        high,
        samples: values.len(),
        skipped,
    })
}

/// Convert the first three bands of `block` to an 8-bit RGB tile.
///
/// With an input range, values are clipped to `[low, high]` and mapped
/// linearly onto `[0, 255]`. Without one, values are clamped into
/// `[0, 255]`. Blocks with fewer than three bands repeat the last band.
pub fn rescale_intensity(block: &PixelBlock, in_range: Option<(f64, f64)>) -> RgbTile {
    let bands = block.bands.max(1);
    let mut data = Vec::with_capacity(block.width * block.height * 3);

    for pixel in block.pixels() {
        for i in 0..3 {
            let v = pixel.get(i.min(bands - 1)).copied().unwrap_or(0.0) as f64;
            let scaled = match in_range {
                Some((low, high)) if high > low => {
                    (v.clamp(low, high) - low) / (high - low) * 255.0
                }
                Some(_) => 0.0,
                None => v.clamp(0.0, 255.0),
            };
            data.push(scaled.round() as u8);
        }
    }

    RgbTile {
        width: block.width,
        height: block.height,
        data,
    }
}

/// True when the tile's luminance barely varies: the spread between the
/// 1st and 99th luminance percentiles, scaled to [0, 1], is less than
/// [`LOW_CONTRAST_FRACTION`] of the float range [-1, 1].
pub fn is_low_contrast(tile: &RgbTile) -> bool {
    let mut luma: Vec<f32> = tile
        .pixels()
        .map(|p| {
            let y: f64 = p
                .iter()
                .zip(LUMA_WEIGHTS)
                .map(|(&c, w)| c as f64 / 255.0 * w)
                .sum();
            y as f32
        })
        .collect();
    luma.sort_by(f32::total_cmp);

    match (percentile(&luma, 1.0), percentile(&luma, 99.0)) {
        (Some(p1), Some(p99)) => (p99 - p1) / 2.0 < LOW_CONTRAST_FRACTION,
        _ => true,
    }
}
