//! JPEG encoding of 8-bit RGB tiles.

use std::fs;
use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use mapping_common::{MappingError, MappingResult};
use raster_io::RgbTile;

/// Default JPEG quality for written tiles.
pub const DEFAULT_JPEG_QUALITY: u8 = 90;

/// Encode a tile as JPEG.
pub fn encode_jpeg(tile: &RgbTile, quality: u8) -> MappingResult<Vec<u8>> {
    let mut jpeg_data = Vec::new();
    let mut cursor = Cursor::new(&mut jpeg_data);

    let mut encoder = JpegEncoder::new_with_quality(&mut cursor, quality.clamp(1, 100));
    encoder
        .encode(&tile.data, tile.width as u32, tile.height as u32, image::ColorType::Rgb8)
        .map_err(|e| MappingError::Image(format!("Failed to encode JPEG: {}", e)))?;

    Ok(jpeg_data)
}

/// Encode `tile` and write it to `path`. The parent directory must exist.
pub fn write_tile(path: &Path, tile: &RgbTile, quality: u8) -> MappingResult<()> {
    let bytes = encode_jpeg(tile, quality)?;
    fs::write(path, bytes)?;
    Ok(())
}
