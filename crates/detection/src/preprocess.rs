//! Model input preprocessing.

use std::fmt;
use std::str::FromStr;

use mapping_common::MappingError;
use raster_io::RgbTile;
use serde::{Deserialize, Serialize};

/// Normalization applied to 8-bit tiles before they reach the classifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preprocessing {
    /// Raw `0..=255` values.
    Identity,
    /// `v / 255`, in `[0, 1]`.
    #[default]
    UnitScale,
    /// `v / 127.5 - 1`, in `[-1, 1]`.
    Symmetric,
}

impl Preprocessing {
    pub fn as_str(&self) -> &'static str {
        match self {
            Preprocessing::Identity => "identity",
            Preprocessing::UnitScale => "unit_scale",
            Preprocessing::Symmetric => "symmetric",
        }
    }

    pub fn apply_value(&self, v: u8) -> f32 {
        let v = v as f32;
        match self {
            Preprocessing::Identity => v,
            Preprocessing::UnitScale => v / 255.0,
            Preprocessing::Symmetric => v / 127.5 - 1.0,
        }
    }

    pub fn apply(&self, tile: &RgbTile) -> Tile {
        Tile {
            width: tile.width,
            height: tile.height,
            data: tile.data.iter().map(|&v| self.apply_value(v)).collect(),
        }
    }
}

impl fmt::Display for Preprocessing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Preprocessing {
    type Err = MappingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "identity" | "none" => Ok(Preprocessing::Identity),
            "unit_scale" | "unit" => Ok(Preprocessing::UnitScale),
            "symmetric" => Ok(Preprocessing::Symmetric),
            other => Err(MappingError::configuration(format!("unknown preprocessing: {}", other))),
        }
    }
}

/// A normalized RGB tile, row-major with interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Tile {
    pub width: usize,
    pub height: usize,
    pub data: Vec<f32>,
}

impl Tile {
    pub fn pixel(&self, row: usize, col: usize) -> &[f32] {
        let start = (row * self.width + col) * 3;
        &self.data[start..start + 3]
    }
}
