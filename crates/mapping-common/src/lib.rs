//! Common types and utilities shared across all settlement-mapper crates.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod geometry;
pub mod shape;
pub mod transform;
pub mod window;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{MappingError, MappingResult};
pub use shape::{PropValue, Props, ShapeWithProps, PROB, PROB_MEAN};
pub use transform::GeoTransform;
pub use window::Window;
