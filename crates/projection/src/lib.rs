//! Coordinate reference system transformations.
//!
//! Forward and inverse formulas for the CRSs survey imagery ships in, with
//! no PROJ binding: WGS84 geographic, Web Mercator and WGS84 / UTM
//! (transverse Mercator). Other EPSG codes go through the pure-Rust
//! proj4rs definitions. Geometries are mapped coordinate by coordinate.

pub mod geographic;
pub mod mercator;
pub mod transform;
pub mod utm;

pub use transform::{reproject, reproject_bbox, reproject_shapes, transform_point, Transformer};
pub use utm::TransverseMercator;
