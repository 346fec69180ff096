//! GeoJSON input and output for ground-truth polygons and detections.

pub mod geojson;
pub mod io;

pub use geojson::{Feature, FeatureCollection, NamedCrs};
pub use io::{read_shapes, write_shapes, VectorLayer};
