//! Reading and writing GeoJSON files.

use std::fs;
use std::path::Path;

use mapping_common::{CrsCode, MappingResult, ShapeWithProps};

use crate::geojson::FeatureCollection;

/// Shapes read from a vector file, with the CRS their coordinates are in.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorLayer {
    pub shapes: Vec<ShapeWithProps>,
    pub crs: CrsCode,
}

/// Read the polygonal features of a GeoJSON FeatureCollection.
pub fn read_shapes(path: impl AsRef<Path>) -> MappingResult<VectorLayer> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let collection = FeatureCollection::parse(&text)?;
    let crs = collection.crs_code()?;
    let shapes = collection.to_shapes()?;

    tracing::info!(
        path = %path.display(),
        features = collection.features.len(),
        shapes = shapes.len(),
        %crs,
        "Read vector layer"
    );
    Ok(VectorLayer { shapes, crs })
}

/// Write shapes as a GeoJSON FeatureCollection, creating parent
/// directories as needed. The file is written to a temporary sibling and
/// renamed into place.
pub fn write_shapes(
    path: impl AsRef<Path>,
    shapes: &[ShapeWithProps],
    crs: CrsCode,
) -> MappingResult<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let collection = FeatureCollection::from_shapes(shapes, crs);
    let tmp = path.with_extension("geojson.tmp");
    fs::write(&tmp, serde_json::to_vec(&collection)?)?;
    fs::rename(&tmp, path)?;

    tracing::info!(
        path = %path.display(),
        features = collection.features.len(),
        "Wrote vector layer"
    );
    Ok(())
}
