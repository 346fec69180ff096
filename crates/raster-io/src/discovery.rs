//! Locating raster files on disk.

use std::path::{Path, PathBuf};

use mapping_common::{MappingError, MappingResult};
use walkdir::WalkDir;

/// File extensions treated as rasters (compared case-insensitively).
pub const RASTER_EXTENSIONS: &[&str] = &["tif", "tiff"];

fn is_raster_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| RASTER_EXTENSIONS.iter().any(|r| e.eq_ignore_ascii_case(r)))
        .unwrap_or(false)
}

/// All raster files under `dir`, recursively, sorted by path.
///
/// A path that is itself a raster file is returned as the only entry.
pub fn all_raster_files(dir: impl AsRef<Path>) -> MappingResult<Vec<PathBuf>> {
    let dir = dir.as_ref();
    if dir.is_file() {
        return Ok(if is_raster_file(dir) {
            vec![dir.to_path_buf()]
        } else {
            Vec::new()
        });
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.map_err(|e| {
            MappingError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                format!("walking {}: {}", dir.display(), e),
            ))
        })?;
        if entry.file_type().is_file() && is_raster_file(entry.path()) {
            files.push(entry.into_path());
        }
    }
    files.sort();

    tracing::debug!(dir = %dir.display(), count = files.len(), "Found raster files");
    Ok(files)
}

/// File stem used as the tile name prefix and checkpoint name.
pub fn raster_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_finds_nested_rasters_sorted() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("b/nested")).unwrap();
        fs::write(dir.path().join("b/nested/z.TIF"), b"").unwrap();
        fs::write(dir.path().join("a.tiff"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();
        fs::write(dir.path().join("c.tif.aux.xml"), b"").unwrap();

        let files = all_raster_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.strip_prefix(dir.path()).unwrap().to_path_buf())
            .collect();
        assert_eq!(names, vec![PathBuf::from("a.tiff"), PathBuf::from("b/nested/z.TIF")]);
    }

    #[test]
    fn test_single_file_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.tif");
        fs::write(&path, b"").unwrap();
        assert_eq!(all_raster_files(&path).unwrap(), vec![path]);
    }

    #[test]
    fn test_raster_stem() {
        assert_eq!(raster_stem(Path::new("/data/scene_01.tif")), "scene_01");
    }
}
