use std::path::{Path, PathBuf};

use super::types::{FileType, ReadError};

pub fn reader_from_filetype(path: &Path) -> Result<FileType, ReadError> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("tif") | Some("tiff") => Ok(FileType::GeoTiff),
        _ => Err(ReadError::UnknownFileType(path.display().to_string())),
    }
}

/// Resolves a glob pattern to band files ordered by the trailing number of their
/// file stem (`radiance_2.tif` before `radiance_10.tif`).
pub fn band_files(pattern: &str) -> Result<Vec<PathBuf>, ReadError> {
    let paths = glob::glob(pattern).map_err(|e| ReadError::Pattern(e.to_string()))?;

    let mut numbered = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| ReadError::Pattern(e.to_string()))?;
        let number = band_number(&path).ok_or_else(|| {
            ReadError::Pattern(format!("no band number in file name {}", path.display()))
        })?;
        numbered.push((number, path));
    }

    numbered.sort_by_key(|(number, _)| *number);
    Ok(numbered.into_iter().map(|(_, path)| path).collect())
}

fn band_number(path: &Path) -> Option<u32> {
    let stem = path.file_stem()?.to_str()?;
    let digits: String = stem
        .chars()
        .rev()
        .take_while(|c| c.is_ascii_digit())
        .collect::<Vec<_>>()
        .into_iter()
        .rev()
        .collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::tempdir;

    #[test]
    fn test_band_files_are_numerically_ordered() {
        let dir = tempdir().unwrap();
        for n in [10, 2, 1] {
            File::create(dir.path().join(format!("radiance_{n}.tif"))).unwrap();
        }
        let pattern = format!("{}/radiance_*.tif", dir.path().display());
        let files = band_files(&pattern).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["radiance_1.tif", "radiance_2.tif", "radiance_10.tif"]);
    }

    #[test]
    fn test_file_type() {
        assert!(reader_from_filetype(Path::new("dem.tif")).is_ok());
        assert!(reader_from_filetype(Path::new("dem.nc")).is_err());
    }
}
