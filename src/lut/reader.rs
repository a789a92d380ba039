use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use walkdir::WalkDir;

use crate::error::{Result, ScapeError};
use crate::lut::lookup_table::{AtmLut, Axis, NUM_AXES};

/// Default file name of the MERIS atmospheric parameter table.
pub const LUT_FILE_NAME: &str = "SCAPEM_LUT_MERIS";

// Parameter counts found in the binary tables
const SUPPORTED_PARAM_COUNTS: [usize; 2] = [6, 7];

/// Reads a binary atmospheric parameter table.
///
/// Layout (little endian): for each of the 6 axes an `i32` node count followed by
/// that many `f32` nodes, then the `f32` payload with the wavelength index running
/// fastest, followed by parameter, cwv, vis, hsf, raa, sza and vza. The parameter
/// count is inferred from the payload size.
pub fn read_lut<P: AsRef<Path>>(path: P, n_wavelengths: usize) -> Result<AtmLut> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| ScapeError::Lut(format!("Failed to open {}: {}", path.display(), e)))?;

    let mut bytes = Vec::new();
    BufReader::new(file).read_to_end(&mut bytes)?;

    let lut = parse_lut(&bytes, n_wavelengths, &path.display().to_string())?;
    info!(
        "Loaded lookup table {} ({} parameters, {} nodes)",
        path.display(),
        lut.n_params(),
        lut.values().len()
    );
    Ok(lut)
}

pub fn parse_lut(bytes: &[u8], n_wavelengths: usize, source: &str) -> Result<AtmLut> {
    let mut cursor = ByteCursor { bytes, pos: 0 };

    let mut axes: [Vec<f64>; NUM_AXES] = Default::default();
    for (axis, nodes) in Axis::ALL.iter().zip(axes.iter_mut()) {
        let len = cursor
            .read_i32()
            .ok_or_else(|| ScapeError::lut_format(source, "truncated axis header"))?;
        if len < 2 {
            return Err(ScapeError::lut_format(
                source,
                format!("axis {} has invalid length {}", axis.name(), len),
            ));
        }
        for _ in 0..len {
            let node = cursor.read_f32().ok_or_else(|| {
                ScapeError::lut_format(source, format!("truncated {} axis", axis.name()))
            })?;
            nodes.push(node as f64);
        }
        debug!("LUT axis {}: {:?}", axis.name(), nodes);
    }

    let n_nodes = axes.iter().map(Vec::len).product::<usize>();
    let remaining = cursor.remaining() / 4;
    if cursor.remaining() % 4 != 0 {
        return Err(ScapeError::lut_format(
            source,
            "payload is not a whole number of floats",
        ));
    }

    let n_params = SUPPORTED_PARAM_COUNTS
        .iter()
        .copied()
        .find(|&np| np * n_nodes * n_wavelengths == remaining)
        .ok_or_else(|| {
            ScapeError::lut_format(
                source,
                format!(
                    "payload of {} values does not match {} nodes x {} bands x 6 or 7 parameters",
                    remaining, n_nodes, n_wavelengths
                ),
            )
        })?;

    let mut values = Vec::with_capacity(remaining);
    while let Some(value) = cursor.read_f32() {
        values.push(value);
    }

    AtmLut::new(axes, n_params, n_wavelengths, values)
}

/// Writes a table in the binary layout understood by [`read_lut`].
pub fn write_lut<P: AsRef<Path>>(path: P, lut: &AtmLut) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for axis in Axis::ALL {
        let nodes = lut.axis(axis);
        writer.write_all(&(nodes.len() as i32).to_le_bytes())?;
        for &node in nodes {
            writer.write_all(&(node as f32).to_le_bytes())?;
        }
    }
    for value in lut.values() {
        writer.write_all(&value.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

/// Resolves the table location: a file is used as is, a directory is searched
/// recursively for `file_name`.
pub fn locate_lut<P: AsRef<Path>>(path: P, file_name: &str) -> Result<PathBuf> {
    let path = path.as_ref();
    if path.is_file() {
        return Ok(path.to_path_buf());
    }
    if !path.exists() {
        return Err(ScapeError::Lut(format!(
            "lookup table path {} does not exist",
            path.display()
        )));
    }

    for entry in WalkDir::new(path).into_iter().filter_map(|e| e.ok()) {
        if entry.file_type().is_file()
            && let Some(name) = entry.path().file_name()
            && name.to_string_lossy() == file_name
        {
            return Ok(entry.path().to_path_buf());
        }
    }

    Err(ScapeError::Lut(format!(
        "no file named {} below {}",
        file_name,
        path.display()
    )))
}

struct ByteCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl ByteCursor<'_> {
    fn take4(&mut self) -> Option<[u8; 4]> {
        let chunk = self.bytes.get(self.pos..self.pos + 4)?;
        self.pos += 4;
        chunk.try_into().ok()
    }

    fn read_i32(&mut self) -> Option<i32> {
        self.take4().map(i32::from_le_bytes)
    }

    fn read_f32(&mut self) -> Option<f32> {
        self.take4().map(f32::from_le_bytes)
    }

    fn remaining(&self) -> usize {
        self.bytes.len().saturating_sub(self.pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn small_lut(n_params: usize) -> AtmLut {
        let axes = [
            vec![0.0, 45.0],
            vec![0.0, 65.0],
            vec![0.0, 180.0],
            vec![0.0, 2.5],
            vec![10.0, 180.0],
            vec![0.3, 5.0],
        ];
        let n = 64 * n_params * 15;
        let values = (0..n).map(|i| i as f32 * 0.5).collect();
        AtmLut::new(axes, n_params, 15, values).unwrap()
    }

    #[test]
    fn test_read_infers_parameter_count() {
        let dir = tempdir().unwrap();
        for n_params in [6, 7] {
            let path = dir.path().join(format!("lut_{n_params}"));
            write_lut(&path, &small_lut(n_params)).unwrap();
            let lut = read_lut(&path, 15).unwrap();
            assert_eq!(lut.n_params(), n_params);
            assert_eq!(lut.axis(Axis::Cwv), &[0.3f32 as f64, 5.0]);
            assert_eq!(lut.node_value([1, 1, 1, 1, 1, 1], n_params - 1, 14), (64 * n_params * 15 - 1) as f32 * 0.5);
        }
    }

    #[test]
    fn test_truncated_payload_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("lut");
        write_lut(&path, &small_lut(7)).unwrap();
        let mut bytes = fs::read(&path).unwrap();
        bytes.truncate(bytes.len() - 8);
        let result = parse_lut(&bytes, 15, "truncated");
        assert!(matches!(result, Err(ScapeError::LutFormat { .. })));
    }

    #[test]
    fn test_locate_lut_in_directory() {
        let dir = tempdir().unwrap();
        let nested = dir.path().join("auxdata").join("luts");
        fs::create_dir_all(&nested).unwrap();
        let path = nested.join(LUT_FILE_NAME);
        write_lut(&path, &small_lut(6)).unwrap();

        let found = locate_lut(dir.path(), LUT_FILE_NAME).unwrap();
        assert_eq!(found, path);
        assert!(locate_lut(dir.path(), "MISSING").is_err());
    }
}
