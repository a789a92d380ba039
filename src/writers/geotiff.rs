use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;
use tiff::encoder::{TiffEncoder, colortype};
use tracing::info;

use crate::error::{Result, ScapeError};
use crate::readers::Raster;
use crate::utils::{RasterStatistics, log_raster_statistics};

/// Description written next to every product as `<name>.json`.
#[derive(Debug, Clone, Serialize)]
pub struct ProductMetadata {
    pub name: String,
    pub unit: String,
    pub no_data_value: f64,
    pub width: u32,
    pub height: u32,
    pub cell_size: usize,
    pub acquisition_date: NaiveDate,
    pub statistics: RasterStatistics,
}

/// Writes float32 GeoTIFF products into an output directory.
pub struct GeoTiffWriter {
    output_directory: PathBuf,
    acquisition_date: NaiveDate,
    cell_size: usize,
}

impl GeoTiffWriter {
    pub fn new<P: AsRef<Path>>(
        output_directory: P,
        acquisition_date: NaiveDate,
        cell_size: usize,
    ) -> Result<Self> {
        let output_directory = output_directory.as_ref().to_path_buf();
        std::fs::create_dir_all(&output_directory)?;
        Ok(Self {
            output_directory,
            acquisition_date,
            cell_size,
        })
    }

    /// Writes `<name>.tif` and its JSON sidecar, returning the image path.
    pub fn write(&self, name: &str, unit: &str, no_data: f64, raster: &Raster) -> Result<PathBuf> {
        let path = self.output_directory.join(format!("{name}.tif"));
        write_geotiff(&path, raster)?;

        let statistics = RasterStatistics::compute(&raster.buffer, no_data as f32);
        log_raster_statistics(name, unit, &statistics);

        let metadata = ProductMetadata {
            name: name.to_string(),
            unit: unit.to_string(),
            no_data_value: no_data,
            width: raster.width,
            height: raster.height,
            cell_size: self.cell_size,
            acquisition_date: self.acquisition_date,
            statistics,
        };
        let sidecar = File::create(self.output_directory.join(format!("{name}.json")))?;
        serde_json::to_writer_pretty(BufWriter::new(sidecar), &metadata)?;

        info!("Saved {} to: {}", name, path.display());
        Ok(path)
    }
}

/// Writes a single band float32 TIFF.
pub fn write_geotiff<P: AsRef<Path>>(path: P, raster: &Raster) -> Result<()> {
    let path = path.as_ref();
    let file = File::create(path)?;
    let mut encoder = TiffEncoder::new(BufWriter::new(file))
        .map_err(|e| ScapeError::Output(format!("{}: {}", path.display(), e)))?;
    encoder
        .write_image::<colortype::Gray32Float>(raster.width, raster.height, &raster.buffer)
        .map_err(|e| ScapeError::Output(format!("{}: {}", path.display(), e)))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::readers::read_raster;
    use tempfile::tempdir;

    #[test]
    fn test_written_product_reads_back() {
        let dir = tempdir().unwrap();
        let date = NaiveDate::from_ymd_opt(2011, 7, 2).expect("Invalid date");
        let writer = GeoTiffWriter::new(dir.path().join("out"), date, 30).unwrap();

        let raster = Raster::from_fn(4, 3, |x, y| if x == 0 { -1.0 } else { (x + 10 * y) as f32 });
        let path = writer.write("aot550", "1", -1.0, &raster).unwrap();

        let read = read_raster(&path).unwrap();
        assert_eq!(read, raster);

        let sidecar = std::fs::read_to_string(dir.path().join("out").join("aot550.json")).unwrap();
        let json: serde_json::Value = serde_json::from_str(&sidecar).unwrap();
        assert_eq!(json["statistics"]["valid"], 9);
        assert_eq!(json["acquisition_date"], "2011-07-02");
        assert_eq!(json["cell_size"], 30);
    }
}
