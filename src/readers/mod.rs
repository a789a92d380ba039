pub mod geotiff;
pub mod types;
pub mod utils;

pub use geotiff::GeoTiffReader;
pub use types::{DataReader, FileType, Raster, ReadError};
pub use utils::{band_files, reader_from_filetype};

use std::path::Path;

pub fn create_reader<P: AsRef<Path>>(file_name: P) -> Result<Box<dyn DataReader>, ReadError> {
    let path = file_name.as_ref();
    match reader_from_filetype(path)? {
        FileType::GeoTiff => Ok(Box::new(GeoTiffReader {
            file_name: path.to_path_buf(),
        })),
    }
}

/// Reads a raster through the reader matching its file type.
pub fn read_raster<P: AsRef<Path>>(file_name: P) -> Result<Raster, ReadError> {
    create_reader(file_name)?.read_data()
}
