pub mod handle;
pub mod lookup_table;
pub mod reader;

#[cfg(test)]
pub(crate) mod synthetic;

// Re-export the main structures for convenience
pub use handle::LutHandle;
pub use lookup_table::{AtmLut, AtmParam, AtmParameters, Axis, LutCoordinate};
pub use reader::{LUT_FILE_NAME, read_lut, write_lut};
