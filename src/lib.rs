//! SCAPE-M atmospheric retrieval for MERIS scenes.
//!
//! Cell-wise visibility from dark and reference pixels, conversion to aerosol
//! optical thickness, and per-pixel water vapour and surface reflectance, all
//! driven by a radiative transfer lookup table.

pub mod config;
pub mod constants;
pub mod error;
pub mod lut;
pub mod math;
pub mod pipeline;
pub mod readers;
pub mod retrieval;
pub mod sat_bands;
pub mod scene;
pub mod solar;
pub mod utils;
pub mod writers;

pub use error::{Result, ScapeError};
pub use lut::LutHandle;
pub use pipeline::{Pipeline, RetrievalSettings, SceneResult};
