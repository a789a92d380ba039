use chrono::NaiveDate;

use serde::Deserialize;
use serde::Deserializer;
use serde::de::Error;

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use crate::constants::{CELL_REFINE_THRESHOLD, CELL_VISIBILITY_THRESHOLD};
use crate::lut::LUT_FILE_NAME;

pub mod error;
pub use error::ConfigError;

pub mod resolution;
pub use resolution::Resolution;

/// Sun and view angle rasters [degrees].
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct GeometryFiles {
    pub sza: PathBuf,
    pub vza: PathBuf,
    pub saa: PathBuf,
    pub vaa: PathBuf,
}

#[derive(Debug, Clone)]
pub struct Config {
    lut_path: PathBuf,
    lut_file_name: String,
    acquisition_date: NaiveDate,
    resolution: Resolution,
    cell_size: Option<usize>,
    radiance_pattern: String,
    geometry: GeometryFiles,
    elevation: Option<PathBuf>,
    elevation_no_data: Option<f32>,
    flags: PathBuf,
    output_directory: PathBuf,
    compute_over_water: bool,
    use_dem: bool,
    refine_visibility: bool,
    write_rho_toa: bool,
    write_reflectance_band2: bool,
    visibility_threshold: f64,
    refine_threshold: f64,
    powell_max_iterations: usize,
    brent_max_iterations: usize,
    brent_tolerance: f64,
}

fn default_true() -> bool {
    true
}

fn default_lut_file_name() -> String {
    LUT_FILE_NAME.to_string()
}

fn default_visibility_threshold() -> f64 {
    CELL_VISIBILITY_THRESHOLD
}

fn default_refine_threshold() -> f64 {
    CELL_REFINE_THRESHOLD
}

fn default_powell_max_iterations() -> usize {
    200
}

fn default_brent_max_iterations() -> usize {
    100
}

fn default_brent_tolerance() -> f64 {
    1.0e-6
}

// Deserializes a Config, checking the date format, the clear fraction thresholds
// and the iteration settings.
impl<'de> Deserialize<'de> for Config {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct ConfigHelper {
            lut_path: PathBuf,
            #[serde(default = "default_lut_file_name")]
            lut_file_name: String,
            acquisition_date: String,
            #[serde(default)]
            resolution: Resolution,
            cell_size: Option<usize>,
            radiance_pattern: String,
            geometry: GeometryFiles,
            elevation: Option<PathBuf>,
            elevation_no_data: Option<f32>,
            flags: PathBuf,
            output_directory: PathBuf,
            #[serde(default)]
            compute_over_water: bool,
            #[serde(default = "default_true")]
            use_dem: bool,
            #[serde(default = "default_true")]
            refine_visibility: bool,
            #[serde(default)]
            write_rho_toa: bool,
            #[serde(default = "default_true")]
            write_reflectance_band2: bool,
            #[serde(default = "default_visibility_threshold")]
            visibility_threshold: f64,
            #[serde(default = "default_refine_threshold")]
            refine_threshold: f64,
            #[serde(default = "default_powell_max_iterations")]
            powell_max_iterations: usize,
            #[serde(default = "default_brent_max_iterations")]
            brent_max_iterations: usize,
            #[serde(default = "default_brent_tolerance")]
            brent_tolerance: f64,
        }

        let helper = ConfigHelper::deserialize(deserializer)?;

        let acquisition_date = NaiveDate::parse_from_str(&helper.acquisition_date, "%Y-%m-%d")
            .map_err(|e| D::Error::custom(ConfigError::DateParse(e)))?;

        for (name, value) in [
            ("visibility_threshold", helper.visibility_threshold),
            ("refine_threshold", helper.refine_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(D::Error::custom(ConfigError::Threshold(name)));
            }
        }
        if helper.refine_threshold < helper.visibility_threshold {
            return Err(D::Error::custom(ConfigError::ThresholdOrder));
        }

        if helper.powell_max_iterations == 0 {
            return Err(D::Error::custom(ConfigError::Iterations(
                "powell_max_iterations",
            )));
        }
        if helper.brent_max_iterations == 0 {
            return Err(D::Error::custom(ConfigError::Iterations(
                "brent_max_iterations",
            )));
        }
        if !(helper.brent_tolerance > 0.0) {
            return Err(D::Error::custom(ConfigError::Tolerance));
        }
        if helper.cell_size == Some(0) {
            return Err(D::Error::custom(ConfigError::CellSize));
        }

        Ok(Config {
            lut_path: helper.lut_path,
            lut_file_name: helper.lut_file_name,
            acquisition_date,
            resolution: helper.resolution,
            cell_size: helper.cell_size,
            radiance_pattern: helper.radiance_pattern,
            geometry: helper.geometry,
            elevation: helper.elevation,
            elevation_no_data: helper.elevation_no_data,
            flags: helper.flags,
            output_directory: helper.output_directory,
            compute_over_water: helper.compute_over_water,
            use_dem: helper.use_dem,
            refine_visibility: helper.refine_visibility,
            write_rho_toa: helper.write_rho_toa,
            write_reflectance_band2: helper.write_reflectance_band2,
            visibility_threshold: helper.visibility_threshold,
            refine_threshold: helper.refine_threshold,
            powell_max_iterations: helper.powell_max_iterations,
            brent_max_iterations: helper.brent_max_iterations,
            brent_tolerance: helper.brent_tolerance,
        })
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
        let file = File::open(path)?;
        let reader = BufReader::new(file);

        let config: Config = serde_json::from_reader(reader).map_err(ConfigError::from)?;

        Ok(config)
    }

    pub fn lut_path(&self) -> &Path {
        &self.lut_path
    }

    pub fn lut_file_name(&self) -> &str {
        &self.lut_file_name
    }

    pub fn acquisition_date(&self) -> NaiveDate {
        self.acquisition_date
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Cell side in pixels: the explicit override or the resolution default.
    pub fn cell_size(&self) -> usize {
        self.cell_size
            .unwrap_or_else(|| self.resolution.pixels_per_cell())
    }

    pub fn radiance_pattern(&self) -> &str {
        &self.radiance_pattern
    }

    pub fn geometry(&self) -> &GeometryFiles {
        &self.geometry
    }

    pub fn elevation(&self) -> Option<&Path> {
        self.elevation.as_deref()
    }

    pub fn elevation_no_data(&self) -> Option<f32> {
        self.elevation_no_data
    }

    pub fn flags(&self) -> &Path {
        &self.flags
    }

    pub fn output_directory(&self) -> &Path {
        &self.output_directory
    }

    pub fn compute_over_water(&self) -> bool {
        self.compute_over_water
    }

    pub fn use_dem(&self) -> bool {
        self.use_dem
    }

    pub fn refine_visibility(&self) -> bool {
        self.refine_visibility
    }

    pub fn write_rho_toa(&self) -> bool {
        self.write_rho_toa
    }

    pub fn write_reflectance_band2(&self) -> bool {
        self.write_reflectance_band2
    }

    pub fn visibility_threshold(&self) -> f64 {
        self.visibility_threshold
    }

    pub fn refine_threshold(&self) -> f64 {
        self.refine_threshold
    }

    pub fn powell_max_iterations(&self) -> usize {
        self.powell_max_iterations
    }

    pub fn brent_max_iterations(&self) -> usize {
        self.brent_max_iterations
    }

    pub fn brent_tolerance(&self) -> f64 {
        self.brent_tolerance
    }
}
