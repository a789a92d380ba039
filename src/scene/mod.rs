pub mod classifier;
pub mod elevation;
pub mod validity;

pub use classifier::{FlagRaster, PixelClassifier, PixelFlags};
pub use elevation::{ElevationProvider, RasterElevation, SeaLevel};
pub use validity::{ClearLand, ClearLandAndWater, PixelValidity, validity_strategy};

use chrono::NaiveDate;

use crate::error::{Result, ScapeError};
use crate::readers::Raster;
use crate::sat_bands::NUM_BANDS;
use crate::solar::{radiance_scale_factor, relative_azimuth};

/// Sun and view angles per pixel [degrees].
#[derive(Debug, Clone)]
pub struct Geometry {
    pub sza: Raster,
    pub vza: Raster,
    pub saa: Raster,
    pub vaa: Raster,
}

/// Observation geometry of a single pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelGeometry {
    pub vza: f64,
    pub sza: f64,
    pub raa: f64,
}

/// A radiance scene with its geometry, classification and elevation.
pub struct Scene {
    width: usize,
    height: usize,
    radiance: Vec<Raster>,
    geometry: Geometry,
    classifier: Box<dyn PixelClassifier>,
    elevation: Box<dyn ElevationProvider>,
    acquisition_date: NaiveDate,
}

impl Scene {
    pub fn new(
        radiance: Vec<Raster>,
        geometry: Geometry,
        classifier: Box<dyn PixelClassifier>,
        elevation: Box<dyn ElevationProvider>,
        acquisition_date: NaiveDate,
    ) -> Result<Self> {
        if radiance.len() != NUM_BANDS {
            return Err(ScapeError::dimension_mismatch(
                "radiance bands",
                NUM_BANDS,
                radiance.len(),
            ));
        }
        let (width, height) = radiance[0].dimensions();

        let named = radiance
            .iter()
            .enumerate()
            .map(|(i, r)| (format!("radiance band {}", i + 1), r))
            .chain([
                ("sza".to_string(), &geometry.sza),
                ("vza".to_string(), &geometry.vza),
                ("saa".to_string(), &geometry.saa),
                ("vaa".to_string(), &geometry.vaa),
            ]);
        for (name, raster) in named {
            if raster.dimensions() != (width, height) {
                return Err(ScapeError::dimension_mismatch(
                    format!("{name} size"),
                    format!("{width}x{height}"),
                    format!("{}x{}", raster.width, raster.height),
                ));
            }
        }

        Ok(Scene {
            width,
            height,
            radiance,
            geometry,
            classifier,
            elevation,
            acquisition_date,
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn acquisition_date(&self) -> NaiveDate {
        self.acquisition_date
    }

    /// Factor converting sensor radiances to lookup table units.
    pub fn radiance_factor(&self) -> f64 {
        radiance_scale_factor(self.acquisition_date)
    }

    pub fn radiance(&self, band: usize, x: usize, y: usize) -> f64 {
        self.radiance[band].get(x, y) as f64
    }

    pub fn geometry_at(&self, x: usize, y: usize) -> PixelGeometry {
        let g = &self.geometry;
        PixelGeometry {
            vza: g.vza.get(x, y) as f64,
            sza: g.sza.get(x, y) as f64,
            raa: relative_azimuth(g.vaa.get(x, y) as f64, g.saa.get(x, y) as f64),
        }
    }

    pub fn cos_sza(&self, x: usize, y: usize) -> f64 {
        (self.geometry.sza.get(x, y) as f64).to_radians().cos()
    }

    pub fn classifier(&self) -> &dyn PixelClassifier {
        self.classifier.as_ref()
    }

    pub fn elevation(&self) -> &dyn ElevationProvider {
        self.elevation.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geometry(width: u32, height: u32) -> Geometry {
        Geometry {
            sza: Raster::filled(width, height, 60.0),
            vza: Raster::filled(width, height, 10.0),
            saa: Raster::filled(width, height, 140.0),
            vaa: Raster::filled(width, height, 100.0),
        }
    }

    #[test]
    fn test_scene_accessors() {
        let radiance = (0..NUM_BANDS).map(|b| Raster::filled(3, 2, b as f32)).collect();
        let date = NaiveDate::from_ymd_opt(2011, 7, 2).expect("Invalid date");
        let flags = FlagRaster::new(Raster::filled(3, 2, 0.0));
        let scene = Scene::new(radiance, geometry(3, 2), Box::new(flags), Box::new(SeaLevel), date).unwrap();

        assert_eq!((scene.width(), scene.height()), (3, 2));
        assert_eq!(scene.radiance(4, 2, 1), 4.0);
        assert!((scene.cos_sza(0, 0) - 0.5).abs() < 1e-7);
        let g = scene.geometry_at(1, 1);
        assert!((g.raa - 40.0).abs() < 1e-9);
        assert_eq!(g.vza, 10.0);
    }

    #[test]
    fn test_scene_rejects_mismatched_rasters() {
        let mut radiance: Vec<Raster> = (0..NUM_BANDS).map(|_| Raster::filled(3, 2, 1.0)).collect();
        radiance[7] = Raster::filled(2, 2, 1.0);
        let date = NaiveDate::from_ymd_opt(2011, 7, 2).expect("Invalid date");
        let flags = FlagRaster::new(Raster::filled(3, 2, 0.0));
        let result = Scene::new(radiance, geometry(3, 2), Box::new(flags), Box::new(SeaLevel), date);
        assert!(matches!(result, Err(ScapeError::DimensionMismatch { .. })));
    }
}
