use crate::readers::Raster;

/// Surface elevation source in metres; NaN when unknown.
pub trait ElevationProvider: Sync {
    fn elevation_m(&self, x: usize, y: usize) -> f64;
}

/// Elevation from a digital elevation model raster.
#[derive(Debug, Clone)]
pub struct RasterElevation {
    raster: Raster,
    no_data: Option<f32>,
}

impl RasterElevation {
    pub fn new(raster: Raster) -> Self {
        Self {
            raster,
            no_data: None,
        }
    }

    pub fn with_no_data(raster: Raster, no_data: f32) -> Self {
        Self {
            raster,
            no_data: Some(no_data),
        }
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }
}

impl ElevationProvider for RasterElevation {
    fn elevation_m(&self, x: usize, y: usize) -> f64 {
        let sample = self.raster.get(x, y);
        if Some(sample) == self.no_data {
            f64::NAN
        } else {
            sample as f64
        }
    }
}

/// No elevation information: every pixel maps to the lowest table level.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeaLevel;

impl ElevationProvider for SeaLevel {
    fn elevation_m(&self, _x: usize, _y: usize) -> f64 {
        f64::NAN
    }
}
