//! Conversion of visibility to aerosol optical thickness at 550 nm.
//!
//! For every elevation level of a reference grid, `ln(AOT)` is regressed on
//! `ln(visibility)`. A pixel's AOT is the fitted power law evaluated at the two
//! elevation levels around the pixel and interpolated linearly in elevation.

use crate::constants::{
    AEROSOL_SCALE_HEIGHT, AOT_NODATA, KOSCHMIEDER, RAYLEIGH_EXTINCTION_550,
};
use crate::error::{Result, ScapeError};
use crate::lut::LutHandle;
use crate::math::stats::linear_fit;
use crate::retrieval::field::is_valid_visibility;

const MIN_AOT: f64 = 1.0e-4;

/// AOT at 550 nm tabulated over elevation [km] and visibility [km].
#[derive(Debug, Clone, PartialEq)]
pub struct AotReferenceGrid {
    hsf: Vec<f64>,
    vis: Vec<f64>,
    aot: Vec<Vec<f64>>, // [hsf][vis]
}

impl AotReferenceGrid {
    pub fn new(hsf: Vec<f64>, vis: Vec<f64>, aot: Vec<Vec<f64>>) -> Result<Self> {
        if hsf.len() < 2 || vis.len() < 2 {
            return Err(ScapeError::Lut(
                "AOT reference grid needs at least 2 elevations and 2 visibilities".to_string(),
            ));
        }
        if aot.len() != hsf.len() {
            return Err(ScapeError::dimension_mismatch(
                "AOT grid rows",
                hsf.len(),
                aot.len(),
            ));
        }
        for row in &aot {
            if row.len() != vis.len() {
                return Err(ScapeError::dimension_mismatch(
                    "AOT grid columns",
                    vis.len(),
                    row.len(),
                ));
            }
            if row.iter().any(|&v| !(v > 0.0)) {
                return Err(ScapeError::Lut(
                    "AOT reference values must be positive".to_string(),
                ));
            }
        }
        Ok(Self { hsf, vis, aot })
    }

    /// Reference grid from the Koschmieder relation with an exponential aerosol
    /// profile.
    pub fn koschmieder(hsf: &[f64], vis: &[f64]) -> Self {
        let aot = hsf
            .iter()
            .map(|&h| {
                vis.iter()
                    .map(|&v| {
                        let extinction = KOSCHMIEDER / v - RAYLEIGH_EXTINCTION_550;
                        (extinction * AEROSOL_SCALE_HEIGHT * (-h / AEROSOL_SCALE_HEIGHT).exp())
                            .max(MIN_AOT)
                    })
                    .collect()
            })
            .collect();
        Self {
            hsf: hsf.to_vec(),
            vis: vis.to_vec(),
            aot,
        }
    }

    pub fn hsf(&self) -> &[f64] {
        &self.hsf
    }

    pub fn vis(&self) -> &[f64] {
        &self.vis
    }

    pub fn aot(&self, hsf_index: usize, vis_index: usize) -> f64 {
        self.aot[hsf_index][vis_index]
    }
}

/// Log-linear visibility to AOT model, one fit per elevation level.
#[derive(Debug, Clone)]
pub struct VisibilityToAot {
    hsf: Vec<f64>,
    coefficients: Vec<(f64, f64)>,
}

impl VisibilityToAot {
    pub fn new(grid: &AotReferenceGrid) -> Result<Self> {
        let ln_vis: Vec<f64> = grid.vis.iter().map(|v| v.ln()).collect();
        let coefficients = grid
            .aot
            .iter()
            .map(|row| {
                let ln_aot: Vec<f64> = row.iter().map(|v| v.ln()).collect();
                linear_fit(&ln_vis, &ln_aot).ok_or_else(|| {
                    ScapeError::Lut("degenerate visibility axis in AOT reference grid".to_string())
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            hsf: grid.hsf.clone(),
            coefficients,
        })
    }

    /// Model on the Koschmieder grid over the table's elevation and visibility nodes.
    pub fn from_lut(lut: &LutHandle) -> Result<Self> {
        Self::new(&AotReferenceGrid::koschmieder(lut.hsf_grid(), lut.vis_grid()))
    }

    /// AOT at 550 nm for a visibility [km] and elevation [km].
    ///
    /// Returns [`AOT_NODATA`] for a missing visibility or an elevation below the
    /// lowest level.
    pub fn aot550(&self, visibility: f64, hsf: f64) -> f64 {
        if !is_valid_visibility(visibility) {
            return AOT_NODATA;
        }
        let Some(index) = self.hsf.iter().rposition(|&level| hsf >= level) else {
            return AOT_NODATA;
        };
        let index = index.min(self.hsf.len() - 2);

        let ln_vis = visibility.ln();
        let at_level = |i: usize| {
            let (a, b) = self.coefficients[i];
            (a + b * ln_vis).exp()
        };
        let fraction = (hsf - self.hsf[index]) / (self.hsf[index + 1] - self.hsf[index]);
        let lower = at_level(index);
        lower + (at_level(index + 1) - lower) * fraction
    }
}
