//! Per-cell visibility estimation.
//!
//! A coarse estimate comes from the darkest pixel of the cell: the visibility is
//! raised until the modelled path radiance no longer exceeds the minimum observed
//! TOA radiance in any of the visible bands. Sufficiently clear cells then refine
//! the estimate by fitting a vegetation/soil mixing model to reference pixels.

use tracing::debug;

use crate::constants::{
    CELL_REFINE_THRESHOLD, CELL_VISIBILITY_THRESHOLD, NDVI_FRACTION_OFFSET, NDVI_FRACTION_SLOPE,
    NUM_REF_PIXELS, OUTLIER_FACTOR, POWELL_FTOL, RHO_VEG, VISIBILITY_SPREAD_FACTOR,
    VISIBILITY_STEPS, WV_INIT,
};
use crate::lut::LutHandle;
use crate::math::powell;
use crate::math::stats::{mean, min_with_index, stdev};
use crate::retrieval::cell::{Cell, CellStatistics};
use crate::retrieval::merit::{
    NUM_MERIT_VARIABLES, ToaMinimization, VIS_INDEX, VisibilityTables, band_weights,
};
use crate::retrieval::reference::ReferencePixelSet;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisibilitySettings {
    /// Minimum clear fraction for a cell to get a visibility at all.
    pub visibility_threshold: f64,
    /// Minimum clear fraction for the reference pixel refinement.
    pub refine_threshold: f64,
    pub refine: bool,
    pub powell_max_iterations: usize,
}

impl Default for VisibilitySettings {
    fn default() -> Self {
        Self {
            visibility_threshold: CELL_VISIBILITY_THRESHOLD,
            refine_threshold: CELL_REFINE_THRESHOLD,
            refine: true,
            powell_max_iterations: 200,
        }
    }
}

/// Visibility of one cell [km].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CellEstimate {
    pub visibility: f64,
    pub refined: bool,
    pub converged: bool, // false when a minimization hit its iteration cap
}

pub struct VisibilityEstimator<'a> {
    lut: &'a LutHandle,
    settings: VisibilitySettings,
    dark_bands: Vec<usize>,
    band_weights: Vec<f64>,
}

impl<'a> VisibilityEstimator<'a> {
    pub fn new(lut: &'a LutHandle, settings: VisibilitySettings) -> Self {
        Self {
            lut,
            settings,
            dark_bands: lut.bands().visible_bands(),
            band_weights: band_weights(lut.bands()),
        }
    }

    pub fn settings(&self) -> &VisibilitySettings {
        &self.settings
    }

    /// Visibility of a cell, `None` when the cell is not clear enough.
    pub fn estimate(&self, cell: &Cell) -> Option<CellEstimate> {
        let clear = cell.clear_fraction();
        if clear <= self.settings.visibility_threshold {
            return None;
        }
        let stats = cell.statistics()?;

        let coarse = self.coarse_visibility(cell, &stats);
        let mut estimate = CellEstimate {
            visibility: coarse,
            refined: false,
            converged: true,
        };

        if self.settings.refine && clear > self.settings.refine_threshold {
            match ReferencePixelSet::extract(cell, &stats, self.lut.bands()) {
                Some(reference) => {
                    let (visibility, converged) =
                        self.refine_visibility(cell, &stats, &reference, coarse);
                    estimate = CellEstimate {
                        visibility,
                        refined: true,
                        converged,
                    };
                }
                None => debug!(
                    col = cell.rect.col,
                    row = cell.rect.row,
                    "No reference pixels, keeping coarse visibility"
                ),
            }
        }

        estimate.visibility = estimate
            .visibility
            .clamp(self.lut.vis_min(), self.lut.vis_max());
        Some(estimate)
    }

    /// Dark pixel visibility search with a coarse and a fine step.
    pub fn coarse_visibility(&self, cell: &Cell, stats: &CellStatistics) -> f64 {
        let vis_min = self.lut.vis_min();
        let vis_max = self.lut.vis_max();

        let mut vis = vis_min - VISIBILITY_STEPS[0];
        for (pass, &step) in VISIBILITY_STEPS.iter().enumerate() {
            if pass > 0 {
                vis = (vis - VISIBILITY_STEPS[0]).max(vis_min);
            }
            let mut repeat = true;
            while vis + step < vis_max && repeat {
                vis += step;
                let params = self
                    .lut
                    .interpolate(&cell.coordinate(stats.elevation_mean, vis, WV_INIT));
                // the atmosphere alone may not be brighter than the darkest pixel
                repeat = self
                    .dark_bands
                    .iter()
                    .any(|&band| stats.toa_min[band] <= params.path_radiance(band));
            }
        }

        (vis - VISIBILITY_STEPS[1]).clamp(vis_min, vis_max)
    }

    /// Refined visibility from the reference pixel sets, with the coarse value as
    /// lower limit. Also reports whether every minimization converged.
    pub fn refine_visibility(
        &self,
        cell: &Cell,
        stats: &CellStatistics,
        reference: &ReferencePixelSet,
        coarse: f64,
    ) -> (f64, bool) {
        let tables =
            VisibilityTables::tabulate(self.lut, cell, stats.elevation_mean, stats.cos_sza_mean);
        let start = self.start_vector(reference, coarse);

        let mut converged = true;
        let visibilities: Vec<f64> = (0..reference.n_sets())
            .map(|set| {
                let mut residuals = Vec::with_capacity(RHO_VEG.len());
                let mut candidates = Vec::with_capacity(RHO_VEG.len());
                for rho_veg in RHO_VEG.iter() {
                    let mut merit = ToaMinimization::new(
                        &tables,
                        reference,
                        set,
                        rho_veg,
                        &self.band_weights,
                        coarse,
                    );
                    let (x, normalised, ok) = self.minimize(&mut merit, &start);
                    converged &= ok;
                    residuals.push(normalised);
                    candidates.push(x[VIS_INDEX]);
                }
                let best = min_with_index(&residuals).map_or(0, |(i, _)| i);
                candidates[best]
            })
            .collect();

        (combine_set_visibilities(&visibilities), converged)
    }

    // Mixing fractions from the NDVI of the first reference set
    fn start_vector(&self, reference: &ReferencePixelSet, coarse: f64) -> [f64; NUM_MERIT_VARIABLES] {
        let roles = self.lut.bands().roles();
        let nir = reference.get(roles.nir_reference, 0);
        let red = reference.get(roles.ndvi_red, 0);

        let mut start = [0.0; NUM_MERIT_VARIABLES];
        for j in 0..NUM_REF_PIXELS {
            let ndvi = (nir[j] - red[j]) / (nir[j] + red[j]);
            let m = NDVI_FRACTION_SLOPE * ndvi + NDVI_FRACTION_OFFSET;
            start[2 * j] = m.max(0.0);
            start[2 * j + 1] = (1.0 - m).max(0.0);
        }
        start[VIS_INDEX] = coarse + 0.01;
        start
    }

    // One Powell solve with a single outlier rejection retry. Returns the solution,
    // the residual normalised by the number of retained pixels and convergence.
    fn minimize(&self, merit: &mut ToaMinimization, start: &[f64]) -> (Vec<f64>, f64, bool) {
        let max_iter = self.settings.powell_max_iterations;
        let mut result = powell(|x| merit.evaluate(x), start, POWELL_FTOL, max_iter);
        let mut converged = result.converged;

        let mut rejected = 0;
        if let Some(chi) = merit.residuals(&result.x) {
            let chi_mean = mean(&chi);
            let mut weights = *merit.pixel_weights();
            for (weight, c) in weights.iter_mut().zip(chi) {
                if c > OUTLIER_FACTOR * chi_mean {
                    *weight = 0.0;
                    rejected += 1;
                }
            }
            if rejected > 0 {
                merit.set_pixel_weights(weights);
                result = powell(|x| merit.evaluate(x), &result.x, POWELL_FTOL, max_iter);
                converged &= result.converged;
            }
        }

        let normalised = result.fmin / (NUM_REF_PIXELS - rejected) as f64;
        (result.x, normalised, converged)
    }
}

/// Mean of the set visibilities within the spread limit around their mean.
pub fn combine_set_visibilities(values: &[f64]) -> f64 {
    if values.len() == 1 {
        return values[0];
    }
    let m = mean(values);
    let limit = VISIBILITY_SPREAD_FACTOR * stdev(values);
    let inside: Vec<f64> = values
        .iter()
        .copied()
        .filter(|v| (v - m).abs() <= limit)
        .collect();
    if inside.is_empty() { m } else { mean(&inside) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{RADIANCE_SCALE, RHO_SOIL};
    use crate::lut::synthetic::synthetic_handle;
    use crate::retrieval::cell::CellRect;
    use crate::retrieval::merit::toa_radiance;
    use crate::scene::PixelGeometry;

    // Uniform cell whose radiance is `level` times the band solar flux
    fn uniform_cell(lut: &LutHandle, level: f64, width: usize) -> Cell {
        let n = width * width;
        let toa = lut
            .bands()
            .solar_flux()
            .iter()
            .map(|f| vec![level * f * RADIANCE_SCALE; n])
            .collect();
        Cell {
            rect: CellRect {
                col: 0,
                row: 0,
                x0: 0,
                y0: 0,
                width,
                height: width,
            },
            geometry: PixelGeometry {
                vza: 20.0,
                sza: 35.0,
                raa: 90.0,
            },
            elevation: vec![lut.hsf_min(); n],
            cos_sza: vec![35.0f64.to_radians().cos(); n],
            toa,
            valid: vec![true; n],
        }
    }

    #[test]
    fn test_uniform_cell_terminates_within_limits() {
        let lut = synthetic_handle();
        let estimator = VisibilityEstimator::new(&lut, VisibilitySettings::default());
        let cell = uniform_cell(&lut, 0.05, 6);

        let estimate = estimator.estimate(&cell).unwrap();
        assert!(!estimate.refined);
        assert!(estimate.visibility >= lut.vis_min() && estimate.visibility <= lut.vis_max());
        // path radiance falls below 5 % of the flux just above 60 km
        assert!((estimate.visibility - 60.0).abs() < 1.0, "{}", estimate.visibility);
    }

    #[test]
    fn test_coarse_search_is_monotone_in_dark_pixel() {
        let lut = synthetic_handle();
        let estimator = VisibilityEstimator::new(&lut, VisibilitySettings::default());
        let cell = uniform_cell(&lut, 0.05, 4);
        let mut stats = cell.statistics().unwrap();
        let base = stats.toa_min.clone();

        let mut previous = f64::INFINITY;
        for scale in [0.2, 0.6, 1.0, 1.3, 1.8, 3.0] {
            stats.toa_min = base.iter().map(|v| v * scale).collect();
            let vis = estimator.coarse_visibility(&cell, &stats);
            assert!(vis >= lut.vis_min() && vis <= lut.vis_max());
            assert!(vis <= previous, "scale {scale}: {vis} > {previous}");
            previous = vis;
        }
    }

    #[test]
    fn test_single_band_increase_does_not_raise_estimate() {
        let lut = synthetic_handle();
        let estimator = VisibilityEstimator::new(&lut, VisibilitySettings::default());
        let cell = uniform_cell(&lut, 0.05, 4);
        let mut stats = cell.statistics().unwrap();
        let before = estimator.coarse_visibility(&cell, &stats);
        stats.toa_min[2] *= 1.5;
        let after = estimator.coarse_visibility(&cell, &stats);
        assert!(after <= before);
    }

    #[test]
    fn test_cloudy_cell_has_no_visibility() {
        let lut = synthetic_handle();
        let estimator = VisibilityEstimator::new(&lut, VisibilitySettings::default());
        let mut cell = uniform_cell(&lut, 0.05, 4);
        for v in cell.valid.iter_mut().take(11) {
            *v = false;
        }
        // 5 of 16 clear
        assert!(estimator.estimate(&cell).is_none());
    }

    #[test]
    fn test_refinement_recovers_generating_visibility() {
        let lut = synthetic_handle();
        let estimator = VisibilityEstimator::new(&lut, VisibilitySettings::default());
        let cell = uniform_cell(&lut, 0.05, 4);
        let stats = cell.statistics().unwrap();
        let tables =
            VisibilityTables::tabulate(&lut, &cell, stats.elevation_mean, stats.cos_sza_mean);

        let truth = 50.0;
        let fractions = [(0.8, 0.2), (0.7, 0.3), (0.4, 0.6), (0.3, 0.7), (0.1, 0.9)];
        let toa = (0..15)
            .map(|band| {
                let (lpw, etw, sab) = tables.at(band, truth);
                let mut values = [0.0; NUM_REF_PIXELS];
                for (v, (veg, soil)) in values.iter_mut().zip(fractions) {
                    let rho = veg * RHO_VEG[0][band] + soil * RHO_SOIL[band];
                    *v = toa_radiance(lpw, etw, sab, rho);
                }
                vec![values]
            })
            .collect();
        let reference = ReferencePixelSet::from_values(toa);

        let (vis, _) = estimator.refine_visibility(&cell, &stats, &reference, 30.0);
        assert!(vis >= 30.0 && vis < 100.0);
        assert!((vis - truth).abs() < 5.0, "{vis}");
    }

    #[test]
    fn test_combine_set_visibilities() {
        assert_eq!(combine_set_visibilities(&[42.0]), 42.0);
        // 60 lies outside 1.5 standard deviations of the other values
        let values = [20.0, 21.0, 20.5, 19.5, 20.0, 21.0, 19.0, 60.0];
        let combined = combine_set_visibilities(&values);
        assert!((combined - 20.142857).abs() < 1e-5, "{combined}");
        // two values are always within 1.5 standard deviations of their mean
        assert!((combine_set_visibilities(&[10.0, 30.0]) - 20.0).abs() < 1e-12);
    }
}
