use std::f64::consts::PI;

use crate::constants::{MERIT_PENALTY, NUM_REF_PIXELS, REF_PIXEL_WEIGHTS, RHO_SOIL, WV_INIT};
use crate::lut::{AtmParam, LutHandle};
use crate::retrieval::cell::Cell;
use crate::retrieval::reference::ReferencePixelSet;
use crate::sat_bands::SatBands;

/// Number of free variables: two mixing fractions per reference pixel plus visibility.
pub const NUM_MERIT_VARIABLES: usize = 2 * NUM_REF_PIXELS + 1;

/// Index of the visibility in the parameter vector.
pub const VIS_INDEX: usize = 2 * NUM_REF_PIXELS;

/// Atmospheric terms tabulated on the visibility nodes at the default water
/// vapour, for the geometry and mean elevation of one cell.
#[derive(Debug, Clone)]
pub struct VisibilityTables {
    vis_grid: Vec<f64>,
    lpw: Vec<Vec<f64>>, // [band][vis]
    etw: Vec<Vec<f64>>,
    sab: Vec<Vec<f64>>,
}

impl VisibilityTables {
    pub fn tabulate(lut: &LutHandle, cell: &Cell, elevation_mean: f64, cos_sza_mean: f64) -> Self {
        let vis_grid = lut.vis_grid().to_vec();
        let n_bands = lut.bands().len();
        let mut lpw = vec![Vec::with_capacity(vis_grid.len()); n_bands];
        let mut etw = vec![Vec::with_capacity(vis_grid.len()); n_bands];
        let mut sab = vec![Vec::with_capacity(vis_grid.len()); n_bands];

        for &vis in &vis_grid {
            let coord = cell.coordinate(elevation_mean, lut.clamp_visibility(vis), WV_INIT);
            let params = lut.interpolate(&coord);
            for band in 0..n_bands {
                lpw[band].push(params.get(band, AtmParam::PathRadiance));
                etw[band].push(params.total_irradiance(band, cos_sza_mean));
                sab[band].push(params.get(band, AtmParam::SphericalAlbedo));
            }
        }

        Self {
            vis_grid,
            lpw,
            etw,
            sab,
        }
    }

    pub fn vis_grid(&self) -> &[f64] {
        &self.vis_grid
    }

    /// Path radiance, total irradiance and spherical albedo of a band at `vis`.
    pub fn at(&self, band: usize, vis: f64) -> (f64, f64, f64) {
        let grid = &self.vis_grid;
        let last = grid.len() - 2;
        let inf = grid
            .iter()
            .take(last + 1)
            .rposition(|&node| vis >= node)
            .unwrap_or(0);
        let (x0, x1) = (grid[inf], grid[inf + 1]);
        let delta = x1 - x0;
        let lerp = |y: &[f64]| ((y[inf + 1] - y[inf]) * vis + y[inf] * x1 - y[inf + 1] * x0) / delta;
        (lerp(&self.lpw[band]), lerp(&self.etw[band]), lerp(&self.sab[band]))
    }
}

/// Inverse wavelength weights of the TOA residuals; absorption bands get no weight.
pub fn band_weights(bands: &SatBands) -> Vec<f64> {
    let roles = bands.roles();
    bands
        .wavelengths()
        .iter()
        .enumerate()
        .map(|(i, wl)| if roles.is_excluded(i) { 0.0 } else { 1000.0 / wl })
        .collect()
}

/// Modelled TOA radiance over a Lambertian surface.
pub fn toa_radiance(lpw: f64, etw: f64, sab: f64, rho: f64) -> f64 {
    lpw + rho * etw / (PI * (1.0 - sab * rho))
}

/// Weighted TOA misfit of a reference set for a vegetation/soil mixing model.
///
/// The parameter vector holds, for each reference pixel, the vegetation and soil
/// fractions, followed by the visibility.
pub struct ToaMinimization<'a> {
    tables: &'a VisibilityTables,
    reference: &'a ReferencePixelSet,
    set: usize,
    rho_veg: &'a [f64],
    band_weights: &'a [f64],
    pixel_weights: [f64; NUM_REF_PIXELS],
    vis_lower: f64,
    vis_upper: f64,
}

impl<'a> ToaMinimization<'a> {
    pub fn new(
        tables: &'a VisibilityTables,
        reference: &'a ReferencePixelSet,
        set: usize,
        rho_veg: &'a [f64],
        band_weights: &'a [f64],
        vis_lower: f64,
    ) -> Self {
        let vis_upper = tables.vis_grid()[tables.vis_grid().len() - 1];
        Self {
            tables,
            reference,
            set,
            rho_veg,
            band_weights,
            pixel_weights: REF_PIXEL_WEIGHTS,
            vis_lower,
            vis_upper,
        }
    }

    pub fn pixel_weights(&self) -> &[f64; NUM_REF_PIXELS] {
        &self.pixel_weights
    }

    pub fn set_pixel_weights(&mut self, weights: [f64; NUM_REF_PIXELS]) {
        self.pixel_weights = weights;
    }

    fn is_admissible(&self, x: &[f64]) -> bool {
        let vis = x[VIS_INDEX];
        x.iter().all(|&v| v >= 0.0) && vis >= self.vis_lower && vis < self.vis_upper
    }

    /// Unweighted residual of each reference pixel, `None` outside the admissible domain.
    pub fn residuals(&self, x: &[f64]) -> Option<[f64; NUM_REF_PIXELS]> {
        if !self.is_admissible(x) {
            return None;
        }
        let vis = x[VIS_INDEX];
        let mut chi = [0.0; NUM_REF_PIXELS];

        for band in 0..self.reference.n_bands() {
            let weight = self.band_weights[band];
            if weight == 0.0 {
                continue;
            }
            let (lpw, etw, sab) = self.tables.at(band, vis);
            let observed = self.reference.get(band, self.set);
            for (j, residual) in chi.iter_mut().enumerate() {
                let rho = x[2 * j] * self.rho_veg[band] + x[2 * j + 1] * RHO_SOIL[band];
                let diff = weight * (observed[j] - toa_radiance(lpw, etw, sab, rho));
                *residual += diff * diff;
            }
        }

        Some(chi)
    }

    pub fn evaluate(&self, x: &[f64]) -> f64 {
        match self.residuals(x) {
            Some(chi) => chi
                .iter()
                .zip(self.pixel_weights.iter())
                .map(|(c, w)| c * w)
                .sum(),
            None => MERIT_PENALTY,
        }
    }
}
