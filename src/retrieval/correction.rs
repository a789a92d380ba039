//! Per-pixel water vapour retrieval and surface reflectance.
//!
//! Atmospheric terms are tabulated once per cell over the water vapour and
//! visibility nodes. Each pixel interpolates them at its smoothed visibility,
//! solves the 900/885 nm radiance ratio for the water vapour column with Brent's
//! method and inverts the TOA equation for every retained band.

use std::f64::consts::PI;

use crate::constants::{AC_NODATA, RADIANCE_SCALE, VIS_INIT, WV_INIT};
use crate::lut::{AtmParam, AtmParameters, LutHandle};
use crate::math::stats::grid_position;
use crate::math::{RootError, brent_root};
use crate::readers::Raster;
use crate::retrieval::cell::{Cell, CellRect, CellStatistics};
use crate::retrieval::field::is_valid_visibility;
use crate::retrieval::merit::toa_radiance;
use crate::sat_bands::{BandRoles, SatBands};
use crate::solar::toa_reflectance;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrectionSettings {
    pub brent_max_iterations: usize,
    pub brent_tolerance: f64,
    pub compute_rho_toa: bool,
}

impl Default for CorrectionSettings {
    fn default() -> Self {
        Self {
            brent_max_iterations: 100,
            brent_tolerance: 1.0e-6,
            compute_rho_toa: false,
        }
    }
}

/// Atmospheric terms of one cell at its centre geometry and mean elevation.
#[derive(Debug, Clone)]
pub struct CorrectionTables {
    n_bands: usize,
    vis_grid: Vec<f64>,
    cwv_grid: Vec<f64>,
    cwv_limits: (f64, f64),
    // [band][cwv][vis]
    lpw: Vec<f64>,
    e0tw: Vec<f64>,
    ediftw: Vec<f64>,
    sab: Vec<f64>,
    tdir: Vec<f64>,
    cos_sza_mean: f64,
    first_guess: AtmParameters, // at VIS_INIT and WV_INIT
}

impl CorrectionTables {
    pub fn tabulate(lut: &LutHandle, cell: &Cell, stats: &CellStatistics) -> Self {
        let vis_grid = lut.vis_grid().to_vec();
        let cwv_grid = lut.cwv_grid().to_vec();
        let flux = lut.bands().solar_flux();
        let n_bands = lut.bands().len();
        let size = n_bands * cwv_grid.len() * vis_grid.len();
        let index = |band: usize, w: usize, v: usize| (band * cwv_grid.len() + w) * vis_grid.len() + v;

        let mut lpw = vec![0.0; size];
        let mut e0tw = vec![0.0; size];
        let mut ediftw = vec![0.0; size];
        let mut sab = vec![0.0; size];
        let mut tdir = vec![0.0; size];

        for (w, &cwv) in cwv_grid.iter().enumerate() {
            for (v, &vis) in vis_grid.iter().enumerate() {
                let coord = cell.coordinate(stats.elevation_mean, lut.clamp_visibility(vis), cwv);
                let params = lut.interpolate(&coord);
                for band in 0..n_bands {
                    let i = index(band, w, v);
                    let direct = params.get(band, AtmParam::DirectIrradiance);
                    lpw[i] = params.get(band, AtmParam::PathRadiance);
                    e0tw[i] = direct;
                    ediftw[i] = params.get(band, AtmParam::DiffuseIrradiance);
                    sab[i] = params.get(band, AtmParam::SphericalAlbedo);

                    let denominator = params.get(band, AtmParam::GroundToSensorTransmittance)
                        * (1.0 + params.get(band, AtmParam::DirectTransmittance))
                        * flux[band]
                        * RADIANCE_SCALE;
                    tdir[i] = if denominator > 0.0 { direct / denominator } else { 0.0 };
                }
            }
        }

        let first_guess =
            lut.interpolate(&cell.coordinate(stats.elevation_mean, VIS_INIT, WV_INIT));

        Self {
            n_bands,
            cwv_limits: (lut.cwv_min(), lut.cwv_max()),
            lpw,
            e0tw,
            ediftw,
            sab,
            tdir,
            cos_sza_mean: stats.cos_sza_mean,
            first_guess,
            vis_grid,
            cwv_grid,
        }
    }

    fn index(&self, band: usize, cwv: usize, vis: usize) -> usize {
        (band * self.cwv_grid.len() + cwv) * self.vis_grid.len() + vis
    }

    pub fn cwv_grid(&self) -> &[f64] {
        &self.cwv_grid
    }

    /// Terms of one pixel over the water vapour nodes, interpolated at its
    /// visibility, with the total irradiance adjusted to the pixel sun angle.
    pub fn pixel_atmosphere(&self, visibility: f64, cos_sza: f64) -> PixelAtmosphere<'_> {
        let last = self.vis_grid.len() - 1;
        let vis = visibility.clamp(self.vis_grid[0], self.vis_grid[last]);
        let (v, t) = grid_position(&self.vis_grid, vis);
        let n = self.n_bands * self.cwv_grid.len();

        let mut lpw = Vec::with_capacity(n);
        let mut etw = Vec::with_capacity(n);
        let mut sab = Vec::with_capacity(n);
        for band in 0..self.n_bands {
            for w in 0..self.cwv_grid.len() {
                let lo = self.index(band, w, v);
                let lerp = |table: &[f64]| table[lo] + t * (table[lo + 1] - table[lo]);
                let tdir = lerp(&self.tdir);
                let irradiance = lerp(&self.e0tw) * cos_sza
                    + lerp(&self.ediftw) * (tdir * cos_sza + 1.0 - tdir * self.cos_sza_mean);
                lpw.push(lerp(&self.lpw));
                etw.push(irradiance);
                sab.push(lerp(&self.sab));
            }
        }

        PixelAtmosphere {
            cwv_grid: &self.cwv_grid,
            lpw,
            etw,
            sab,
        }
    }

    /// Surface reflectance of a band at the initial visibility and water vapour.
    pub fn reflectance_guess(&self, band: usize, toa: f64, cos_sza: f64) -> f64 {
        let p = &self.first_guess;
        let xterm = PI * (toa - p.path_radiance(band)) / p.total_irradiance(band, cos_sza);
        xterm / (1.0 + p.spherical_albedo(band) * xterm)
    }
}

/// Atmospheric terms of one pixel over the water vapour nodes, `[band][cwv]`.
#[derive(Debug, Clone)]
pub struct PixelAtmosphere<'a> {
    cwv_grid: &'a [f64],
    lpw: Vec<f64>,
    etw: Vec<f64>,
    sab: Vec<f64>,
}

impl PixelAtmosphere<'_> {
    /// Path radiance, total irradiance and spherical albedo of a band at `cwv`.
    pub fn at(&self, band: usize, cwv: f64) -> (f64, f64, f64) {
        let (w, t) = grid_position(self.cwv_grid, cwv);
        let lo = band * self.cwv_grid.len() + w;
        let lerp = |table: &[f64]| table[lo] + t * (table[lo + 1] - table[lo]);
        (lerp(&self.lpw), lerp(&self.etw), lerp(&self.sab))
    }

    /// Surface reflectance of a band for a TOA radiance at water vapour `cwv`.
    pub fn reflectance(&self, band: usize, toa: f64, cwv: f64) -> f64 {
        let (lpw, etw, sab) = self.at(band, cwv);
        let xterm = PI * (toa - lpw) / etw;
        xterm / (1.0 + sab * xterm)
    }
}

/// Mismatch between the modelled and the observed absorption to window radiance
/// ratio as a function of the water vapour column.
pub struct WaterVapourMerit<'a> {
    atmosphere: &'a PixelAtmosphere<'a>,
    roles: BandRoles,
    reflectance: [f64; 2], // window band and absorption band continuum
    observed_ratio: f64,
}

impl<'a> WaterVapourMerit<'a> {
    pub fn new(
        atmosphere: &'a PixelAtmosphere<'a>,
        roles: BandRoles,
        reflectance: [f64; 2],
        observed_ratio: f64,
    ) -> Self {
        Self {
            atmosphere,
            roles,
            reflectance,
            observed_ratio,
        }
    }

    pub fn modelled_ratio(&self, cwv: f64) -> f64 {
        let radiance = |band: usize, rho: f64| {
            let (lpw, etw, sab) = self.atmosphere.at(band, cwv);
            toa_radiance(lpw, etw, sab, rho)
        };
        radiance(self.roles.wv_absorption, self.reflectance[1])
            / radiance(self.roles.wv_reference, self.reflectance[0])
    }

    pub fn evaluate(&self, cwv: f64) -> f64 {
        self.modelled_ratio(cwv) - self.observed_ratio
    }
}

/// Corrected outputs of one cell, `[band][pixel]` in row major cell order.
#[derive(Debug, Clone)]
pub struct CellCorrection {
    pub rect: CellRect,
    pub water_vapour: Vec<f64>,
    pub reflectance: Vec<Vec<f64>>,
    pub rho_toa: Option<Vec<Vec<f64>>>,
    /// Pixels where the water vapour root was not bracketed.
    pub fallbacks: usize,
}

impl CellCorrection {
    fn no_data(rect: CellRect, n_bands: usize, with_rho_toa: bool) -> Self {
        let n = rect.len();
        Self {
            rect,
            water_vapour: vec![AC_NODATA; n],
            reflectance: vec![vec![AC_NODATA; n]; n_bands],
            rho_toa: with_rho_toa.then(|| vec![vec![AC_NODATA; n]; n_bands]),
            fallbacks: 0,
        }
    }
}

/// Water vapour and reflectances of every pixel of a cell.
///
/// Invalid pixels and pixels without a visibility keep [`AC_NODATA`].
pub fn correct_cell(
    lut: &LutHandle,
    cell: &Cell,
    visibility: &Raster,
    settings: &CorrectionSettings,
) -> CellCorrection {
    let bands = lut.bands();
    let mut result = CellCorrection::no_data(cell.rect, bands.len(), settings.compute_rho_toa);

    if let Some(rho_toa) = result.rho_toa.as_mut() {
        for (band, values) in rho_toa.iter_mut().enumerate() {
            for (i, value) in values.iter_mut().enumerate() {
                if cell.cos_sza[i] > 0.0 {
                    *value = toa_reflectance(cell.toa[band][i], bands.solar_flux()[band], cell.cos_sza[i]);
                }
            }
        }
    }

    let Some(stats) = cell.statistics() else {
        return result;
    };
    let tables = CorrectionTables::tabulate(lut, cell, &stats);
    let rect = cell.rect;

    for i in 0..cell.len() {
        if !cell.valid[i] {
            continue;
        }
        let (x, y) = (rect.x0 + i % rect.width, rect.y0 + i / rect.width);
        let vis = visibility.get(x, y) as f64;
        if !is_valid_visibility(vis) {
            continue;
        }

        let toa: Vec<f64> = cell.toa.iter().map(|band| band[i]).collect();
        let pixel = retrieve_pixel(&tables, bands, &toa, cell.cos_sza[i], vis, settings);
        if pixel.fallback {
            result.fallbacks += 1;
        }
        result.water_vapour[i] = pixel.water_vapour;
        for (band, value) in pixel.reflectance.into_iter().enumerate() {
            result.reflectance[band][i] = value;
        }
    }

    result
}

struct PixelRetrieval {
    water_vapour: f64,
    reflectance: Vec<f64>,
    fallback: bool,
}

fn retrieve_pixel(
    tables: &CorrectionTables,
    bands: &SatBands,
    toa: &[f64],
    cos_sza: f64,
    visibility: f64,
    settings: &CorrectionSettings,
) -> PixelRetrieval {
    let roles = bands.roles();
    let wl = bands.wavelengths();
    let (nir, window, absorption) = (roles.nir_reference, roles.wv_reference, roles.wv_absorption);

    // continuum reflectance under the absorption band, extrapolated from 865/885 nm
    let r_nir = tables.reflectance_guess(nir, toa[nir], cos_sza);
    let r_window = tables.reflectance_guess(window, toa[window], cos_sza);
    let r_continuum = ((r_window - r_nir) * wl[absorption] + r_nir * wl[window]
        - r_window * wl[nir])
        / (wl[window] - wl[nir]);

    let atmosphere = tables.pixel_atmosphere(visibility, cos_sza);
    let merit = WaterVapourMerit::new(
        &atmosphere,
        roles,
        [r_window, r_continuum],
        toa[absorption] / toa[window],
    );

    let (lower, upper) = tables.cwv_limits;
    let (water_vapour, fallback) = match brent_root(
        |cwv| merit.evaluate(cwv),
        lower,
        upper,
        settings.brent_tolerance,
        settings.brent_max_iterations,
    ) {
        Ok(cwv) => (cwv, false),
        Err(RootError::NoBracket { .. }) => (WV_INIT, true),
        Err(RootError::MaxIterations { best }) => (best, false),
    };

    let reflectance = (0..bands.len())
        .map(|band| {
            if roles.is_excluded(band) {
                AC_NODATA
            } else {
                atmosphere.reflectance(band, toa[band], water_vapour)
            }
        })
        .collect();

    PixelRetrieval {
        water_vapour,
        reflectance,
        fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::synthetic::synthetic_handle;
    use crate::scene::PixelGeometry;

    const SURFACE: f64 = 0.2;

    // Two pixel cell; the first pixel is synthesised for the given water vapour
    fn synthetic_cell(lut: &LutHandle, cwv: f64, vis: f64) -> Cell {
        let mu = 35.0f64.to_radians().cos();
        let mut cell = Cell {
            rect: CellRect {
                col: 0,
                row: 0,
                x0: 0,
                y0: 0,
                width: 2,
                height: 1,
            },
            geometry: PixelGeometry {
                vza: 20.0,
                sza: 35.0,
                raa: 90.0,
            },
            elevation: vec![lut.hsf_min(); 2],
            cos_sza: vec![mu; 2],
            toa: vec![vec![0.0; 2]; 15],
            valid: vec![true, false],
        };
        let stats = cell.statistics().unwrap();
        let tables = CorrectionTables::tabulate(lut, &cell, &stats);
        let atmosphere = tables.pixel_atmosphere(vis, mu);
        for band in 0..15 {
            let (lpw, etw, sab) = atmosphere.at(band, cwv);
            cell.toa[band][0] = toa_radiance(lpw, etw, sab, SURFACE);
            cell.toa[band][1] = cell.toa[band][0];
        }
        cell
    }

    #[test]
    fn test_recovers_synthesised_water_vapour() {
        let lut = synthetic_handle();
        let cell = synthetic_cell(&lut, 2.7, VIS_INIT);
        let visibility = Raster::filled(2, 1, VIS_INIT as f32);
        let result = correct_cell(&lut, &cell, &visibility, &CorrectionSettings::default());

        assert!((result.water_vapour[0] - 2.7).abs() < 1e-4, "{}", result.water_vapour[0]);
        assert_eq!(result.fallbacks, 0);
        let roles = lut.bands().roles();
        for band in 0..15 {
            let value = result.reflectance[band][0];
            if roles.is_excluded(band) {
                assert_eq!(value, AC_NODATA);
            } else {
                assert!((value - SURFACE).abs() < 1e-5, "band {band}: {value}");
            }
        }
    }

    #[test]
    fn test_invalid_pixels_are_no_data() {
        let lut = synthetic_handle();
        let cell = synthetic_cell(&lut, 1.5, VIS_INIT);
        let visibility = Raster::filled(2, 1, VIS_INIT as f32);
        let result = correct_cell(&lut, &cell, &visibility, &CorrectionSettings::default());
        assert_eq!(result.water_vapour[1], AC_NODATA);
        assert!(result.reflectance.iter().all(|band| band[1] == AC_NODATA));
        assert!(result.rho_toa.is_none());
    }

    #[test]
    fn test_missing_visibility_is_no_data() {
        let lut = synthetic_handle();
        let cell = synthetic_cell(&lut, 1.5, VIS_INIT);
        let visibility = Raster::filled(2, 1, 0.0);
        let result = correct_cell(&lut, &cell, &visibility, &CorrectionSettings::default());
        assert_eq!(result.water_vapour[0], AC_NODATA);
        assert_eq!(result.reflectance[3][0], AC_NODATA);
    }

    #[test]
    fn test_unbracketed_ratio_falls_back_to_default() {
        let lut = synthetic_handle();
        let mut cell = synthetic_cell(&lut, 2.0, VIS_INIT);
        let roles = lut.bands().roles();
        cell.toa[roles.wv_absorption][0] = 10.0 * cell.toa[roles.wv_reference][0];
        let visibility = Raster::filled(2, 1, VIS_INIT as f32);
        let result = correct_cell(&lut, &cell, &visibility, &CorrectionSettings::default());
        assert_eq!(result.water_vapour[0], WV_INIT);
        assert_eq!(result.fallbacks, 1);
    }

    #[test]
    fn test_rho_toa_for_every_pixel() {
        let lut = synthetic_handle();
        let cell = synthetic_cell(&lut, 2.0, VIS_INIT);
        let visibility = Raster::filled(2, 1, VIS_INIT as f32);
        let settings = CorrectionSettings {
            compute_rho_toa: true,
            ..CorrectionSettings::default()
        };
        let result = correct_cell(&lut, &cell, &visibility, &settings);
        let rho_toa = result.rho_toa.unwrap();
        let expected = toa_reflectance(cell.toa[4][1], lut.bands().solar_flux()[4], cell.cos_sza[1]);
        assert!((rho_toa[4][1] - expected).abs() < 1e-12);
        assert!(rho_toa[4][0] > 0.0);
    }

    #[test]
    fn test_modelled_ratio_decreases_with_water_vapour() {
        let lut = synthetic_handle();
        let cell = synthetic_cell(&lut, 2.0, VIS_INIT);
        let stats = cell.statistics().unwrap();
        let tables = CorrectionTables::tabulate(&lut, &cell, &stats);
        let atmosphere = tables.pixel_atmosphere(40.0, cell.cos_sza[0]);
        let merit = WaterVapourMerit::new(&atmosphere, lut.bands().roles(), [0.3, 0.3], 0.0);
        assert!(merit.modelled_ratio(1.0) > merit.modelled_ratio(3.0));
    }
}
