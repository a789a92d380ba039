//! Reference pixel selection for the visibility refinement.
//!
//! Pixels of a cell are stratified by an NDVI computed from solar flux
//! normalised TOA radiances. Only pixels close to the mean elevation and sun
//! angle of the cell are eligible. Each reference set combines two high, two
//! medium and one low NDVI pixel, the low one replaced by another medium pixel
//! when the low stratum runs out.

use crate::constants::{
    COS_SZA_TOLERANCE, ELEVATION_TOLERANCE, NDVI_HIGH, NDVI_LOW, NDVI_MEDIUM, NUM_REF_PIXELS,
};
use crate::retrieval::cell::{Cell, CellStatistics};
use crate::sat_bands::SatBands;

/// Pixel indices (inside the cell) of every reference set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceSelection {
    pub sets: Vec<[usize; NUM_REF_PIXELS]>,
}

/// TOA values of the selected reference pixels, `[band][set][pixel]`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePixelSet {
    toa: Vec<Vec<[f64; NUM_REF_PIXELS]>>,
}

impl ReferencePixelSet {
    /// Reference pixels for every band, or `None` when the cell does not provide a
    /// usable selection.
    pub fn extract(cell: &Cell, stats: &CellStatistics, bands: &SatBands) -> Option<Self> {
        let selection = select_reference_pixels(cell, stats, bands)?;
        let toa = (0..bands.len())
            .map(|band| gather(cell, &selection, band))
            .collect();
        Some(Self { toa })
    }

    pub fn from_values(toa: Vec<Vec<[f64; NUM_REF_PIXELS]>>) -> Self {
        Self { toa }
    }

    pub fn n_sets(&self) -> usize {
        self.toa.first().map_or(0, Vec::len)
    }

    pub fn n_bands(&self) -> usize {
        self.toa.len()
    }

    pub fn get(&self, band: usize, set: usize) -> &[f64; NUM_REF_PIXELS] {
        &self.toa[band][set]
    }
}

/// NDVI from TOA radiances normalised by the band solar fluxes.
pub fn ndvi(toa_red: f64, toa_nir: f64, flux_red: f64, flux_nir: f64) -> f64 {
    let red = toa_red / flux_red;
    let nir = toa_nir / flux_nir;
    (nir - red) / (nir + red)
}

/// Reference pixels of a single band, `[set][pixel]`.
pub fn extract_reference_pixels(
    cell: &Cell,
    stats: &CellStatistics,
    bands: &SatBands,
    band: usize,
) -> Option<Vec<[f64; NUM_REF_PIXELS]>> {
    let selection = select_reference_pixels(cell, stats, bands)?;
    Some(gather(cell, &selection, band))
}

fn gather(cell: &Cell, selection: &ReferenceSelection, band: usize) -> Vec<[f64; NUM_REF_PIXELS]> {
    selection
        .sets
        .iter()
        .map(|set| set.map(|pixel| cell.toa[band][pixel]))
        .collect()
}

/// Stratifies the eligible pixels by NDVI and assembles the reference sets.
pub fn select_reference_pixels(
    cell: &Cell,
    stats: &CellStatistics,
    bands: &SatBands,
) -> Option<ReferenceSelection> {
    let roles = bands.roles();
    let flux = bands.solar_flux();
    let (red, nir) = (roles.ndvi_red, roles.ndvi_nir);

    let h_lo = (1.0 - ELEVATION_TOLERANCE) * stats.elevation_mean;
    let h_hi = (1.0 + ELEVATION_TOLERANCE) * stats.elevation_mean;
    let mu_lo = (1.0 - COS_SZA_TOLERANCE) * stats.cos_sza_mean;
    let mu_hi = (1.0 + COS_SZA_TOLERANCE) * stats.cos_sza_mean;

    let mut high = Vec::new();
    let mut medium = Vec::new();
    let mut low = Vec::new();

    for i in 0..cell.len() {
        let h = cell.elevation[i];
        let mu = cell.cos_sza[i];
        if !cell.valid[i] || !(h > h_lo && h < h_hi) || !(mu > mu_lo && mu < mu_hi) {
            continue;
        }
        let index = ndvi(cell.toa[red][i], cell.toa[nir][i], flux[red], flux[nir]);
        if in_range(index, NDVI_HIGH) {
            high.push((i, index));
        } else if in_range(index, NDVI_MEDIUM) {
            medium.push((i, index));
        } else if in_range(index, NDVI_LOW) {
            low.push((i, index));
        }
    }

    if medium.len() + 2 < NUM_REF_PIXELS {
        return None;
    }

    for stratum in [&mut high, &mut medium, &mut low] {
        stratum.sort_by(|a, b| b.1.total_cmp(&a.1));
    }

    let n_sets = (high.len() / 2).min(medium.len() / 3);
    if n_sets == 0 {
        return None;
    }

    let sets = (0..n_sets)
        .map(|i| {
            let fifth = if i < low.len() {
                low[i].0
            } else {
                medium[2 * i + 2].0
            };
            [
                high[2 * i].0,
                high[2 * i + 1].0,
                medium[2 * i].0,
                medium[2 * i + 1].0,
                fifth,
            ]
        })
        .collect();

    Some(ReferenceSelection { sets })
}

fn in_range(value: f64, (lower, upper): (f64, f64)) -> bool {
    value >= lower && value < upper
}
