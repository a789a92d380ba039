use std::path::Path;

use crate::constants::LUT_EPSILON;
use crate::error::{Result, ScapeError};
use crate::lut::lookup_table::{AtmLut, AtmParameters, Axis, LutCoordinate};
use crate::lut::reader::{LUT_FILE_NAME, locate_lut, read_lut};
use crate::sat_bands::SatBands;

/// Shared, read-only access to the atmospheric parameter table.
///
/// The handle keeps the table together with the working limits of its axes.
/// Limits of the vza, sza, elevation, visibility and water vapour axes are nudged
/// inward by [`LUT_EPSILON`] so that clamped coordinates never sit on the outer
/// node. The relative azimuth keeps the raw table limits.
#[derive(Debug)]
pub struct LutHandle {
    table: AtmLut,
    bands: SatBands,
    vza: (f64, f64),
    sza: (f64, f64),
    raa: (f64, f64),
    hsf: (f64, f64),
    vis: (f64, f64),
    cwv: (f64, f64),
    hsf_grid: Vec<f64>,
    vis_grid: Vec<f64>,
}

impl LutHandle {
    /// Wraps `table`; fails when its wavelength count differs from `bands`.
    ///
    /// Only the elevation and visibility node grids are nudged. The water vapour
    /// grid is used as stored.
    pub fn new(table: AtmLut, bands: SatBands) -> Result<Self> {
        if table.n_wavelengths() != bands.len() {
            return Err(ScapeError::dimension_mismatch(
                "lookup table wavelengths",
                bands.len(),
                table.n_wavelengths(),
            ));
        }

        let nudged = |axis: Axis| {
            let nodes = table.axis(axis);
            (nodes[0] + LUT_EPSILON, nodes[nodes.len() - 1] - LUT_EPSILON)
        };
        let raa_nodes = table.axis(Axis::Raa);
        let raa = (raa_nodes[0], raa_nodes[raa_nodes.len() - 1]);

        let nudged_grid = |axis: Axis| {
            let mut grid = table.axis(axis).to_vec();
            let last = grid.len() - 1;
            grid[0] += LUT_EPSILON;
            grid[last] -= LUT_EPSILON;
            grid
        };

        Ok(LutHandle {
            vza: nudged(Axis::Vza),
            sza: nudged(Axis::Sza),
            raa,
            hsf: nudged(Axis::Hsf),
            vis: nudged(Axis::Vis),
            cwv: nudged(Axis::Cwv),
            hsf_grid: nudged_grid(Axis::Hsf),
            vis_grid: nudged_grid(Axis::Vis),
            table,
            bands,
        })
    }

    /// Loads the MERIS table from a file or from a directory containing it.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::from_path_with_name(path, LUT_FILE_NAME)
    }

    pub fn from_path_with_name<P: AsRef<Path>>(path: P, file_name: &str) -> Result<Self> {
        let bands = SatBands::meris();
        let location = locate_lut(path, file_name)?;
        let table = read_lut(location, bands.len())?;
        Self::new(table, bands)
    }

    pub fn table(&self) -> &AtmLut {
        &self.table
    }

    pub fn bands(&self) -> &SatBands {
        &self.bands
    }

    pub fn vis_min(&self) -> f64 {
        self.vis.0
    }

    pub fn vis_max(&self) -> f64 {
        self.vis.1
    }

    pub fn hsf_min(&self) -> f64 {
        self.hsf.0
    }

    pub fn hsf_max(&self) -> f64 {
        self.hsf.1
    }

    pub fn cwv_min(&self) -> f64 {
        self.cwv.0
    }

    pub fn cwv_max(&self) -> f64 {
        self.cwv.1
    }

    /// Visibility nodes with the outer nodes nudged inward [km].
    pub fn vis_grid(&self) -> &[f64] {
        &self.vis_grid
    }

    /// Surface elevation nodes with the outer nodes nudged inward [km].
    pub fn hsf_grid(&self) -> &[f64] {
        &self.hsf_grid
    }

    /// Water vapour nodes [g cm-2].
    pub fn cwv_grid(&self) -> &[f64] {
        self.table.axis(Axis::Cwv)
    }

    /// Clamps a viewing geometry into the table's working range.
    pub fn clamp_geometry(&self, vza: f64, sza: f64, raa: f64) -> (f64, f64, f64) {
        (
            vza.clamp(self.vza.0, self.vza.1),
            sza.clamp(self.sza.0, self.sza.1),
            raa.clamp(self.raa.0, self.raa.1),
        )
    }

    /// Converts an elevation in metres to km within the table range; unknown
    /// elevations map to the lowest level.
    pub fn clamp_elevation_m(&self, metres: f64) -> f64 {
        if metres.is_nan() {
            return self.hsf.0;
        }
        (0.001 * metres).clamp(self.hsf.0, self.hsf.1)
    }

    pub fn clamp_visibility(&self, vis: f64) -> f64 {
        vis.clamp(self.vis.0, self.vis.1)
    }

    pub fn interpolate(&self, coord: &LutCoordinate) -> AtmParameters {
        self.table.interpolate(coord)
    }

    pub fn interpolate_band(&self, coord: &LutCoordinate, band: usize) -> Vec<f64> {
        self.table.interpolate_band(coord, band)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle() -> LutHandle {
        let axes = [
            vec![0.0, 9.0, 18.0, 27.0, 36.0, 45.0],
            vec![0.0, 10.0, 20.0, 35.0, 50.0, 65.0],
            vec![0.0, 25.0, 50.0, 85.0, 120.0, 155.0, 180.0],
            vec![0.0, 0.7, 2.5],
            vec![10.0, 15.0, 23.0, 35.0, 60.0, 100.0, 180.0],
            vec![0.3, 1.0, 1.5, 2.0, 2.7, 5.0],
        ];
        let n = axes.iter().map(Vec::len).product::<usize>() * 7 * 15;
        let table = AtmLut::new(axes, 7, 15, vec![0.0; n]).unwrap();
        LutHandle::new(table, SatBands::meris()).unwrap()
    }

    #[test]
    fn test_limits_are_nudged_inward() {
        let lut = handle();
        assert!((lut.vis_min() - 10.001).abs() < 1e-9);
        assert!((lut.vis_max() - 179.999).abs() < 1e-9);
        assert!((lut.hsf_min() - 0.001).abs() < 1e-9);
        assert!((lut.hsf_max() - 2.499).abs() < 1e-9);
        assert!((lut.cwv_min() - 0.301).abs() < 1e-6);
        assert!((lut.cwv_max() - 4.999).abs() < 1e-6);
        assert_eq!(lut.vis_grid()[3], 35.0);
        assert!((lut.vis_grid()[0] - 10.001).abs() < 1e-9);
        assert!((lut.hsf_grid()[2] - 2.499).abs() < 1e-9);
        assert_eq!(lut.cwv_grid()[0], 0.3);
        assert_eq!(lut.cwv_grid()[5], 5.0);
    }

    #[test]
    fn test_clamp_geometry() {
        let lut = handle();
        let (vza, sza, raa) = lut.clamp_geometry(60.0, -1.0, 200.0);
        assert!((vza - 44.999).abs() < 1e-9);
        assert!((sza - 0.001).abs() < 1e-9);
        assert_eq!(raa, 180.0);

        // relative azimuth is clamped to the raw outer nodes
        let (_, _, raa) = lut.clamp_geometry(20.0, 30.0, -5.0);
        assert_eq!(raa, 0.0);
        let (_, _, raa) = lut.clamp_geometry(20.0, 30.0, 180.0);
        assert_eq!(raa, 180.0);
    }

    #[test]
    fn test_clamp_elevation() {
        let lut = handle();
        assert!((lut.clamp_elevation_m(f64::NAN) - 0.001).abs() < 1e-12);
        assert!((lut.clamp_elevation_m(-20.0) - 0.001).abs() < 1e-12);
        assert!((lut.clamp_elevation_m(1200.0) - 1.2).abs() < 1e-12);
        assert!((lut.clamp_elevation_m(4000.0) - 2.499).abs() < 1e-12);
    }

    #[test]
    fn test_wavelength_count_must_match() {
        let axes = [
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
            vec![0.0, 1.0],
        ];
        let table = AtmLut::new(axes, 6, 4, vec![0.0; 64 * 6 * 4]).unwrap();
        assert!(LutHandle::new(table, SatBands::meris()).is_err());
    }
}
