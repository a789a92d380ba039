//! Small analytic lookup tables for unit tests.

use crate::constants::RADIANCE_SCALE;
use crate::lut::{AtmLut, LutHandle};
use crate::sat_bands::SatBands;

/// Two nodes per axis.
pub(crate) fn two_node_axes() -> [Vec<f64>; 6] {
    [
        vec![0.0, 40.0],
        vec![0.0, 70.0],
        vec![0.0, 180.0],
        vec![0.0, 3.0],
        vec![10.0, 100.0],
        vec![0.5, 5.0],
    ]
}

/// Haze decreasing with visibility and elevation, water vapour absorption in the
/// 900 nm band only.
pub(crate) fn synthetic_value(node: &[f64; 6], param: usize, band: usize) -> f32 {
    let bands = SatBands::meris();
    let roles = bands.roles();
    let flux = bands.solar_flux()[band] * RADIANCE_SCALE;
    let (hsf, vis, cwv) = (node[3], node[4], node[5]);

    let absorption = if band == roles.wv_absorption {
        (-0.15 * cwv).exp()
    } else if band == roles.oxygen {
        0.5
    } else {
        1.0
    };
    let transmittance = 0.85 + 0.0015 * (vis - 10.0);

    let value = match param {
        0 => flux * (0.08 - 0.0006 * (vis - 10.0)) * (1.0 - 0.1 * hsf) * absorption,
        1 => 0.75 * flux * absorption * transmittance,
        2 => 0.12 * flux * absorption,
        3 => 0.1,
        4 => 0.15 - 0.0005 * (vis - 10.0),
        _ => 0.9,
    };
    value as f32
}

pub(crate) fn synthetic_handle() -> LutHandle {
    let table = AtmLut::from_fn(two_node_axes(), 6, 15, synthetic_value)
        .expect("synthetic table is well formed");
    LutHandle::new(table, SatBands::meris()).expect("synthetic table has 15 bands")
}
