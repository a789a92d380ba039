use crate::error::{Result, ScapeError};

/// Number of coordinate axes of the atmospheric parameter table.
pub const NUM_AXES: usize = 6;

const NUM_CORNERS: usize = 1 << NUM_AXES;

/// Coordinate axes in storage order, outermost first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Vza,
    Sza,
    Raa,
    Hsf,
    Vis,
    Cwv,
}

impl Axis {
    pub const ALL: [Axis; NUM_AXES] = [
        Axis::Vza,
        Axis::Sza,
        Axis::Raa,
        Axis::Hsf,
        Axis::Vis,
        Axis::Cwv,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Axis::Vza => "vza",
            Axis::Sza => "sza",
            Axis::Raa => "raa",
            Axis::Hsf => "hsf",
            Axis::Vis => "vis",
            Axis::Cwv => "cwv",
        }
    }
}

/// Radiative transfer parameters stored per band, in storage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtmParam {
    PathRadiance = 0,
    DirectIrradiance = 1,
    DiffuseIrradiance = 2,
    DirectTransmittance = 3,
    SphericalAlbedo = 4,
    GroundToSensorTransmittance = 5,
    Reserved = 6,
}

/// A point in the table's coordinate space.
///
/// Angles in degrees, surface elevation in km, visibility in km and water vapour
/// column in g cm-2.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LutCoordinate {
    pub vza: f64,
    pub sza: f64,
    pub raa: f64,
    pub hsf: f64,
    pub vis: f64,
    pub cwv: f64,
}

impl LutCoordinate {
    pub fn new(vza: f64, sza: f64, raa: f64, hsf: f64, vis: f64, cwv: f64) -> Self {
        Self {
            vza,
            sza,
            raa,
            hsf,
            vis,
            cwv,
        }
    }

    fn as_array(&self) -> [f64; NUM_AXES] {
        [self.vza, self.sza, self.raa, self.hsf, self.vis, self.cwv]
    }
}

/// Interpolated parameter vectors for every band.
#[derive(Debug, Clone, PartialEq)]
pub struct AtmParameters {
    n_params: usize,
    values: Vec<f64>, // [band][param]
}

impl AtmParameters {
    pub fn n_bands(&self) -> usize {
        self.values.len() / self.n_params
    }

    pub fn band(&self, band: usize) -> &[f64] {
        &self.values[band * self.n_params..(band + 1) * self.n_params]
    }

    pub fn get(&self, band: usize, param: AtmParam) -> f64 {
        self.values[band * self.n_params + param as usize]
    }

    pub fn path_radiance(&self, band: usize) -> f64 {
        self.get(band, AtmParam::PathRadiance)
    }

    pub fn spherical_albedo(&self, band: usize) -> f64 {
        self.get(band, AtmParam::SphericalAlbedo)
    }

    /// Total ground irradiance term `E0tw * cos(sza) + Ediftw`.
    pub fn total_irradiance(&self, band: usize, cos_sza: f64) -> f64 {
        self.get(band, AtmParam::DirectIrradiance) * cos_sza
            + self.get(band, AtmParam::DiffuseIrradiance)
    }
}

/// Atmospheric parameter lookup table over (vza, sza, raa, hsf, vis, cwv).
///
/// Values are stored with the wavelength index running fastest, then the
/// parameter index, then the coordinate axes from `cwv` out to `vza`.
#[derive(Debug, Clone)]
pub struct AtmLut {
    axes: [Vec<f64>; NUM_AXES],
    n_params: usize,
    n_wavelengths: usize,
    values: Vec<f32>,
}

impl AtmLut {
    pub fn new(
        axes: [Vec<f64>; NUM_AXES],
        n_params: usize,
        n_wavelengths: usize,
        values: Vec<f32>,
    ) -> Result<Self> {
        for (axis, nodes) in Axis::ALL.iter().zip(axes.iter()) {
            if nodes.len() < 2 {
                return Err(ScapeError::Lut(format!(
                    "axis {} needs at least 2 nodes, found {}",
                    axis.name(),
                    nodes.len()
                )));
            }
            if nodes.windows(2).any(|w| w[1] <= w[0]) {
                return Err(ScapeError::Lut(format!(
                    "axis {} is not strictly increasing: {:?}",
                    axis.name(),
                    nodes
                )));
            }
        }
        if n_params == 0 || n_wavelengths == 0 {
            return Err(ScapeError::Lut(
                "parameter and wavelength counts must be positive".to_string(),
            ));
        }

        let expected = axes.iter().map(Vec::len).product::<usize>() * n_params * n_wavelengths;
        if values.len() != expected {
            return Err(ScapeError::dimension_mismatch(
                "lookup table size",
                expected,
                values.len(),
            ));
        }

        Ok(AtmLut {
            axes,
            n_params,
            n_wavelengths,
            values,
        })
    }

    /// Builds a table by evaluating `f(node, param, band)` at every grid node, where
    /// `node` holds the axis values in (vza, sza, raa, hsf, vis, cwv) order.
    pub fn from_fn<F>(
        axes: [Vec<f64>; NUM_AXES],
        n_params: usize,
        n_wavelengths: usize,
        f: F,
    ) -> Result<Self>
    where
        F: Fn(&[f64; NUM_AXES], usize, usize) -> f32,
    {
        let n_nodes = axes.iter().map(Vec::len).product::<usize>();
        let mut values = Vec::with_capacity(n_nodes * n_params * n_wavelengths);
        for flat in 0..n_nodes {
            let mut rest = flat;
            let mut node = [0.0; NUM_AXES];
            for k in (0..NUM_AXES).rev() {
                let len = axes[k].len();
                node[k] = axes[k][rest % len];
                rest /= len;
            }
            for p in 0..n_params {
                for w in 0..n_wavelengths {
                    values.push(f(&node, p, w));
                }
            }
        }
        Self::new(axes, n_params, n_wavelengths, values)
    }

    pub fn axis(&self, axis: Axis) -> &[f64] {
        &self.axes[axis as usize]
    }

    pub fn n_params(&self) -> usize {
        self.n_params
    }

    pub fn n_wavelengths(&self) -> usize {
        self.n_wavelengths
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    fn block_len(&self) -> usize {
        self.n_params * self.n_wavelengths
    }

    fn block_offset(&self, index: &[usize; NUM_AXES]) -> usize {
        let flat = index
            .iter()
            .zip(self.axes.iter())
            .fold(0, |acc, (&i, nodes)| acc * nodes.len() + i);
        flat * self.block_len()
    }

    /// Stored value at a grid node.
    pub fn node_value(&self, index: [usize; NUM_AXES], param: usize, band: usize) -> f32 {
        self.values[self.block_offset(&index) + param * self.n_wavelengths + band]
    }

    // Bracketing node and fractional position; targets outside the axis are clamped
    fn get_indice(vec: &[f64], target: f64) -> (usize, f64) {
        let last = vec.len() - 1;
        if !(target > vec[0]) {
            return (0, 0.0);
        }
        if target >= vec[last] {
            return (last - 1, 1.0);
        }

        let mut idx = 0;
        for i in 0..last {
            if target >= vec[i] && target < vec[i + 1] {
                idx = i;
                break;
            }
        }

        let rr = (target - vec[idx]) / (vec[idx + 1] - vec[idx]);
        (idx, rr)
    }

    // Calls `visit(block_offset, weight)` for each of the 2^6 enclosing nodes with a
    // non-zero tensor product weight
    fn for_each_corner<F: FnMut(usize, f64)>(&self, coord: &LutCoordinate, mut visit: F) {
        let target = coord.as_array();
        let mut lower = [0usize; NUM_AXES];
        let mut frac = [0.0f64; NUM_AXES];
        for k in 0..NUM_AXES {
            let (i, r) = Self::get_indice(&self.axes[k], target[k]);
            lower[k] = i;
            frac[k] = r;
        }

        for corner in 0..NUM_CORNERS {
            let mut weight = 1.0;
            let mut index = lower;
            for k in 0..NUM_AXES {
                if corner & (1 << k) != 0 {
                    index[k] += 1;
                    weight *= frac[k];
                } else {
                    weight *= 1.0 - frac[k];
                }
            }
            if weight != 0.0 {
                visit(self.block_offset(&index), weight);
            }
        }
    }

    /// Multilinear interpolation of all parameters for all bands.
    pub fn interpolate(&self, coord: &LutCoordinate) -> AtmParameters {
        let nw = self.n_wavelengths;
        let np = self.n_params;
        let mut values = vec![0.0f64; np * nw];

        self.for_each_corner(coord, |offset, weight| {
            let block = &self.values[offset..offset + np * nw];
            for p in 0..np {
                for w in 0..nw {
                    values[w * np + p] += weight * block[p * nw + w] as f64;
                }
            }
        });

        AtmParameters {
            n_params: np,
            values,
        }
    }

    /// Multilinear interpolation of the parameter vector of a single band.
    pub fn interpolate_band(&self, coord: &LutCoordinate, band: usize) -> Vec<f64> {
        let nw = self.n_wavelengths;
        let mut params = vec![0.0f64; self.n_params];

        self.for_each_corner(coord, |offset, weight| {
            for (p, value) in params.iter_mut().enumerate() {
                *value += weight * self.values[offset + p * nw + band] as f64;
            }
        });

        params
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn axes() -> [Vec<f64>; NUM_AXES] {
        [
            vec![0.0, 20.0, 40.0],
            vec![0.0, 30.0, 60.0],
            vec![0.0, 90.0, 180.0],
            vec![0.0, 2.5],
            vec![10.0, 40.0, 100.0],
            vec![0.5, 2.0, 4.5],
        ]
    }

    // Value that is linear in every coordinate, so multilinear interpolation is exact
    fn linear(c: [f64; NUM_AXES], param: usize, band: usize) -> f64 {
        0.01 * c[0] + 0.002 * c[1] - 0.001 * c[2] + 0.3 * c[3] - 0.004 * c[4]
            + 0.05 * c[5]
            + param as f64
            + 0.1 * band as f64
    }

    fn build_lut(n_params: usize, n_bands: usize) -> AtmLut {
        let axes = axes();
        let mut values = Vec::new();
        for &vza in &axes[0] {
            for &sza in &axes[1] {
                for &raa in &axes[2] {
                    for &hsf in &axes[3] {
                        for &vis in &axes[4] {
                            for &cwv in &axes[5] {
                                for p in 0..n_params {
                                    for b in 0..n_bands {
                                        let c = [vza, sza, raa, hsf, vis, cwv];
                                        values.push(linear(c, p, b) as f32);
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        AtmLut::new(axes, n_params, n_bands, values).unwrap()
    }

    #[test]
    fn test_exact_node_returns_stored_value() {
        let lut = build_lut(7, 15);
        let coord = LutCoordinate::new(20.0, 60.0, 90.0, 2.5, 40.0, 0.5);
        let params = lut.interpolate(&coord);
        for band in 0..15 {
            for p in 0..7 {
                let stored = lut.node_value([1, 2, 1, 1, 1, 0], p, band) as f64;
                let got = params.band(band)[p];
                assert!((got - stored).abs() < 1e-4, "band {band} param {p}: {got} vs {stored}");
            }
        }
    }

    #[test]
    fn test_midpoint_is_mean_of_neighbours() {
        let lut = build_lut(6, 15);
        let lower = lut.interpolate(&LutCoordinate::new(20.0, 30.0, 90.0, 0.0, 10.0, 2.0));
        let upper = lut.interpolate(&LutCoordinate::new(20.0, 30.0, 90.0, 0.0, 40.0, 2.0));
        let mid = lut.interpolate(&LutCoordinate::new(20.0, 30.0, 90.0, 0.0, 25.0, 2.0));
        for band in 0..15 {
            let expected = 0.5 * (lower.path_radiance(band) + upper.path_radiance(band));
            assert!((mid.path_radiance(band) - expected).abs() < 1e-5);
        }
    }

    #[test]
    fn test_interpolation_is_exact_for_linear_table() {
        let lut = build_lut(7, 15);
        let c = [13.0, 47.5, 123.0, 1.2, 71.0, 3.3];
        let coord = LutCoordinate::new(c[0], c[1], c[2], c[3], c[4], c[5]);
        let params = lut.interpolate(&coord);
        for band in [0, 7, 14] {
            let expected = linear(c, AtmParam::SphericalAlbedo as usize, band);
            let got = params.spherical_albedo(band);
            assert!((got - expected).abs() < 1e-4, "{got} vs {expected}");
        }
    }

    #[test]
    fn test_interpolate_band_matches_full_interpolation() {
        let lut = build_lut(7, 15);
        let coord = LutCoordinate::new(5.0, 12.0, 33.0, 0.7, 23.0, 1.1);
        let all = lut.interpolate(&coord);
        let single = lut.interpolate_band(&coord, 9);
        for p in 0..7 {
            assert!((all.band(9)[p] - single[p]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_out_of_range_coordinates_are_clamped() {
        let lut = build_lut(6, 15);
        let inside = lut.interpolate(&LutCoordinate::new(40.0, 0.0, 0.0, 0.0, 100.0, 4.5));
        let outside = lut.interpolate(&LutCoordinate::new(55.0, -3.0, -1.0, -0.2, 250.0, 9.0));
        assert_eq!(inside, outside);
    }

    #[test]
    fn test_rejects_non_increasing_axis() {
        let mut axes = axes();
        axes[4] = vec![10.0, 10.0, 100.0];
        let size = 3 * 3 * 3 * 2 * 3 * 3 * 6 * 15;
        let result = AtmLut::new(axes, 6, 15, vec![0.0; size]);
        assert!(result.is_err());
    }

    #[test]
    fn test_from_fn_follows_storage_order() {
        let built = build_lut(6, 15);
        let generated = AtmLut::from_fn(axes(), 6, 15, |node, p, b| linear(*node, p, b) as f32).unwrap();
        assert_eq!(built.values(), generated.values());
    }

    #[test]
    fn test_rejects_wrong_size() {
        let result = AtmLut::new(axes(), 6, 15, vec![0.0; 10]);
        assert!(matches!(result, Err(ScapeError::DimensionMismatch { .. })));
    }
}
