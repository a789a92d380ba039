use std::fmt::Display;

/// Number of spectral bands carried by the lookup table and the radiance input.
pub const NUM_BANDS: usize = 15;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sensor {
    Meris,
}

// Band centres [nm]
const MERIS_WAVELENGTHS: [f64; NUM_BANDS] = [
    412.545, 442.401, 489.744, 509.7, 559.634, 619.62, 664.64, 680.902, 708.426, 753.472,
    761.606, 778.498, 864.833, 884.849, 899.86,
];

// Mean extraterrestrial solar flux per band [mW m-2 nm-1]
const MERIS_SOLAR_FLUX: [f64; NUM_BANDS] = [
    1714.9, 1872.4, 1926.6, 1930.2, 1804.2, 1651.5, 1531.4, 1475.6, 1408.9, 1265.5, 1255.4,
    1178.0, 955.0, 914.2, 882.8,
];

/// Upper wavelength limit of the bands used by the dark-pixel visibility search [nm]
pub const VISIBLE_LIMIT_NM: f64 = 680.0;

#[derive(Debug, Clone)]
pub struct SatBands {
    sensor: Sensor,
    wavelengths: &'static [f64],
    solar_flux: &'static [f64],
}

impl SatBands {
    pub fn new(sensor: Sensor) -> Self {
        let (wavelengths, solar_flux): (&'static [f64], &'static [f64]) = match sensor {
            Sensor::Meris => (&MERIS_WAVELENGTHS, &MERIS_SOLAR_FLUX),
        };
        Self {
            sensor,
            wavelengths,
            solar_flux,
        }
    }

    pub fn meris() -> Self {
        Self::new(Sensor::Meris)
    }

    pub fn wavelengths(&self) -> &[f64] {
        self.wavelengths
    }

    pub fn solar_flux(&self) -> &[f64] {
        self.solar_flux
    }

    pub fn len(&self) -> usize {
        self.wavelengths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wavelengths.is_empty()
    }

    /// Index of the band whose centre is closest to `target` [nm].
    pub fn closest_band(&self, target: f64) -> usize {
        self.wavelengths
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| (*a - target).abs().total_cmp(&(*b - target).abs()))
            .map(|(i, _)| i)
            .unwrap_or(0)
    }

    /// Bands below the red edge, used to detect over-darkening by path radiance.
    pub fn visible_bands(&self) -> Vec<usize> {
        (0..self.len())
            .filter(|&i| self.wavelengths[i] < VISIBLE_LIMIT_NM)
            .collect()
    }

    /// The functional band roles used by the retrieval, resolved by wavelength.
    pub fn roles(&self) -> BandRoles {
        BandRoles {
            ndvi_red: self.closest_band(681.0),
            ndvi_nir: self.closest_band(753.0),
            nir_reference: self.closest_band(865.0),
            wv_reference: self.closest_band(885.0),
            wv_absorption: self.closest_band(900.0),
            oxygen: self.closest_band(761.0),
        }
    }
}

/// Indices of the bands that play a specific role in the retrieval.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BandRoles {
    pub ndvi_red: usize,      // 681 nm
    pub ndvi_nir: usize,      // 753 nm
    pub nir_reference: usize, // 865 nm
    pub wv_reference: usize,  // 885 nm, water vapour window
    pub wv_absorption: usize, // 900 nm, water vapour absorption
    pub oxygen: usize,        // 761 nm, O2-A absorption
}

impl BandRoles {
    /// Bands for which no surface reflectance is derived.
    pub fn is_excluded(&self, band: usize) -> bool {
        band == self.oxygen || band == self.wv_absorption
    }
}

impl Display for Sensor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sensor::Meris => write!(f, "MERIS"),
        }
    }
}

impl Display for SatBands {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Sensor: {}, Wavelengths: {:?}",
            self.sensor, self.wavelengths
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closest_band() {
        let bands = SatBands::meris();
        assert_eq!(bands.closest_band(412.0), 0);
        assert_eq!(bands.closest_band(560.0), 4);
        assert_eq!(bands.closest_band(900.0), 14);
    }

    #[test]
    fn test_roles_match_meris_layout() {
        let roles = SatBands::meris().roles();
        assert_eq!(roles.ndvi_red, 7);
        assert_eq!(roles.ndvi_nir, 9);
        assert_eq!(roles.nir_reference, 12);
        assert_eq!(roles.wv_reference, 13);
        assert_eq!(roles.wv_absorption, 14);
        assert_eq!(roles.oxygen, 10);
        assert!(roles.is_excluded(10));
        assert!(roles.is_excluded(14));
        assert!(!roles.is_excluded(13));
    }

    #[test]
    fn test_visible_bands() {
        let bands = SatBands::meris();
        assert_eq!(bands.visible_bands(), vec![0, 1, 2, 3, 4, 5, 6]);
    }
}
