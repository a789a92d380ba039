use chrono::{Datelike, NaiveDate};

use crate::constants::{DEGREES_PER_DAY, ORBIT_ECCENTRICITY, PERIHELION_DAY, RADIANCE_SCALE};

/// Sun-earth distance in astronomical units for a given day of year.
pub fn sun_earth_distance(day_of_year: u32) -> f64 {
    let om = (DEGREES_PER_DAY * (day_of_year as f64 - PERIHELION_DAY)).to_radians();
    1.0 - ORBIT_ECCENTRICITY * om.cos()
}

/// Factor converting sensor radiance to lookup table radiance units for an acquisition date.
///
/// Radiances are normalised to the mean sun-earth distance and rescaled by
/// [`RADIANCE_SCALE`]: `L_lut = L * d^2 * 1e-4`.
pub fn radiance_scale_factor(date: NaiveDate) -> f64 {
    let distance = sun_earth_distance(date.ordinal());
    distance * distance * RADIANCE_SCALE
}

/// Relative azimuth between the viewing and the solar azimuth, folded into [0, 180] degrees.
pub fn relative_azimuth(vaa: f64, saa: f64) -> f64 {
    (vaa - saa).to_radians().cos().clamp(-1.0, 1.0).acos().to_degrees()
}

/// Top of atmosphere reflectance from a radiance in lookup table units.
pub fn toa_reflectance(toa: f64, solar_flux: f64, cos_sza: f64) -> f64 {
    toa * std::f64::consts::PI / (solar_flux * RADIANCE_SCALE * cos_sza)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sun_earth_distance() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 14).expect("Invalid date");
        assert_eq!(date.ordinal(), 73);
        let result = sun_earth_distance(date.ordinal());
        assert!((result - 0.993734).abs() < 1e-6, "{result}");
    }

    #[test]
    fn test_radiance_scale_factor() {
        let date = NaiveDate::from_ymd_opt(2010, 3, 14).expect("Invalid date");
        let factor = radiance_scale_factor(date);
        assert!((factor - 0.993734 * 0.993734 * 1e-4).abs() < 1e-9, "{factor}");
    }

    #[test]
    fn test_relative_azimuth() {
        assert!((relative_azimuth(100.0, 40.0) - 60.0).abs() < 1e-9);
        assert!((relative_azimuth(40.0, 100.0) - 60.0).abs() < 1e-9);
        assert!((relative_azimuth(350.0, 10.0) - 20.0).abs() < 1e-9);
        assert!((relative_azimuth(270.0, 90.0) - 180.0).abs() < 1e-9);
    }

    #[test]
    fn test_toa_reflectance() {
        let rho = toa_reflectance(0.01, 1000.0, 0.5);
        assert!((rho - std::f64::consts::PI * 0.01 / 0.05).abs() < 1e-12);
    }
}
