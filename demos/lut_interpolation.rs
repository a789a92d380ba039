use scapem::lut::{LutCoordinate, LutHandle};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let lut = LutHandle::from_path("./data/lut")?;

    let (vza, sza, raa) = lut.clamp_geometry(12.0, 38.0, 95.0);
    let hsf = lut.clamp_elevation_m(420.0);
    let coord = LutCoordinate::new(vza, sza, raa, hsf, 23.0, 2.0);
    let params = lut.interpolate(&coord);

    for (band, wavelength) in lut.bands().wavelengths().iter().enumerate() {
        println!(
            "{:8.3} nm  path radiance {:.5}  spherical albedo {:.4}",
            wavelength,
            params.path_radiance(band),
            params.spherical_albedo(band)
        );
    }
    Ok(())
}
