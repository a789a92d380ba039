use scapem::readers;
use scapem::utils::{RasterStatistics, log_raster_statistics};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt().init();

    let reader = readers::create_reader("./data/scene/radiance_13.tif")?;
    let raster = reader.read_data()?;
    println!("{}", raster);

    let stats = RasterStatistics::compute(&raster.buffer, f32::NAN);
    log_raster_statistics("radiance_13", "mW m-2 sr-1 nm-1", &stats);
    Ok(())
}
