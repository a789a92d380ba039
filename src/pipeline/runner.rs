use std::path::PathBuf;

use tracing::info;

use crate::config::Config;
use crate::constants::{AC_NODATA, AOT_NODATA, VISIBILITY_NODATA};
use crate::error::{Result, ScapeError};
use crate::lut::LutHandle;
use crate::pipeline::{Pipeline, RetrievalSettings, SceneResult};
use crate::readers::{Raster, band_files, read_raster};
use crate::retrieval::{CorrectionSettings, VisibilitySettings};
use crate::sat_bands::NUM_BANDS;
use crate::scene::{ElevationProvider, FlagRaster, Geometry, RasterElevation, Scene, SeaLevel};
use crate::writers::GeoTiffWriter;

// MERIS band 2 (442 nm) is only written on request
const BAND2_INDEX: usize = 1;

/// Retrieval settings described by a configuration.
pub fn retrieval_settings(config: &Config) -> RetrievalSettings {
    RetrievalSettings {
        cell_size: config.cell_size(),
        compute_over_water: config.compute_over_water(),
        use_dem: config.use_dem(),
        visibility: VisibilitySettings {
            visibility_threshold: config.visibility_threshold(),
            refine_threshold: config.refine_threshold(),
            refine: config.refine_visibility(),
            powell_max_iterations: config.powell_max_iterations(),
        },
        correction: CorrectionSettings {
            brent_max_iterations: config.brent_max_iterations(),
            brent_tolerance: config.brent_tolerance(),
            compute_rho_toa: config.write_rho_toa(),
        },
    }
}

/// Reads the scene rasters named in the configuration.
pub fn load_scene(config: &Config) -> Result<Scene> {
    let radiance_files = band_files(config.radiance_pattern())?;
    if radiance_files.len() != NUM_BANDS {
        return Err(ScapeError::dimension_mismatch(
            format!("radiance files matching {}", config.radiance_pattern()),
            NUM_BANDS,
            radiance_files.len(),
        ));
    }
    let radiance = radiance_files
        .iter()
        .map(read_raster)
        .collect::<std::result::Result<Vec<Raster>, _>>()?;
    let (width, height) = radiance[0].dimensions();

    let files = config.geometry();
    let geometry = Geometry {
        sza: read_raster(&files.sza)?,
        vza: read_raster(&files.vza)?,
        saa: read_raster(&files.saa)?,
        vaa: read_raster(&files.vaa)?,
    };

    let flags = read_raster(config.flags())?;
    check_size("flags", &flags, width, height)?;

    let elevation: Box<dyn ElevationProvider> = match config.elevation() {
        Some(path) => {
            let dem = read_raster(path)?;
            check_size("elevation", &dem, width, height)?;
            match config.elevation_no_data() {
                Some(no_data) => Box::new(RasterElevation::with_no_data(dem, no_data)),
                None => Box::new(RasterElevation::new(dem)),
            }
        }
        None => Box::new(SeaLevel),
    };

    Scene::new(
        radiance,
        geometry,
        Box::new(FlagRaster::new(flags)),
        elevation,
        config.acquisition_date(),
    )
}

fn check_size(what: &str, raster: &Raster, width: usize, height: usize) -> Result<()> {
    if raster.dimensions() != (width, height) {
        return Err(ScapeError::dimension_mismatch(
            format!("{what} size"),
            format!("{width}x{height}"),
            format!("{}x{}", raster.width, raster.height),
        ));
    }
    Ok(())
}

/// Runs the retrieval described by `config` and writes its products, returning
/// the paths of the written images.
pub fn run(config: &Config) -> Result<Vec<PathBuf>> {
    info!("Loading lookup table from {}", config.lut_path().display());
    let lut = LutHandle::from_path_with_name(config.lut_path(), config.lut_file_name())?;
    info!(
        "Visibility range {:.3}-{:.3} km, water vapour range {:.3}-{:.3} g cm-2",
        lut.vis_min(),
        lut.vis_max(),
        lut.cwv_min(),
        lut.cwv_max()
    );

    let scene = load_scene(config)?;
    info!(
        "Loaded {}x{} scene acquired {}",
        scene.width(),
        scene.height(),
        scene.acquisition_date()
    );

    let pipeline = Pipeline::new(&lut, retrieval_settings(config))?;
    let result = pipeline.process(&scene)?;

    write_products(config, &result)
}

fn write_products(config: &Config, result: &SceneResult) -> Result<Vec<PathBuf>> {
    let writer = GeoTiffWriter::new(
        config.output_directory(),
        config.acquisition_date(),
        result.grid.cell_size,
    )?;

    let mut written = vec![
        writer.write("visibility", "km", VISIBILITY_NODATA, &result.visibility)?,
        writer.write("aot550", "1", AOT_NODATA, &result.aot550)?,
        writer.write("water_vapour", "g cm-2", AC_NODATA, &result.water_vapour)?,
    ];

    for (band, raster) in result.reflectance.iter().enumerate() {
        let Some(raster) = raster else {
            continue;
        };
        if band == BAND2_INDEX && !config.write_reflectance_band2() {
            continue;
        }
        written.push(writer.write(&format!("reflec_{}", band + 1), "1", AC_NODATA, raster)?);
    }

    if let Some(rho_toa) = &result.rho_toa {
        for (band, raster) in rho_toa.iter().enumerate() {
            written.push(writer.write(&format!("rho_toa_{}", band + 1), "1", AC_NODATA, raster)?);
        }
    }

    info!(
        "Wrote {} products to {}",
        written.len(),
        config.output_directory().display()
    );
    Ok(written)
}
