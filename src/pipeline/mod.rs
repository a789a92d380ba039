//! Scene level retrieval.
//!
//! [`Pipeline::process`] runs the retrieval chain on an in-memory [`Scene`]:
//! cell visibility, gap filling, smoothing, AOT conversion and the per-pixel
//! water vapour and reflectance solve. [`runner::run`] wraps it with file input
//! and product output.

pub mod runner;

pub use runner::run;

use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::constants::{AC_NODATA, AOT_NODATA, RR_PIXELS_PER_CELL, VISIBILITY_NODATA};
use crate::error::Result;
use crate::lut::LutHandle;
use crate::readers::Raster;
use crate::retrieval::{
    Cell, CellCorrection, CellGrid, CorrectionSettings, VisibilityEstimator, VisibilityField,
    VisibilitySettings, VisibilityToAot, correct_cell, gap_fill, smooth_visibility,
};
use crate::scene::{Scene, validity_strategy};

/// Processing options of a scene run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalSettings {
    /// Cell side in pixels.
    pub cell_size: usize,
    pub compute_over_water: bool,
    pub use_dem: bool,
    pub visibility: VisibilitySettings,
    pub correction: CorrectionSettings,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            cell_size: RR_PIXELS_PER_CELL,
            compute_over_water: false,
            use_dem: true,
            visibility: VisibilitySettings::default(),
            correction: CorrectionSettings::default(),
        }
    }
}

/// Products of one scene.
#[derive(Debug, Clone)]
pub struct SceneResult {
    pub grid: CellGrid,
    /// Cell visibilities before gap filling [km].
    pub cell_visibility: VisibilityField,
    /// Visibility per pixel after gap filling and smoothing [km].
    pub visibility: Raster,
    pub aot550: Raster,
    /// Water vapour column [g cm-2].
    pub water_vapour: Raster,
    /// Surface reflectance per band, `None` for the absorption bands.
    pub reflectance: Vec<Option<Raster>>,
    pub rho_toa: Option<Vec<Raster>>,
    pub refined_cells: usize,
    pub unconverged_cells: usize,
    /// Pixels that fell back to the default water vapour.
    pub water_vapour_fallbacks: usize,
}

pub struct Pipeline<'a> {
    lut: &'a LutHandle,
    settings: RetrievalSettings,
    aot: VisibilityToAot,
}

impl<'a> Pipeline<'a> {
    pub fn new(lut: &'a LutHandle, settings: RetrievalSettings) -> Result<Self> {
        Ok(Self {
            lut,
            settings,
            aot: VisibilityToAot::from_lut(lut)?,
        })
    }

    pub fn settings(&self) -> &RetrievalSettings {
        &self.settings
    }

    pub fn process(&self, scene: &Scene) -> Result<SceneResult> {
        let grid = CellGrid::new(scene.width(), scene.height(), self.settings.cell_size);
        info!(
            "Processing {}x{} scene in {} cells of {} pixels",
            grid.width,
            grid.height,
            grid.len(),
            grid.cell_size
        );

        let validity = validity_strategy(scene.classifier(), self.settings.compute_over_water);
        let cells: Vec<Cell> = grid
            .rects()
            .into_par_iter()
            .map(|rect| {
                Cell::extract(
                    scene,
                    rect,
                    self.lut,
                    validity.as_ref(),
                    self.settings.use_dem,
                )
            })
            .collect();

        // visibility per cell
        let estimator = VisibilityEstimator::new(self.lut, self.settings.visibility);
        let estimates: Vec<_> = cells.par_iter().map(|cell| estimator.estimate(cell)).collect();

        let refined_cells = estimates.iter().flatten().filter(|e| e.refined).count();
        let unconverged_cells = estimates.iter().flatten().filter(|e| !e.converged).count();
        let cell_visibility = VisibilityField::from_values(
            grid.cols,
            grid.rows,
            estimates
                .iter()
                .map(|e| e.map_or(VISIBILITY_NODATA, |e| e.visibility))
                .collect(),
        );
        info!(
            "Visibility estimated for {} of {} cells ({} refined)",
            cell_visibility.valid_count(),
            grid.len(),
            refined_cells
        );
        if unconverged_cells > 0 {
            warn!(
                "Minimization hit the iteration cap in {} cells",
                unconverged_cells
            );
        }

        let gap_filled = gap_fill(&cell_visibility);
        let visibility = smooth_visibility(&gap_filled, &grid);
        let aot550 = self.aot_raster(&visibility, &cells, &grid);

        // water vapour and reflectance per pixel
        let corrections: Vec<CellCorrection> = cells
            .par_iter()
            .map(|cell| correct_cell(self.lut, cell, &visibility, &self.settings.correction))
            .collect();
        let water_vapour_fallbacks = corrections.iter().map(|c| c.fallbacks).sum();
        if water_vapour_fallbacks > 0 {
            debug!(
                "Water vapour root not bracketed for {} pixels",
                water_vapour_fallbacks
            );
        }

        let (water_vapour, reflectance, rho_toa) = self.assemble(&grid, &corrections);

        Ok(SceneResult {
            grid,
            cell_visibility,
            visibility,
            aot550,
            water_vapour,
            reflectance,
            rho_toa,
            refined_cells,
            unconverged_cells,
            water_vapour_fallbacks,
        })
    }

    fn aot_raster(&self, visibility: &Raster, cells: &[Cell], grid: &CellGrid) -> Raster {
        let width = grid.width;
        let mut elevation = vec![f64::NAN; grid.width * grid.height];
        for cell in cells {
            let rect = cell.rect;
            for (i, &h) in cell.elevation.iter().enumerate() {
                elevation[(rect.y0 + i / rect.width) * width + rect.x0 + i % rect.width] = h;
            }
        }

        let mut aot = vec![AOT_NODATA as f32; grid.width * grid.height];
        if width > 0 {
            aot.par_chunks_mut(width)
                .zip(visibility.buffer.par_chunks(width))
                .zip(elevation.par_chunks(width))
                .for_each(|((aot_row, vis_row), hsf_row)| {
                    for ((aot, &vis), &hsf) in aot_row.iter_mut().zip(vis_row).zip(hsf_row) {
                        *aot = self.aot.aot550(vis as f64, hsf) as f32;
                    }
                });
        }
        Raster::new(grid.width as u32, grid.height as u32, aot)
    }

    #[allow(clippy::type_complexity)]
    fn assemble(
        &self,
        grid: &CellGrid,
        corrections: &[CellCorrection],
    ) -> (Raster, Vec<Option<Raster>>, Option<Vec<Raster>>) {
        let (w, h) = (grid.width as u32, grid.height as u32);
        let bands = self.lut.bands();
        let roles = bands.roles();
        let blank = || Raster::filled(w, h, AC_NODATA as f32);

        let mut water_vapour = blank();
        let mut reflectance: Vec<Option<Raster>> = (0..bands.len())
            .map(|band| (!roles.is_excluded(band)).then(blank))
            .collect();
        let mut rho_toa = self
            .settings
            .correction
            .compute_rho_toa
            .then(|| (0..bands.len()).map(|_| blank()).collect::<Vec<_>>());

        for correction in corrections {
            let rect = correction.rect;
            for i in 0..rect.len() {
                let (x, y) = (rect.x0 + i % rect.width, rect.y0 + i / rect.width);
                water_vapour.set(x, y, correction.water_vapour[i] as f32);
                for (band, raster) in reflectance.iter_mut().enumerate() {
                    if let Some(raster) = raster {
                        raster.set(x, y, correction.reflectance[band][i] as f32);
                    }
                }
                if let (Some(rasters), Some(values)) = (rho_toa.as_mut(), &correction.rho_toa) {
                    for (raster, band_values) in rasters.iter_mut().zip(values) {
                        raster.set(x, y, band_values[i] as f32);
                    }
                }
            }
        }

        (water_vapour, reflectance, rho_toa)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lut::synthetic::synthetic_handle;
    use crate::retrieval::is_valid_visibility;
    use crate::sat_bands::NUM_BANDS;
    use crate::scene::{FlagRaster, Geometry, PixelFlags, SeaLevel};
    use chrono::NaiveDate;

    fn scene(width: u32, height: u32, flags: Raster) -> Scene {
        let radiance = (0..NUM_BANDS)
            .map(|b| Raster::from_fn(width, height, |x, y| 40.0 + b as f32 + (x + y) as f32 * 0.5))
            .collect();
        let geometry = Geometry {
            sza: Raster::filled(width, height, 35.0),
            vza: Raster::filled(width, height, 10.0),
            saa: Raster::filled(width, height, 150.0),
            vaa: Raster::filled(width, height, 100.0),
        };
        let date = NaiveDate::from_ymd_opt(2011, 7, 2).expect("Invalid date");
        Scene::new(radiance, geometry, Box::new(FlagRaster::new(flags)), Box::new(SeaLevel), date)
            .unwrap()
    }

    #[test]
    fn test_products_share_scene_dimensions() {
        let lut = synthetic_handle();
        let settings = RetrievalSettings {
            cell_size: 4,
            ..Default::default()
        };
        let pipeline = Pipeline::new(&lut, settings).unwrap();
        let result = pipeline.process(&scene(10, 7, Raster::filled(10, 7, 0.0))).unwrap();

        assert_eq!((result.grid.cols, result.grid.rows), (3, 2));
        assert_eq!(result.visibility.dimensions(), (10, 7));
        assert_eq!(result.aot550.dimensions(), (10, 7));
        assert_eq!(result.water_vapour.dimensions(), (10, 7));
        assert_eq!(result.reflectance.iter().filter(|r| r.is_none()).count(), 2);
        assert!(result.reflectance[10].is_none() && result.reflectance[14].is_none());
        assert!(result.rho_toa.is_none());
        assert!(result.visibility.buffer.iter().all(|&v| is_valid_visibility(v as f64)));
    }

    #[test]
    fn test_cloudy_scene_yields_no_data() {
        let lut = synthetic_handle();
        let settings = RetrievalSettings {
            cell_size: 4,
            ..Default::default()
        };
        let pipeline = Pipeline::new(&lut, settings).unwrap();
        let flags = Raster::filled(8, 8, PixelFlags::CLOUD as f32);
        let result = pipeline.process(&scene(8, 8, flags)).unwrap();

        assert_eq!(result.cell_visibility.valid_count(), 0);
        assert!(result.visibility.buffer.iter().all(|&v| v == VISIBILITY_NODATA as f32));
        assert!(result.aot550.buffer.iter().all(|&v| v == AOT_NODATA as f32));
        assert!(result.water_vapour.buffer.iter().all(|&v| v == AC_NODATA as f32));
    }
}
