use crate::lut::{LutCoordinate, LutHandle};
use crate::scene::{PixelGeometry, PixelValidity, Scene};

/// Tiling of the scene into square cells; the last column and row may be partial.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGrid {
    pub width: usize,
    pub height: usize,
    pub cell_size: usize,
    pub cols: usize,
    pub rows: usize,
}

impl CellGrid {
    pub fn new(width: usize, height: usize, cell_size: usize) -> Self {
        let cell_size = cell_size.max(1);
        Self {
            width,
            height,
            cell_size,
            cols: width.div_ceil(cell_size),
            rows: height.div_ceil(cell_size),
        }
    }

    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of cell columns and rows that are completely inside the scene.
    pub fn full_cells(&self) -> (usize, usize) {
        (self.width / self.cell_size, self.height / self.cell_size)
    }

    pub fn rect(&self, col: usize, row: usize) -> CellRect {
        let x0 = col * self.cell_size;
        let y0 = row * self.cell_size;
        CellRect {
            col,
            row,
            x0,
            y0,
            width: self.cell_size.min(self.width - x0),
            height: self.cell_size.min(self.height - y0),
        }
    }

    /// All cells in row major order.
    pub fn rects(&self) -> Vec<CellRect> {
        (0..self.rows)
            .flat_map(|row| (0..self.cols).map(move |col| self.rect(col, row)))
            .collect()
    }
}

/// Pixel extent of one cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRect {
    pub col: usize,
    pub row: usize,
    pub x0: usize,
    pub y0: usize,
    pub width: usize,
    pub height: usize,
}

impl CellRect {
    pub fn len(&self) -> usize {
        self.width * self.height
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn centre(&self) -> (usize, usize) {
        (self.x0 + self.width / 2, self.y0 + self.height / 2)
    }
}

/// Per-pixel inputs of a cell, in row major order inside the cell.
#[derive(Debug, Clone)]
pub struct Cell {
    pub rect: CellRect,
    pub geometry: PixelGeometry, // at the cell centre, clamped to the table
    pub elevation: Vec<f64>,     // [km], clamped to the table
    pub cos_sza: Vec<f64>,
    pub toa: Vec<Vec<f64>>, // [band][pixel], lookup table radiance units
    pub valid: Vec<bool>,
}

/// Aggregates over the valid pixels of a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct CellStatistics {
    pub elevation_mean: f64,
    pub cos_sza_mean: f64,
    pub toa_min: Vec<f64>,
}

impl Cell {
    pub fn extract(
        scene: &Scene,
        rect: CellRect,
        lut: &LutHandle,
        validity: &dyn PixelValidity,
        use_dem: bool,
    ) -> Self {
        let factor = scene.radiance_factor();
        let n_bands = lut.bands().len();
        let n = rect.len();

        let mut elevation = Vec::with_capacity(n);
        let mut cos_sza = Vec::with_capacity(n);
        let mut valid = Vec::with_capacity(n);
        let mut toa = vec![Vec::with_capacity(n); n_bands];

        for y in rect.y0..rect.y0 + rect.height {
            for x in rect.x0..rect.x0 + rect.width {
                let metres = if use_dem {
                    scene.elevation().elevation_m(x, y)
                } else {
                    f64::NAN
                };
                elevation.push(lut.clamp_elevation_m(metres));
                cos_sza.push(scene.cos_sza(x, y));
                valid.push(validity.is_valid(x, y));
                for (band, values) in toa.iter_mut().enumerate() {
                    values.push(scene.radiance(band, x, y) * factor);
                }
            }
        }

        let (cx, cy) = rect.centre();
        let centre = scene.geometry_at(cx, cy);
        let (vza, sza, raa) = lut.clamp_geometry(centre.vza, centre.sza, centre.raa);

        Cell {
            rect,
            geometry: PixelGeometry { vza, sza, raa },
            elevation,
            cos_sza,
            toa,
            valid,
        }
    }

    pub fn len(&self) -> usize {
        self.valid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty()
    }

    /// Fraction of valid pixels.
    pub fn clear_fraction(&self) -> f64 {
        if self.valid.is_empty() {
            return 0.0;
        }
        self.valid.iter().filter(|&&v| v).count() as f64 / self.valid.len() as f64
    }

    /// Mean elevation, mean cos(sza) and per-band minimum TOA over valid pixels.
    ///
    /// Returns `None` when the cell has no valid pixel with usable elevation and
    /// sun angle.
    pub fn statistics(&self) -> Option<CellStatistics> {
        let mean_over_valid = |values: &[f64]| {
            let (sum, count) = values
                .iter()
                .zip(&self.valid)
                .filter(|&(v, &ok)| ok && !v.is_nan())
                .fold((0.0, 0usize), |(s, c), (v, _)| (s + v, c + 1));
            (count > 0).then(|| sum / count as f64)
        };

        let elevation_mean = mean_over_valid(&self.elevation)?;
        let cos_sza_mean = mean_over_valid(&self.cos_sza)?;

        let toa_min = self
            .toa
            .iter()
            .map(|band| {
                band.iter()
                    .zip(&self.valid)
                    .filter(|&(v, &ok)| ok && *v > 0.0)
                    .fold(f64::MAX, |m, (v, _)| m.min(*v))
            })
            .collect();

        Some(CellStatistics {
            elevation_mean,
            cos_sza_mean,
            toa_min,
        })
    }

    /// Table coordinate at the cell geometry for a given elevation, visibility and
    /// water vapour.
    pub fn coordinate(&self, hsf: f64, vis: f64, cwv: f64) -> LutCoordinate {
        LutCoordinate::new(
            self.geometry.vza,
            self.geometry.sza,
            self.geometry.raa,
            hsf,
            vis,
            cwv,
        )
    }
}
