use crate::constants::VISIBILITY_NODATA;
use crate::readers::Raster;

/// Whether a cell visibility carries a value.
pub fn is_valid_visibility(value: f64) -> bool {
    value.is_finite() && value > VISIBILITY_NODATA
}

/// One visibility value per cell [km], row major; [`VISIBILITY_NODATA`] marks
/// cells without an estimate.
#[derive(Debug, Clone, PartialEq)]
pub struct VisibilityField {
    cols: usize,
    rows: usize,
    values: Vec<f64>,
}

impl VisibilityField {
    pub fn new(cols: usize, rows: usize) -> Self {
        Self {
            cols,
            rows,
            values: vec![VISIBILITY_NODATA; cols * rows],
        }
    }

    pub fn from_values(cols: usize, rows: usize, values: Vec<f64>) -> Self {
        debug_assert_eq!(values.len(), cols * rows);
        Self { cols, rows, values }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn get(&self, col: usize, row: usize) -> f64 {
        self.values[row * self.cols + col]
    }

    pub fn set(&mut self, col: usize, row: usize, value: f64) {
        self.values[row * self.cols + col] = value;
    }

    pub fn is_valid(&self, col: usize, row: usize) -> bool {
        is_valid_visibility(self.get(col, row))
    }

    pub fn valid_count(&self) -> usize {
        self.values.iter().filter(|&&v| is_valid_visibility(v)).count()
    }

    /// Mean over the valid cells, `None` if there are none.
    pub fn valid_mean(&self) -> Option<f64> {
        let (sum, count) = self
            .values
            .iter()
            .filter(|&&v| is_valid_visibility(v))
            .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
        (count > 0).then(|| sum / count as f64)
    }

    /// The field as a raster with one sample per cell.
    pub fn to_raster(&self) -> Raster {
        Raster::new(
            self.cols as u32,
            self.rows as u32,
            self.values.iter().map(|&v| v as f32).collect(),
        )
    }
}
