//! Filling of cells without a visibility estimate.
//!
//! Every missing cell is replaced by the mean of the valid cells around it. The
//! window shrinks towards the grid edge; on the edge itself the direct neighbours
//! along the edge count twice. Cells whose window holds no valid value get the
//! mean of the whole field. All windows read the field as it was before filling.

use tracing::{debug, warn};

use crate::retrieval::field::VisibilityField;

/// Number of cells between a cell and the nearest grid edge.
pub fn min_distance_to_edge(col: usize, row: usize, cols: usize, rows: usize) -> usize {
    col.min(row)
        .min(cols.saturating_sub(1 + col))
        .min(rows.saturating_sub(1 + row))
}

// Mean of the valid cells within `radius`, zero when there are none
fn window_mean(field: &VisibilityField, col: usize, row: usize, radius: usize) -> f64 {
    let mut sum = 0.0;
    let mut count = 0;
    for r in row.saturating_sub(radius)..=(row + radius).min(field.rows() - 1) {
        for c in col.saturating_sub(radius)..=(col + radius).min(field.cols() - 1) {
            if field.is_valid(c, r) {
                sum += field.get(c, r);
                count += 1;
            }
        }
    }
    if count > 0 { sum / count as f64 } else { 0.0 }
}

fn border_mean(field: &VisibilityField, col: usize, row: usize) -> f64 {
    let (cols, rows) = (field.cols(), field.rows());
    let mut sum = 0.0;
    let mut count = 0;
    for r in row.saturating_sub(1)..=(row + 1).min(rows - 1) {
        for c in col.saturating_sub(1)..=(col + 1).min(cols - 1) {
            if !field.is_valid(c, r) {
                continue;
            }
            let value = field.get(c, r);
            let weight = if min_distance_to_edge(c, r, cols, rows) == 0 && (c == col || r == row) {
                2
            } else {
                1
            };
            sum += weight as f64 * value;
            count += weight;
        }
    }
    if count > 0 { sum / count as f64 } else { 0.0 }
}

/// Returns a copy of `field` with every missing cell filled.
///
/// A field without any valid cell is returned unchanged.
pub fn gap_fill(field: &VisibilityField) -> VisibilityField {
    let Some(field_mean) = field.valid_mean() else {
        warn!("No cell has a visibility estimate, nothing to fill from");
        return field.clone();
    };

    let (cols, rows) = (field.cols(), field.rows());
    let mut filled = field.clone();
    let mut n_filled = 0;

    for row in 0..rows {
        for col in 0..cols {
            if field.is_valid(col, row) {
                continue;
            }
            let distance = min_distance_to_edge(col, row, cols, rows);
            let mut value = match distance {
                0 => border_mean(field, col, row),
                1 => window_mean(field, col, row, 1),
                _ => window_mean(field, col, row, 2),
            };
            if value == 0.0 && distance >= 3 {
                value = window_mean(field, col, row, 3);
            }
            if value == 0.0 {
                value = field_mean;
            }
            filled.set(col, row, value);
            n_filled += 1;
        }
    }

    debug!(
        filled = n_filled,
        cells = cols * rows,
        "Gap filled visibility field"
    );
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::VISIBILITY_NODATA;

    const NO: f64 = VISIBILITY_NODATA;

    #[test]
    fn test_min_distance_to_edge() {
        for (cols, rows) in [(1, 1), (4, 3), (7, 9)] {
            for row in 0..rows {
                for col in 0..cols {
                    let expected = col.min(row).min(cols - 1 - col).min(rows - 1 - row);
                    assert_eq!(min_distance_to_edge(col, row, cols, rows), expected);
                }
            }
        }
    }

    #[test]
    fn test_single_missing_cell_gets_neighbour_mean() {
        let field = VisibilityField::from_values(
            3,
            3,
            vec![1.0, 2.0, 3.0, 4.0, NO, 6.0, 7.0, 8.0, 9.0],
        );
        let filled = gap_fill(&field);
        assert!((filled.get(1, 1) - 5.0).abs() < 1e-12);
        assert_eq!(filled.get(2, 2), 9.0);
    }

    #[test]
    fn test_interior_cell_uses_wide_window() {
        let mut values: Vec<f64> = (1..=25).map(f64::from).collect();
        values[12] = NO;
        let filled = gap_fill(&VisibilityField::from_values(5, 5, values));
        assert!((filled.get(2, 2) - 13.0).abs() < 1e-12);
    }

    #[test]
    fn test_corner_weights_edge_neighbours_twice() {
        let field = VisibilityField::from_values(
            3,
            3,
            vec![NO, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0],
        );
        let filled = gap_fill(&field);
        // (2 * 2 + 2 * 4 + 5) / 5
        assert!((filled.get(0, 0) - 3.4).abs() < 1e-12);
    }

    #[test]
    fn test_empty_window_falls_back_to_field_mean() {
        let mut values = vec![NO; 25];
        values[0] = 10.0;
        values[24] = 30.0;
        let filled = gap_fill(&VisibilityField::from_values(5, 5, values));
        assert!((filled.get(1, 1) - 10.0).abs() < 1e-12);
        assert!((filled.get(3, 3) - 30.0).abs() < 1e-12);
        assert!((filled.get(1, 3) - 20.0).abs() < 1e-12);
        assert!((filled.get(2, 2) - 20.0).abs() < 1e-12);
        assert_eq!(filled.valid_count(), 25);
    }

    #[test]
    fn test_wider_retry_far_from_edges() {
        // (1, 1) is outside the 5x5 window of (4, 4) but inside its 7x7 window
        let mut values = vec![NO; 81];
        values[0] = 100.0;
        values[9 + 1] = 12.0;
        let filled = gap_fill(&VisibilityField::from_values(9, 9, values));
        assert!((filled.get(4, 4) - 12.0).abs() < 1e-12);
        // no retry two cells from the edge, the field mean applies
        assert!((filled.get(6, 6) - 56.0).abs() < 1e-12);
    }

    #[test]
    fn test_field_without_estimates_stays_empty() {
        let field = VisibilityField::new(4, 3);
        assert_eq!(gap_fill(&field), field);
    }
}
