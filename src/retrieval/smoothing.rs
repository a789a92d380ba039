//! Low-pass filtering of the cell visibility field and upsampling to pixels.
//!
//! Only cells that lie completely inside the scene take part in the smoothing.
//! Pixels of the partial right and bottom cells are copied from the nearest
//! smoothed pixel, anything left without a value falls back to the gap-filled
//! cell value.

use crate::constants::VISIBILITY_NODATA;
use crate::readers::Raster;
use crate::retrieval::cell::CellGrid;
use crate::retrieval::field::{VisibilityField, is_valid_visibility};

/// 5-point cross average over the first `cols` x `rows` cells, normalised over the
/// valid neighbours.
pub fn smooth_cells(field: &VisibilityField, cols: usize, rows: usize) -> VisibilityField {
    let mut smoothed = VisibilityField::new(cols, rows);
    for row in 0..rows {
        for col in 0..cols {
            let mut neighbours = vec![(col, row)];
            if col > 0 {
                neighbours.push((col - 1, row));
            }
            if col + 1 < cols {
                neighbours.push((col + 1, row));
            }
            if row > 0 {
                neighbours.push((col, row - 1));
            }
            if row + 1 < rows {
                neighbours.push((col, row + 1));
            }

            let (sum, count) = neighbours
                .into_iter()
                .filter(|&(c, r)| field.is_valid(c, r))
                .fold((0.0, 0usize), |(s, n), (c, r)| (s + field.get(c, r), n + 1));
            if count > 0 {
                smoothed.set(col, row, sum / count as f64);
            }
        }
    }
    smoothed
}

// Fractional cell coordinate of a pixel centre, clamped to the outer cell centres
fn cell_position(pixel: usize, cell_size: usize, n_cells: usize) -> (usize, f64) {
    let f = ((pixel as f64 + 0.5) / cell_size as f64 - 0.5).clamp(0.0, (n_cells - 1) as f64);
    let lower = (f.floor() as usize).min(n_cells.saturating_sub(2));
    (lower, f - lower as f64)
}

/// Bilinear interpolation of `cells` between the cell centres onto a
/// `width` x `height` pixel buffer. Pixels beyond the covered cells stay no-data.
pub fn upsample(cells: &VisibilityField, cell_size: usize, width: usize, height: usize) -> Vec<f64> {
    let mut pixels = vec![VISIBILITY_NODATA; width * height];
    let (cols, rows) = (cells.cols(), cells.rows());
    if cols == 0 || rows == 0 {
        return pixels;
    }
    let covered_width = (cols * cell_size).min(width);
    let covered_height = (rows * cell_size).min(height);

    for y in 0..covered_height {
        let (r0, ty) = cell_position(y, cell_size, rows);
        let r1 = (r0 + 1).min(rows - 1);
        for x in 0..covered_width {
            let (c0, tx) = cell_position(x, cell_size, cols);
            let c1 = (c0 + 1).min(cols - 1);

            let corners = [
                (c0, r0, (1.0 - tx) * (1.0 - ty)),
                (c1, r0, tx * (1.0 - ty)),
                (c0, r1, (1.0 - tx) * ty),
                (c1, r1, tx * ty),
            ];
            let (sum, weight) = corners
                .iter()
                .filter(|&&(c, r, w)| w > 0.0 && cells.is_valid(c, r))
                .fold((0.0, 0.0), |(s, ws), &(c, r, w)| (s + w * cells.get(c, r), ws + w));
            if weight > 0.0 {
                pixels[y * width + x] = sum / weight;
            }
        }
    }
    pixels
}

/// Copies the nearest covered pixel into the partial strips right of
/// `covered_width` and below `covered_height`.
///
/// The right strip takes the last valid pixel of the same row and the bottom
/// strip the last valid pixel of the same column. The corner block takes a single
/// value: the innermost covered corner pixel, or the next valid one along the
/// diagonal towards the origin. It is not averaged from the right and bottom
/// strips, since the rows below the covered area carry no right-strip value.
pub fn backfill_partial_cells(
    pixels: &mut [f64],
    width: usize,
    height: usize,
    covered_width: usize,
    covered_height: usize,
) {
    if covered_width == 0 || covered_height == 0 {
        return;
    }

    // right strip: same row, scanning back into the covered area
    for y in 0..covered_height {
        let row = &pixels[y * width..y * width + covered_width];
        if let Some(&value) = row.iter().rev().find(|&&v| is_valid_visibility(v)) {
            for x in covered_width..width {
                pixels[y * width + x] = value;
            }
        }
    }

    // bottom strip: same column
    for x in 0..covered_width {
        let source = (0..covered_height)
            .rev()
            .map(|y| pixels[y * width + x])
            .find(|&v| is_valid_visibility(v));
        if let Some(value) = source {
            for y in covered_height..height {
                pixels[y * width + x] = value;
            }
        }
    }

    // corner block: innermost corner pixel, then along the diagonal
    let corner = (0..covered_width.min(covered_height))
        .map(|k| pixels[(covered_height - 1 - k) * width + covered_width - 1 - k])
        .find(|&v| is_valid_visibility(v));
    if let Some(value) = corner {
        for y in covered_height..height {
            for x in covered_width..width {
                pixels[y * width + x] = value;
            }
        }
    }
}

/// Per-pixel visibility raster from the gap-filled cell field.
pub fn smooth_visibility(gap_filled: &VisibilityField, grid: &CellGrid) -> Raster {
    let (width, height) = (grid.width, grid.height);
    let (full_cols, full_rows) = grid.full_cells();

    let mut pixels = if full_cols > 0 && full_rows > 0 {
        let smoothed = smooth_cells(gap_filled, full_cols, full_rows);
        let mut pixels = upsample(&smoothed, grid.cell_size, width, height);
        backfill_partial_cells(
            &mut pixels,
            width,
            height,
            full_cols * grid.cell_size,
            full_rows * grid.cell_size,
        );
        pixels
    } else {
        vec![VISIBILITY_NODATA; width * height]
    };

    // residual no-data from the cell values
    for y in 0..height {
        for x in 0..width {
            let pixel = &mut pixels[y * width + x];
            if !is_valid_visibility(*pixel) {
                *pixel = gap_filled.get(x / grid.cell_size, y / grid.cell_size);
            }
        }
    }

    Raster::new(
        width as u32,
        height as u32,
        pixels.into_iter().map(|v| v as f32).collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cross_kernel_damps_single_cell() {
        let mut values = vec![20.0; 9];
        values[4] = 40.0;
        let field = VisibilityField::from_values(3, 3, values);
        let smoothed = smooth_cells(&field, 3, 3);
        assert!((smoothed.get(1, 1) - 24.0).abs() < 1e-12);
        assert!((smoothed.get(1, 0) - 25.0).abs() < 1e-12);
        assert!((smoothed.get(0, 0) - 20.0).abs() < 1e-12);
    }

    #[test]
    fn test_kernel_skips_missing_cells() {
        let field = VisibilityField::from_values(3, 1, vec![10.0, VISIBILITY_NODATA, 30.0]);
        let smoothed = smooth_cells(&field, 3, 1);
        assert_eq!(smoothed.get(0, 0), 10.0);
        assert_eq!(smoothed.get(1, 0), 20.0);
    }

    #[test]
    fn test_bilinear_between_cell_centres() {
        let cells = VisibilityField::from_values(2, 1, vec![10.0, 20.0]);
        let pixels = upsample(&cells, 4, 8, 4);
        assert_eq!(pixels[0], 10.0);
        assert_eq!(pixels[1], 10.0);
        assert!((pixels[2] - 11.25).abs() < 1e-12);
        assert!((pixels[5] - 18.75).abs() < 1e-12);
        assert_eq!(pixels[7], 20.0);
        // rows are identical with a single cell row
        assert_eq!(pixels[3 * 8 + 2], pixels[2]);
    }

    #[test]
    fn test_partial_strips_copy_nearest_interior_pixel() {
        // 2 x 1 full cells of 4 pixels in a 10 x 6 scene
        let grid = CellGrid::new(10, 6, 4);
        let field = VisibilityField::from_values(3, 2, vec![10.0, 20.0, 99.0, 10.0, 20.0, 99.0]);
        let raster = smooth_visibility(&field, &grid);

        // smoothing averages the two full cells
        assert_eq!(raster.get(0, 0), 15.0);
        assert_eq!(raster.get(9, 2), raster.get(7, 2));
        assert_eq!(raster.get(3, 5), raster.get(3, 3));
        assert_eq!(raster.get(9, 5), raster.get(7, 3));
        assert!(raster.buffer.iter().all(|&v| v == 15.0));
    }

    #[test]
    fn test_right_strip_follows_row_values() {
        // one full cell column, the partial column holds no estimates
        let grid = CellGrid::new(5, 12, 4);
        let field = VisibilityField::from_values(2, 3, vec![10.0, 0.0, 20.0, 0.0, 60.0, 0.0]);
        let raster = smooth_visibility(&field, &grid);
        for y in 0..12 {
            assert_eq!(raster.get(4, y), raster.get(3, y));
        }
        assert_eq!(raster.get(0, 0), 15.0);
        assert_eq!(raster.get(0, 11), 40.0);
    }

    #[test]
    fn test_scene_smaller_than_a_cell_uses_cell_values() {
        let grid = CellGrid::new(3, 2, 4);
        let field = VisibilityField::from_values(1, 1, vec![33.0]);
        let raster = smooth_visibility(&field, &grid);
        assert!(raster.buffer.iter().all(|&v| v == 33.0));
    }

    #[test]
    fn test_empty_field_stays_no_data() {
        let grid = CellGrid::new(9, 9, 4);
        let raster = smooth_visibility(&VisibilityField::new(3, 3), &grid);
        assert!(raster.buffer.iter().all(|&v| v == VISIBILITY_NODATA as f32));
    }

    #[test]
    fn test_corner_block_takes_diagonal_pixel() {
        let no_data = VISIBILITY_NODATA;
        let mut pixels = vec![no_data; 25];
        for y in 0..3 {
            for x in 0..3 {
                pixels[y * 5 + x] = (x + 10 * y) as f64;
            }
        }
        pixels[2 * 5 + 2] = no_data;

        backfill_partial_cells(&mut pixels, 5, 5, 3, 3);

        // right strip of row 2 and bottom strip of column 2 skip the hole
        assert_eq!(pixels[2 * 5 + 4], 21.0);
        assert_eq!(pixels[4 * 5 + 2], 12.0);
        assert_eq!(pixels[3], 2.0);
        assert_eq!(pixels[3 * 5], 20.0);
        // corner block from (1, 1), not the mean of the neighbouring strips
        for y in 3..5 {
            for x in 3..5 {
                assert_eq!(pixels[y * 5 + x], 11.0);
            }
        }
    }
}
