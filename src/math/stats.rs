/// Arithmetic mean; NaN for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n - 1 denominator).
pub fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let sum_sq = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>();
    (sum_sq / (values.len() - 1) as f64).sqrt()
}

/// Index and value of the smallest element, first one on ties.
pub fn min_with_index(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((i, v)),
        })
}

/// Least squares fit of `y = a + b * x`, returned as `(a, b)`.
pub fn linear_fit(x: &[f64], y: &[f64]) -> Option<(f64, f64)> {
    let n = x.len().min(y.len());
    if n < 2 {
        return None;
    }
    let mx = mean(&x[..n]);
    let my = mean(&y[..n]);
    let mut sxx = 0.0;
    let mut sxy = 0.0;
    for i in 0..n {
        sxx += (x[i] - mx) * (x[i] - mx);
        sxy += (x[i] - mx) * (y[i] - my);
    }
    if sxx == 0.0 {
        return None;
    }
    let b = sxy / sxx;
    Some((my - b * mx, b))
}

/// Linear interpolation on a sorted grid: the bracketing node and the fraction
/// towards the next one. Values outside the grid extrapolate from the edge interval.
pub fn grid_position(grid: &[f64], value: f64) -> (usize, f64) {
    let last = grid.len().saturating_sub(2);
    let mut lower = 0;
    for (i, &node) in grid.iter().enumerate().take(last + 1) {
        if value >= node {
            lower = i;
        }
    }
    let fraction = (value - grid[lower]) / (grid[lower + 1] - grid[lower]);
    (lower, fraction)
}
