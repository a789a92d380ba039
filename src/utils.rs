use serde::Serialize;
use tracing::info;

/// Summary of the valid samples of a raster product.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RasterStatistics {
    pub valid: usize,
    pub total: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl RasterStatistics {
    /// Statistics over the samples that are neither NaN nor equal to `no_data`.
    pub fn compute(values: &[f32], no_data: f32) -> Self {
        let valid_values: Vec<f64> = values
            .iter()
            .filter(|&&v| !v.is_nan() && v != no_data)
            .map(|&v| v as f64)
            .collect();

        let mean = if valid_values.is_empty() {
            f64::NAN
        } else {
            valid_values.iter().sum::<f64>() / valid_values.len() as f64
        };

        RasterStatistics {
            valid: valid_values.len(),
            total: values.len(),
            min: valid_values.iter().copied().fold(f64::NAN, f64::min),
            max: valid_values.iter().copied().fold(f64::NAN, f64::max),
            mean,
        }
    }

    pub fn valid_fraction(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.valid as f64 / self.total as f64
        }
    }
}

pub fn log_raster_statistics(name: &str, unit: &str, stats: &RasterStatistics) {
    info!(
        "{}: min {:.4} {unit}, max {:.4} {unit}, mean {:.4} {unit}, valid pixels {} / {} ({:.1}%)",
        name,
        stats.min,
        stats.max,
        stats.mean,
        stats.valid,
        stats.total,
        100.0 * stats.valid_fraction()
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_statistics_skip_no_data() {
        let stats = RasterStatistics::compute(&[1.0, -1.0, 3.0, f32::NAN, 2.0], -1.0);
        assert_eq!(stats.valid, 3);
        assert_eq!(stats.total, 5);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 3.0);
        assert!((stats.mean - 2.0).abs() < 1e-12);
        assert!((stats.valid_fraction() - 0.6).abs() < 1e-12);
    }

    #[test]
    fn test_statistics_without_valid_samples() {
        let stats = RasterStatistics::compute(&[-1.0, -1.0], -1.0);
        assert_eq!(stats.valid, 0);
        assert!(stats.mean.is_nan());
        assert!(stats.min.is_nan());
    }
}
