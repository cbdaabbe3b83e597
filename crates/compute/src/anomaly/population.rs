//! Population-level statistics for a detection window.
//!
//! Variance uses the full count as denominator: the window is the whole
//! population being judged, not a sample of a larger one.

use serde::Serialize;

/// Mean, variance and standard deviation of one window of values.
///
/// Moments are computed on values divided by the window's largest
/// magnitude, so windows near `f64::MAX` keep a finite mean and std-dev.
/// `variance` is reported for display and may be `inf` for such windows;
/// scoring never uses it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PopulationStats {
    pub count: usize,
    pub mean: f64,
    pub variance: f64,
    pub std_dev: f64,
    #[serde(skip)]
    scale: f64,
    #[serde(skip)]
    scaled_mean: f64,
    #[serde(skip)]
    scaled_std_dev: f64,
}

impl PopulationStats {
    /// Compute population statistics. Returns `None` for an empty slice.
    pub fn from_values(values: &[f64]) -> Option<Self> {
        let first = *values.first()?;

        // A constant window has exactly zero spread; summing it can leave
        // rounding residue (0.1 * 3 / 3 != 0.1) that would score as +/-1.
        if values.iter().all(|v| *v == first) {
            return Some(Self {
                count: values.len(),
                mean: first,
                variance: 0.0,
                std_dev: 0.0,
                scale: 1.0,
                scaled_mean: 0.0,
                scaled_std_dev: 0.0,
            });
        }

        // Non-constant, so at least one value is nonzero.
        let scale = values.iter().fold(0.0_f64, |m, v| m.max(v.abs()));
        let n = values.len() as f64;
        let scaled_mean = values.iter().map(|v| v / scale).sum::<f64>() / n;
        let scaled_variance = values
            .iter()
            .map(|v| (v / scale - scaled_mean).powi(2))
            .sum::<f64>()
            / n;
        let scaled_std_dev = scaled_variance.sqrt();
        let std_dev = scaled_std_dev * scale;

        Some(Self {
            count: values.len(),
            mean: scaled_mean * scale,
            variance: std_dev * std_dev,
            std_dev,
            scale,
            scaled_mean,
            scaled_std_dev,
        })
    }

    /// Standard score of `value`. A zero-variance window scores everything 0.
    pub fn z_score(&self, value: f64) -> f64 {
        if self.scaled_std_dev > 0.0 {
            (value / self.scale - self.scaled_mean) / self.scaled_std_dev
        } else {
            0.0
        }
    }
}
