//! Z-score anomaly detection over one window of readings.
//!
//! Sub-modules:
//! - [`population`]: population-level statistics (mean, variance, std-dev)

pub mod population;

use vigil_core::{Anomaly, DetectError, Reading};

use population::PopulationStats;

/// Default |z| above which a reading is considered anomalous.
pub const DEFAULT_ANOMALY_THRESHOLD: f64 = 3.0;

/// A reading paired with its standard score, flagged or not.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredReading {
    pub reading: Reading,
    pub z_score: f64,
}

/// Single-pass statistical filter.
///
/// Scores every reading against the mean and population standard
/// deviation of its own window and keeps those whose |z| exceeds the
/// threshold. Detection is pure: the input is borrowed, never mutated,
/// and identical input yields identical output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnomalyDetector {
    threshold: f64,
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_ANOMALY_THRESHOLD,
        }
    }
}

impl AnomalyDetector {
    /// Detector with the default threshold of 3.0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Detector with a custom threshold, which must be finite and non-negative.
    pub fn with_threshold(threshold: f64) -> Result<Self, DetectError> {
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(DetectError::InvalidThreshold(threshold));
        }
        Ok(Self { threshold })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Window statistics, or `None` for an empty window.
    pub fn stats(&self, readings: &[Reading]) -> Result<Option<PopulationStats>, DetectError> {
        let values = finite_values(readings)?;
        Ok(PopulationStats::from_values(&values))
    }

    /// Score every reading in input order, without filtering.
    pub fn score(&self, readings: &[Reading]) -> Result<Vec<ScoredReading>, DetectError> {
        let Some(stats) = self.stats(readings)? else {
            return Ok(Vec::new());
        };

        Ok(readings
            .iter()
            .map(|r| ScoredReading {
                reading: *r,
                z_score: stats.z_score(r.value),
            })
            .collect())
    }

    /// Return the readings whose |z| exceeds the threshold, in input order.
    pub fn detect(&self, readings: &[Reading]) -> Result<Vec<Anomaly>, DetectError> {
        Ok(self
            .score(readings)?
            .into_iter()
            .filter(|s| s.z_score.abs() > self.threshold)
            .map(|s| Anomaly::from_reading(&s.reading, s.z_score))
            .collect())
    }
}

/// Run detection once with an explicit threshold.
pub fn detect(readings: &[Reading], threshold: f64) -> Result<Vec<Anomaly>, DetectError> {
    AnomalyDetector::with_threshold(threshold)?.detect(readings)
}

/// Collect values, rejecting NaN and infinities before they reach the statistics.
fn finite_values(readings: &[Reading]) -> Result<Vec<f64>, DetectError> {
    readings
        .iter()
        .enumerate()
        .map(|(index, r)| {
            if r.value.is_finite() {
                Ok(r.value)
            } else {
                Err(DetectError::InvalidReading {
                    index,
                    value: r.value,
                })
            }
        })
        .collect()
}
