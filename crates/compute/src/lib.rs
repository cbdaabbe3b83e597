//! Statistical outlier detection over a window of telemetry readings.

pub mod anomaly;

pub use anomaly::population::PopulationStats;
pub use anomaly::{detect, AnomalyDetector, ScoredReading, DEFAULT_ANOMALY_THRESHOLD};
