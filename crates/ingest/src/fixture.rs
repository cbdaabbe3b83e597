//! In-memory telemetry source.
//!
//! Serves readings registered per device, either hand-built, loaded from a
//! JSON file (`[{"timestamp": "...", "value": 1.0}, ...]`), or the
//! historian demo fixture. Window filtering mirrors the database query.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use vigil_core::Reading;

use crate::traits::{IngestError, TelemetrySource};

/// Where the trailing window ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WindowAnchor {
    /// Wall-clock time at fetch, like a live historian query.
    Now,
    /// The newest reading held for the device; used for replayed recordings.
    LatestReading,
    /// A fixed instant.
    At(DateTime<Utc>),
}

#[derive(Debug, Clone)]
pub struct StaticSource {
    devices: HashMap<String, Vec<Reading>>,
    anchor: WindowAnchor,
}

impl Default for StaticSource {
    fn default() -> Self {
        Self::new()
    }
}

impl StaticSource {
    pub fn new() -> Self {
        Self {
            devices: HashMap::new(),
            anchor: WindowAnchor::Now,
        }
    }

    pub fn anchored(mut self, anchor: WindowAnchor) -> Self {
        self.anchor = anchor;
        self
    }

    /// Register readings for a device. They are kept sorted oldest first.
    pub fn with_device(mut self, device_id: impl Into<String>, mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.timestamp);
        self.devices.insert(device_id.into(), readings);
        self
    }

    /// Load one device's readings from a JSON array file.
    pub fn from_json_file(path: impl AsRef<Path>, device_id: &str) -> Result<Self, IngestError> {
        let readings = read_readings_file(path.as_ref())?;
        tracing::info!(
            path = %path.as_ref().display(),
            device_id,
            readings = readings.len(),
            "loaded readings file"
        );
        Ok(Self::new()
            .anchored(WindowAnchor::LatestReading)
            .with_device(device_id, readings))
    }

    /// Serve the historian demo sample for each of `device_ids`.
    pub fn historian_demo<S: AsRef<str>>(device_ids: &[S]) -> Self {
        device_ids.iter().fold(Self::new(), |source, id| {
            source.with_device(id.as_ref(), historian_demo_readings())
        })
    }

    fn window_end(&self, readings: &[Reading]) -> DateTime<Utc> {
        match self.anchor {
            WindowAnchor::Now => Utc::now(),
            WindowAnchor::LatestReading => readings
                .last()
                .map(|r| r.timestamp)
                .unwrap_or_else(Utc::now),
            WindowAnchor::At(at) => at,
        }
    }
}

/// Parse a JSON array of readings, in file order.
pub fn read_readings_file(path: impl AsRef<Path>) -> Result<Vec<Reading>, IngestError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// The four-point sample the historian worker shipped with, stamped over
/// the last few minutes. 105.4 stands out by eye but scores only ~1.72.
pub fn historian_demo_readings() -> Vec<Reading> {
    let now = Utc::now();
    [98.6, 99.1, 105.4, 98.2]
        .iter()
        .enumerate()
        .map(|(i, v)| Reading::new(now - Duration::minutes(4 - i as i64), *v))
        .collect()
}

#[async_trait]
impl TelemetrySource for StaticSource {
    async fn fetch(
        &self,
        device_id: &str,
        window_minutes: u32,
    ) -> Result<Vec<Reading>, IngestError> {
        let Some(readings) = self.devices.get(device_id) else {
            tracing::debug!(device_id, "no readings registered for device");
            return Ok(Vec::new());
        };

        let end = self.window_end(readings);
        let start = end - Duration::minutes(i64::from(window_minutes));

        Ok(readings
            .iter()
            .filter(|r| r.timestamp > start && r.timestamp <= end)
            .copied()
            .collect())
    }

    fn source_name(&self) -> &str {
        "static"
    }
}
