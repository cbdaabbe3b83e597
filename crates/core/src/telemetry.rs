//! Telemetry records flowing through a detection cycle.
//!
//! A [`Reading`] comes from a telemetry source, the detector turns the
//! outliers into [`Anomaly`] values, and the dispatcher renders each one
//! as an [`AlertPayload`] at publish time.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// |z| above which an anomaly is classified as critical.
pub const CRITICAL_Z_SCORE: f64 = 5.0;

/// A single timestamped sensor value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

impl Reading {
    pub fn new(timestamp: DateTime<Utc>, value: f64) -> Self {
        Self { timestamp, value }
    }
}

/// Alert severity of a flagged reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    /// Classify a z-score. Exactly `CRITICAL_Z_SCORE` is still a warning.
    pub fn from_z_score(z_score: f64) -> Self {
        if z_score.abs() > CRITICAL_Z_SCORE {
            Severity::Critical
        } else {
            Severity::Warning
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reading whose deviation exceeded the detection threshold.
///
/// Built from a copy of the source [`Reading`]; the input window is never
/// modified.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
    pub z_score: f64,
    pub severity: Severity,
}

impl Anomaly {
    pub fn from_reading(reading: &Reading, z_score: f64) -> Self {
        Self {
            timestamp: reading.timestamp,
            value: reading.value,
            z_score,
            severity: Severity::from_z_score(z_score),
        }
    }
}

/// Discriminator carried in the `type` field of every alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    AnomalyDetected,
}

/// Flat wire payload published once per anomaly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertPayload {
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub device_id: String,
    pub value: f64,
    pub severity: Severity,
    pub timestamp: String,
}

impl AlertPayload {
    /// Shape the alert for `anomaly` as observed on `device_id`.
    pub fn for_anomaly(device_id: &str, anomaly: &Anomaly) -> Self {
        Self {
            kind: AlertKind::AnomalyDetected,
            device_id: device_id.to_string(),
            value: anomaly.value,
            severity: anomaly.severity,
            timestamp: anomaly
                .timestamp
                .to_rfc3339_opts(SecondsFormat::AutoSi, true),
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn severity_boundary_is_exclusive() {
        assert_eq!(Severity::from_z_score(5.0), Severity::Warning);
        assert_eq!(Severity::from_z_score(-5.0), Severity::Warning);
        assert_eq!(Severity::from_z_score(5.0001), Severity::Critical);
        assert_eq!(Severity::from_z_score(-5.0001), Severity::Critical);
    }

    #[test]
    fn severity_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&Severity::Warning).unwrap(), "\"WARNING\"");
        assert_eq!(serde_json::to_string(&Severity::Critical).unwrap(), "\"CRITICAL\"");
        assert_eq!(Severity::Critical.to_string(), "CRITICAL");
    }

    #[test]
    fn anomaly_keeps_reading_fields() {
        let reading = Reading::new(at(5), 42.0);
        let anomaly = Anomaly::from_reading(&reading, -6.5);
        assert_eq!(anomaly.timestamp, reading.timestamp);
        assert_eq!(anomaly.value, 42.0);
        assert_eq!(anomaly.severity, Severity::Critical);
        assert_eq!(anomaly.z_score, -6.5);
    }

    #[test]
    fn payload_has_flat_wire_fields() {
        let anomaly = Anomaly::from_reading(&Reading::new(at(0), 105.4), 3.2);
        let payload = AlertPayload::for_anomaly("PUMP_7", &anomaly);
        let json: serde_json::Value = serde_json::from_str(&payload.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "ANOMALY_DETECTED");
        assert_eq!(json["device_id"], "PUMP_7");
        assert_eq!(json["value"], 105.4);
        assert_eq!(json["severity"], "WARNING");
        assert_eq!(json["timestamp"], "2023-11-14T22:13:20Z");
        assert_eq!(json.as_object().unwrap().len(), 5);
    }

    #[test]
    fn payload_uses_queried_device() {
        let anomaly = Anomaly::from_reading(&Reading::new(at(0), 1.0), 9.0);
        let a = AlertPayload::for_anomaly("SENSOR_001", &anomaly);
        let b = AlertPayload::for_anomaly("SENSOR_042", &anomaly);
        assert_eq!(a.device_id, "SENSOR_001");
        assert_eq!(b.device_id, "SENSOR_042");
    }
}
