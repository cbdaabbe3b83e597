//! TelemetrySource trait definition and shared error types.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use vigil_core::Reading;

/// Errors that can occur while fetching telemetry.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Database query failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Telemetry query timed out after {0:?}")]
    Timeout(Duration),

    #[error("Invalid table name: {0}")]
    InvalidTable(String),

    #[error("Failed to read readings file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse readings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A time-series store queried by device id and trailing window.
#[async_trait]
pub trait TelemetrySource: Send + Sync {
    /// Readings for `device_id` over the last `window_minutes`, oldest first.
    ///
    /// An unknown device or a quiet window yields an empty vector, not an error.
    async fn fetch(
        &self,
        device_id: &str,
        window_minutes: u32,
    ) -> Result<Vec<Reading>, IngestError>;

    /// Human-readable name for this backend (e.g., "postgres", "static").
    fn source_name(&self) -> &str;
}

/// Blanket implementation so `Arc<dyn TelemetrySource>` can be used directly.
#[async_trait]
impl<T: TelemetrySource + ?Sized> TelemetrySource for Arc<T> {
    async fn fetch(
        &self,
        device_id: &str,
        window_minutes: u32,
    ) -> Result<Vec<Reading>, IngestError> {
        (**self).fetch(device_id, window_minutes).await
    }

    fn source_name(&self) -> &str {
        (**self).source_name()
    }
}
