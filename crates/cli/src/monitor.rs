//! One fetch → detect → dispatch cycle, and a timer loop over many.
//!
//! A cycle owns no state beyond its own locals, so cycles for different
//! devices run side by side without coordination.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{error, info, info_span, Instrument, Span};
use uuid::Uuid;

use vigil_compute::{AnomalyDetector, PopulationStats};
use vigil_core::{Anomaly, DetectError};
use vigil_ingest::{IngestError, TelemetrySource};
use vigil_notify::{AlertDispatcher, NotifyError};

/// Everything that can end a cycle early. Each variant is the
/// collaborator's error, unchanged.
#[derive(Debug, thiserror::Error)]
pub enum CycleError {
    #[error(transparent)]
    Fetch(#[from] IngestError),

    #[error(transparent)]
    Detect(#[from] DetectError),

    #[error(transparent)]
    Publish(#[from] NotifyError),
}

/// Outcome of a completed cycle.
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    pub cycle_id: Uuid,
    pub device_id: String,
    pub window_minutes: u32,
    pub readings: usize,
    pub stats: Option<PopulationStats>,
    pub anomalies: Vec<Anomaly>,
    pub alerts_published: usize,
    pub duration_ms: u64,
}

impl CycleReport {
    pub fn is_nominal(&self) -> bool {
        self.anomalies.is_empty()
    }
}

pub struct Monitor {
    source: Box<dyn TelemetrySource>,
    detector: AnomalyDetector,
    dispatcher: AlertDispatcher,
    window_minutes: u32,
    /// Parent of every cycle span.
    span: Span,
}

impl Monitor {
    pub fn new(
        source: Box<dyn TelemetrySource>,
        detector: AnomalyDetector,
        dispatcher: AlertDispatcher,
        window_minutes: u32,
    ) -> Self {
        Self {
            source,
            detector,
            dispatcher,
            window_minutes,
            span: Span::none(),
        }
    }

    /// Nest cycle events under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Fetch the trailing window for `device_id`, flag outliers and
    /// publish one alert per outlier.
    pub async fn run_cycle(&self, device_id: &str) -> Result<CycleReport, CycleError> {
        let cycle_id = Uuid::new_v4();
        let span = info_span!(parent: &self.span, "cycle", %cycle_id, device_id);

        async move {
            let start = Instant::now();

            let readings = self.source.fetch(device_id, self.window_minutes).await?;
            info!(
                source = self.source.source_name(),
                readings = readings.len(),
                window_minutes = self.window_minutes,
                "fetched telemetry"
            );

            let stats = self.detector.stats(&readings)?;
            let anomalies = self.detector.detect(&readings)?;

            let alerts_published = if anomalies.is_empty() {
                info!("system nominal");
                0
            } else {
                info!(
                    anomaly_count = anomalies.len(),
                    threshold = self.detector.threshold(),
                    "detected anomalies"
                );
                self.dispatcher.dispatch(&anomalies, device_id).await?
            };

            Ok::<CycleReport, CycleError>(CycleReport {
                cycle_id,
                device_id: device_id.to_string(),
                window_minutes: self.window_minutes,
                readings: readings.len(),
                stats,
                anomalies,
                alerts_published,
                duration_ms: start.elapsed().as_millis() as u64,
            })
        }
        .instrument(span)
        .await
    }

    /// Run a cycle for every device each `every`, until `shutdown` resolves.
    ///
    /// Devices run concurrently within a tick; a failed cycle is logged
    /// and does not affect the other devices or later ticks. Returns the
    /// number of cycles that completed successfully.
    pub async fn watch<F>(
        self: Arc<Self>,
        devices: Vec<String>,
        every: Duration,
        shutdown: F,
    ) -> usize
    where
        F: Future<Output = ()>,
    {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        tokio::pin!(shutdown);

        let mut completed = 0usize;
        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!(completed, "watch stopped");
                    return completed;
                }
                _ = ticker.tick() => {}
            }

            let handles: Vec<_> = devices
                .iter()
                .map(|device_id| {
                    let monitor = Arc::clone(&self);
                    let device_id = device_id.clone();
                    tokio::spawn(async move {
                        let result = monitor.run_cycle(&device_id).await;
                        (device_id, result)
                    })
                })
                .collect();

            for handle in handles {
                match handle.await {
                    Ok((_, Ok(_))) => completed += 1,
                    Ok((device_id, Err(e))) => {
                        error!(device_id = %device_id, error = %e, "cycle failed");
                    }
                    Err(e) => error!(error = %e, "cycle task panicked"),
                }
            }
        }
    }
}
