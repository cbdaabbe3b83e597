//! Turns detected anomalies into published alerts.
//!
//! One payload per anomaly, published in input order to a single topic.
//! Publishing is sequential and unbatched; the first sink failure ends the
//! dispatch and is handed back to the caller as-is.

use std::time::Instant;

use tracing::{debug, info, warn, Instrument, Span};
use vigil_core::{AlertPayload, Anomaly};

use crate::traits::{AlertSink, NotifyError};

/// Topic SCADA consumers subscribe to for process-control alarms.
pub const DEFAULT_ALERT_TOPIC: &str = "alarms/process_control";

pub struct AlertDispatcher {
    sink: Box<dyn AlertSink>,
    topic: String,
    /// Span all dispatch events are recorded under.
    span: Span,
}

impl AlertDispatcher {
    /// Dispatcher publishing to [`DEFAULT_ALERT_TOPIC`].
    pub fn new(sink: Box<dyn AlertSink>) -> Self {
        Self {
            sink,
            topic: DEFAULT_ALERT_TOPIC.to_string(),
            span: Span::none(),
        }
    }

    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Record dispatch events under `span` instead of the caller's context.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn sink_name(&self) -> &str {
        self.sink.sink_name()
    }

    /// Publish one alert per anomaly for `device_id`.
    ///
    /// Returns how many alerts were published. On a sink error the
    /// remaining anomalies are not published and the error is returned.
    pub async fn dispatch(
        &self,
        anomalies: &[Anomaly],
        device_id: &str,
    ) -> Result<usize, NotifyError> {
        let span = if self.span.is_none() {
            Span::current()
        } else {
            self.span.clone()
        };

        async move {
            for (index, anomaly) in anomalies.iter().enumerate() {
                let payload = AlertPayload::for_anomaly(device_id, anomaly).to_json()?;
                let start = Instant::now();

                self.sink.publish(&self.topic, &payload).await.map_err(|e| {
                    warn!(
                        device_id,
                        topic = %self.topic,
                        sink = self.sink.sink_name(),
                        index,
                        error = %e,
                        "alert publish failed"
                    );
                    e
                })?;

                debug!(
                    device_id,
                    topic = %self.topic,
                    severity = %anomaly.severity,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "alert published"
                );
            }

            if !anomalies.is_empty() {
                info!(
                    device_id,
                    topic = %self.topic,
                    sink = self.sink.sink_name(),
                    alert_count = anomalies.len(),
                    "alerts dispatched"
                );
            }
            Ok::<usize, NotifyError>(anomalies.len())
        }
        .instrument(span)
        .await
    }
}
