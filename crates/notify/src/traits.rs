//! AlertSink trait definition and shared error types.

use std::sync::Arc;

/// Errors that can occur while publishing an alert.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Webhook rejected alert with status {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("ZeroMQ publish failed: {0}")]
    Zmq(#[from] zeromq::ZmqError),

    #[error("Payload serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// A publish/subscribe destination for serialized alerts.
///
/// Implementations own delivery semantics (timeouts, connection state).
/// Callers get the error back unchanged; nothing here retries.
#[async_trait::async_trait]
pub trait AlertSink: Send + Sync {
    /// Publish one serialized payload to `topic`.
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), NotifyError>;

    /// Human-readable name for this sink (e.g., "log", "zmq", "webhook").
    fn sink_name(&self) -> &str;
}

/// Blanket implementation so `Arc<dyn AlertSink>` can be used directly.
#[async_trait::async_trait]
impl<T: AlertSink + ?Sized> AlertSink for Arc<T> {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        (**self).publish(topic, payload).await
    }

    fn sink_name(&self) -> &str {
        (**self).sink_name()
    }
}
