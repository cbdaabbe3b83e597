//! Alert publishing for detected anomalies.
//!
//! This crate provides:
//! - `AlertSink` trait for pluggable publish/subscribe backends
//! - Log, ZeroMQ and webhook sink implementations
//! - `AlertDispatcher`, which shapes one payload per anomaly and publishes it

pub mod dispatcher;
pub mod log_sink;
pub mod traits;
pub mod transport;
pub mod webhook;
pub mod zmq;

pub use dispatcher::{AlertDispatcher, DEFAULT_ALERT_TOPIC};
pub use log_sink::LogSink;
pub use traits::{AlertSink, NotifyError};
pub use transport::Transport;
pub use webhook::WebhookSink;
pub use zmq::ZmqSink;
