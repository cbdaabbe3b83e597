//! Sink that writes alerts to the structured log.
//!
//! Used when no broker is configured; every alert shows up as a `warn`
//! "alarm published" event carrying the topic and the JSON payload.

use crate::traits::{AlertSink, NotifyError};

#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl LogSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait::async_trait]
impl AlertSink for LogSink {
    async fn publish(&self, topic: &str, payload: &str) -> Result<(), NotifyError> {
        tracing::warn!(topic, payload, "alarm published");
        Ok(())
    }

    fn sink_name(&self) -> &str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[tokio::test]
    async fn log_sink_always_accepts() {
        let sink = LogSink::new();
        assert!(sink.publish("alarms/process_control", "{}").await.is_ok());
        assert_eq!(sink.sink_name(), "log");
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn publish_logs_warn_event() {
        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        LogSink::new()
            .publish("alarms/process_control", r#"{"device_id":"PUMP_7"}"#)
            .await
            .unwrap();

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("alarm published"));
        assert!(output.contains("alarms/process_control"));
        assert!(output.contains("PUMP_7"));
    }
}
