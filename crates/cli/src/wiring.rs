//! Builds the configured collaborators for a monitor.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{info, warn};

use vigil_core::config::{SinkKind, SourceKind};
use vigil_core::Config;
use vigil_ingest::{PgTelemetrySource, StaticSource, TelemetrySource};
use vigil_notify::{AlertSink, LogSink, Transport, WebhookSink, ZmqSink};

use crate::cli::CycleArgs;

/// Apply command-line overrides on top of the environment config.
pub fn apply_overrides(config: &mut Config, args: &CycleArgs) {
    if let Some(threshold) = args.threshold {
        config.detector.threshold = threshold;
    }
    if let Some(window) = args.window {
        config.telemetry.window_minutes = window;
    }
    if let Some(source) = &args.source {
        config.telemetry.source = source.clone();
    }
    if let Some(sink) = &args.sink {
        config.alert.sink = sink.clone();
    }
    if let Some(topic) = &args.topic {
        config.alert.topic = topic.clone();
    }
}

/// A readings file takes precedence over the configured source.
pub async fn build_source(
    config: &Config,
    readings: Option<&Path>,
    devices: &[String],
) -> Result<Box<dyn TelemetrySource>> {
    if let Some(path) = readings {
        let device_id = devices.first().map(String::as_str).unwrap_or_default();
        let source = StaticSource::from_json_file(path, device_id)
            .with_context(|| format!("failed to load readings from {}", path.display()))?;
        return Ok(Box::new(source));
    }

    match config.telemetry.source_kind()? {
        SourceKind::Fixture => {
            info!(devices = devices.len(), "serving historian demo fixture");
            Ok(Box::new(StaticSource::historian_demo(devices)))
        }
        SourceKind::Postgres => {
            if !config.postgres.is_configured() {
                warn!(
                    host = %config.postgres.host,
                    "neither DATABASE_URL nor PG_USERNAME set, connecting as postgres"
                );
            }
            let source = PgTelemetrySource::connect(&config.postgres, &config.telemetry.table)
                .await
                .context("failed to connect to telemetry database")?;
            Ok(Box::new(source))
        }
    }
}

pub async fn build_sink(config: &Config) -> Result<Box<dyn AlertSink>> {
    let alert = &config.alert;
    match alert.sink_kind()? {
        SinkKind::Log => Ok(Box::new(LogSink::new())),
        SinkKind::Zmq => {
            let transport = Transport::for_alerts(alert);
            let sink = if alert.zmq_bind {
                ZmqSink::bind(&transport).await
            } else {
                ZmqSink::connect(&transport).await
            }
            .with_context(|| format!("failed to open alert socket at {transport}"))?;
            Ok(Box::new(sink))
        }
        SinkKind::Webhook => {
            let url = alert
                .webhook_url
                .as_deref()
                .context("ALERT_WEBHOOK_URL is required for the webhook sink")?;
            let sink = WebhookSink::new(url, Duration::from_secs(alert.webhook_timeout_secs))?;
            Ok(Box::new(sink))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cycle_args() -> CycleArgs {
        CycleArgs {
            threshold: None,
            window: None,
            source: None,
            sink: None,
            topic: None,
        }
    }

    #[test]
    fn overrides_replace_only_given_fields() {
        let mut config = Config::for_profile("WIRING_TEST_OVERRIDES");
        let original_window = config.telemetry.window_minutes;

        apply_overrides(
            &mut config,
            &CycleArgs {
                threshold: Some(2.5),
                sink: Some("webhook".to_string()),
                ..cycle_args()
            },
        );

        assert_eq!(config.detector.threshold, 2.5);
        assert_eq!(config.alert.sink, "webhook");
        assert_eq!(config.telemetry.window_minutes, original_window);
    }

    #[tokio::test]
    async fn fixture_source_serves_each_device() {
        let mut config = Config::for_profile("WIRING_TEST_FIXTURE");
        config.telemetry.source = "fixture".to_string();

        let devices = vec!["PUMP_1".to_string(), "PUMP_2".to_string()];
        let source = build_source(&config, None, &devices).await.unwrap();
        assert_eq!(source.source_name(), "static");
        assert_eq!(source.fetch("PUMP_2", 60).await.unwrap().len(), 4);
    }

    #[tokio::test]
    async fn missing_readings_file_is_an_error() {
        let config = Config::for_profile("WIRING_TEST_MISSING");
        let devices = vec!["PUMP_1".to_string()];
        let err = build_source(&config, Some(Path::new("/nonexistent/readings.json")), &devices)
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("/nonexistent/readings.json"));
    }

    #[tokio::test]
    async fn sink_follows_config() {
        let mut config = Config::for_profile("WIRING_TEST_SINK");
        config.alert.sink = "log".to_string();
        assert_eq!(build_sink(&config).await.unwrap().sink_name(), "log");

        config.alert.sink = "webhook".to_string();
        config.alert.webhook_url = Some("http://127.0.0.1:9/alerts".to_string());
        assert_eq!(build_sink(&config).await.unwrap().sink_name(), "webhook");

        config.alert.webhook_url = None;
        assert!(build_sink(&config).await.is_err());

        config.alert.sink = "pager".to_string();
        assert!(build_sink(&config).await.is_err());
    }
}
