mod cli;
mod monitor;
mod wiring;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use serde_json::json;
use tracing::{info, info_span};

use vigil_compute::AnomalyDetector;
use vigil_core::config::load_dotenv;
use vigil_core::Config;
use vigil_ingest::read_readings_file;
use vigil_notify::AlertDispatcher;

use crate::cli::{CliArgs, Command, CycleArgs, RunArgs, ScoreArgs, WatchArgs};
use crate::monitor::Monitor;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();
    load_dotenv();

    match args.command {
        Command::Run(run) => run_once(run).await,
        Command::Watch(watch) => run_watch(watch).await,
        Command::Score(score) => run_score(score),
    }
}

fn load_config(overrides: &CycleArgs) -> Result<Config> {
    let mut config = Config::from_env();
    wiring::apply_overrides(&mut config, overrides);
    config.validate().context("invalid configuration")?;
    config.log_summary();
    Ok(config)
}

async fn build_monitor(
    config: &Config,
    readings: Option<&std::path::Path>,
    devices: &[String],
) -> Result<Monitor> {
    let source = wiring::build_source(config, readings, devices).await?;
    let sink = wiring::build_sink(config).await?;
    let detector = AnomalyDetector::with_threshold(config.detector.threshold)?;
    let dispatcher = AlertDispatcher::new(sink).with_topic(config.alert.topic.clone());

    info!(
        source = source.source_name(),
        sink = dispatcher.sink_name(),
        topic = dispatcher.topic(),
        "monitor ready"
    );

    Ok(Monitor::new(source, detector, dispatcher, config.telemetry.window_minutes)
        .with_span(info_span!("vigil", profile = config.profile_label())))
}

async fn run_once(args: RunArgs) -> Result<()> {
    let config = load_config(&args.cycle)?;
    let devices = vec![args.device.clone()];
    let monitor = build_monitor(&config, args.readings.as_deref(), &devices).await?;

    let report = monitor
        .run_cycle(&args.device)
        .await
        .with_context(|| format!("detection cycle failed for {}", args.device))?;

    info!(
        cycle_id = %report.cycle_id,
        nominal = report.is_nominal(),
        readings = report.readings,
        anomalies = report.anomalies.len(),
        alerts_published = report.alerts_published,
        duration_ms = report.duration_ms,
        "cycle complete"
    );
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn run_watch(args: WatchArgs) -> Result<()> {
    if args.interval == 0 {
        anyhow::bail!("--interval must be at least one second");
    }

    let config = load_config(&args.cycle)?;
    let monitor = Arc::new(build_monitor(&config, None, &args.devices).await?);

    info!(
        devices = ?args.devices,
        interval_secs = args.interval,
        "watching devices (Ctrl-C to stop)"
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for shutdown signal");
        }
        info!("shutdown signal received");
    };

    let completed = monitor
        .watch(args.devices, Duration::from_secs(args.interval), shutdown)
        .await;
    info!(completed, "watch finished");
    Ok(())
}

fn run_score(args: ScoreArgs) -> Result<()> {
    let mut config = Config::from_env();
    if let Some(threshold) = args.threshold {
        config.detector.threshold = threshold;
    }
    let detector = AnomalyDetector::with_threshold(config.detector.threshold)?;

    let readings = read_readings_file(&args.readings)
        .with_context(|| format!("failed to load readings from {}", args.readings.display()))?;

    let stats = detector.stats(&readings)?;
    let anomalies = detector.detect(&readings)?;

    let output = json!({
        "readings": readings.len(),
        "threshold": detector.threshold(),
        "stats": stats,
        "anomalies": anomalies,
    });
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
