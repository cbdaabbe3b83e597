use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Telemetry anomaly detector.
///
/// Fetches a trailing window of sensor readings, flags z-score outliers
/// and publishes one alert per outlier.
#[derive(Parser, Debug)]
#[command(name = "vigil", version, about = "Telemetry anomaly detector")]
pub struct CliArgs {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run one fetch, detect, alert cycle for a device
    Run(RunArgs),
    /// Run independent cycles for one or more devices on an interval
    Watch(WatchArgs),
    /// Score a readings file offline and print anomalies as JSON
    Score(ScoreArgs),
}

/// Settings shared by every command that runs detection cycles.
#[derive(Args, Debug, Clone)]
pub struct CycleArgs {
    /// Z-score threshold (overrides DETECT_THRESHOLD)
    #[arg(long)]
    pub threshold: Option<f64>,

    /// Trailing window in minutes (overrides TELEMETRY_WINDOW_MINUTES)
    #[arg(long)]
    pub window: Option<u32>,

    /// Telemetry source: postgres or fixture (overrides TELEMETRY_SOURCE)
    #[arg(long)]
    pub source: Option<String>,

    /// Alert sink: log, zmq or webhook (overrides ALERT_SINK)
    #[arg(long)]
    pub sink: Option<String>,

    /// Alert topic (overrides ALERT_TOPIC)
    #[arg(long)]
    pub topic: Option<String>,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Device to query
    #[arg(long, env = "VIGIL_DEVICE", default_value = "SENSOR_001")]
    pub device: String,

    /// Serve readings from a JSON file instead of the configured source
    #[arg(long)]
    pub readings: Option<PathBuf>,

    #[command(flatten)]
    pub cycle: CycleArgs,
}

#[derive(Args, Debug)]
pub struct WatchArgs {
    /// Device to monitor (repeat for several devices)
    #[arg(long = "device", required = true)]
    pub devices: Vec<String>,

    /// Seconds between cycles
    #[arg(long, env = "VIGIL_INTERVAL", default_value_t = 60)]
    pub interval: u64,

    #[command(flatten)]
    pub cycle: CycleArgs,
}

#[derive(Args, Debug)]
pub struct ScoreArgs {
    /// JSON array of {"timestamp", "value"} readings
    #[arg(long)]
    pub readings: PathBuf,

    /// Z-score threshold (overrides DETECT_THRESHOLD)
    #[arg(long)]
    pub threshold: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_defaults() {
        let args = CliArgs::try_parse_from(["vigil", "run"]).unwrap();
        match args.command {
            Command::Run(run) => {
                assert_eq!(run.device, "SENSOR_001");
                assert!(run.readings.is_none());
                assert!(run.cycle.threshold.is_none());
            }
            other => panic!("expected run, got {other:?}"),
        }
    }

    #[test]
    fn watch_takes_repeated_devices() {
        let args = CliArgs::try_parse_from([
            "vigil",
            "watch",
            "--device",
            "A",
            "--device",
            "B",
            "--interval",
            "5",
            "--threshold",
            "2.5",
        ])
        .unwrap();
        match args.command {
            Command::Watch(watch) => {
                assert_eq!(watch.devices, vec!["A", "B"]);
                assert_eq!(watch.interval, 5);
                assert_eq!(watch.cycle.threshold, Some(2.5));
            }
            other => panic!("expected watch, got {other:?}"),
        }
    }

    #[test]
    fn watch_requires_a_device() {
        assert!(CliArgs::try_parse_from(["vigil", "watch"]).is_err());
    }

    #[test]
    fn score_requires_readings() {
        assert!(CliArgs::try_parse_from(["vigil", "score"]).is_err());
        let args = CliArgs::try_parse_from(["vigil", "score", "--readings", "r.json"]).unwrap();
        assert!(matches!(args.command, Command::Score(_)));
    }
}
