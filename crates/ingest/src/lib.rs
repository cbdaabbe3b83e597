//! Telemetry sources for the detection cycle.
//!
//! This crate provides:
//! - `TelemetrySource` trait for pluggable time-series backends
//! - `PgTelemetrySource` reading a Postgres historian table
//! - `StaticSource` serving in-memory or file-backed readings

pub mod fixture;
pub mod postgres;
pub mod traits;

pub use fixture::{historian_demo_readings, read_readings_file, StaticSource, WindowAnchor};
pub use postgres::PgTelemetrySource;
pub use traits::{IngestError, TelemetrySource};
