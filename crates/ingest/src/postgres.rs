//! Postgres historian source.
//!
//! Expects a table with at least `device_id text`, `"timestamp" timestamptz`
//! and `value double precision` columns.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{debug, info, instrument};
use vigil_core::config::PostgresConfig;
use vigil_core::Reading;

use crate::traits::{IngestError, TelemetrySource};

#[derive(Debug, sqlx::FromRow)]
struct TelemetryRow {
    timestamp: DateTime<Utc>,
    value: f64,
}

impl From<TelemetryRow> for Reading {
    fn from(row: TelemetryRow) -> Self {
        Reading::new(row.timestamp, row.value)
    }
}

/// Reads trailing windows of telemetry from a Postgres table.
///
/// Every query is bounded by `query_timeout`; pool acquisition uses the
/// same bound so an unreachable database cannot stall a cycle.
pub struct PgTelemetrySource {
    pool: PgPool,
    table: String,
    query_timeout: Duration,
}

impl PgTelemetrySource {
    /// Connect a pool from config and target `table`.
    pub async fn connect(config: &PostgresConfig, table: &str) -> Result<Self, IngestError> {
        validate_table_name(table)?;
        let query_timeout = Duration::from_secs(config.query_timeout_secs.max(1));
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .acquire_timeout(query_timeout)
            .connect(&config.connection_string())
            .await?;
        info!(host = %config.host, table, "PostgreSQL telemetry source connected");
        Self::from_pool(pool, table, query_timeout)
    }

    /// Wrap an existing pool.
    pub fn from_pool(
        pool: PgPool,
        table: &str,
        query_timeout: Duration,
    ) -> Result<Self, IngestError> {
        validate_table_name(table)?;
        Ok(Self {
            pool,
            table: table.to_string(),
            query_timeout,
        })
    }

    fn window_query(&self) -> String {
        format!(
            "SELECT \"timestamp\", value FROM {} \
             WHERE device_id = $1 AND \"timestamp\" > NOW() - make_interval(mins => $2) \
             ORDER BY \"timestamp\" ASC",
            self.table
        )
    }
}

#[async_trait]
impl TelemetrySource for PgTelemetrySource {
    #[instrument(skip(self), fields(table = %self.table))]
    async fn fetch(
        &self,
        device_id: &str,
        window_minutes: u32,
    ) -> Result<Vec<Reading>, IngestError> {
        let sql = self.window_query();
        let minutes = i32::try_from(window_minutes).unwrap_or(i32::MAX);
        let query = sqlx::query_as::<_, TelemetryRow>(&sql)
            .bind(device_id)
            .bind(minutes)
            .fetch_all(&self.pool);

        let rows = tokio::time::timeout(self.query_timeout, query)
            .await
            .map_err(|_| IngestError::Timeout(self.query_timeout))??;

        debug!(device_id, rows = rows.len(), "fetched telemetry window");
        Ok(rows.into_iter().map(Reading::from).collect())
    }

    fn source_name(&self) -> &str {
        "postgres"
    }
}

/// Table names are interpolated into SQL, so only plain (optionally
/// schema-qualified) identifiers are accepted.
fn validate_table_name(table: &str) -> Result<(), IngestError> {
    let valid_part = |part: &str| {
        let mut chars = part.chars();
        matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
    };

    let parts: Vec<&str> = table.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        return Err(IngestError::InvalidTable(table.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lazy_pool(timeout: Duration) -> PgPool {
        PgPoolOptions::new()
            .acquire_timeout(timeout)
            .connect_lazy("postgres://reader:pw@127.0.0.1:1/historian")
            .unwrap()
    }

    #[test]
    fn accepts_plain_and_qualified_names() {
        assert!(validate_table_name("telemetry").is_ok());
        assert!(validate_table_name("plant_a.telemetry_2024").is_ok());
        assert!(validate_table_name("_raw").is_ok());
    }

    #[test]
    fn rejects_injection_attempts() {
        for bad in ["", "1telemetry", "telemetry; DROP TABLE x", "a.b.c", "tele metry", "t\"x"] {
            assert!(
                matches!(validate_table_name(bad), Err(IngestError::InvalidTable(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[tokio::test]
    async fn query_targets_configured_table() {
        let source = PgTelemetrySource::from_pool(
            lazy_pool(Duration::from_millis(200)),
            "plant.readings",
            Duration::from_secs(1),
        )
        .unwrap();
        let sql = source.window_query();
        assert!(sql.contains("FROM plant.readings"));
        assert!(sql.contains("device_id = $1"));
        assert!(sql.contains("make_interval(mins => $2)"));
        assert!(sql.ends_with("ORDER BY \"timestamp\" ASC"));
        assert_eq!(source.source_name(), "postgres");
    }

    #[tokio::test]
    async fn unreachable_database_fails_within_timeout() {
        let timeout = Duration::from_millis(300);
        let source =
            PgTelemetrySource::from_pool(lazy_pool(timeout), "telemetry", timeout).unwrap();

        let started = std::time::Instant::now();
        let result = source.fetch("SENSOR_001", 60).await;
        assert!(result.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
