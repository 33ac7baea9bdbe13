//! SQLite storage backend implementation
//!
//! This module provides a SQLite-based implementation of the `StorageBackend` trait.
//!
//! ## Features
//!
//! - **Embedded**: No separate database server required
//! - **WAL mode**: Better concurrency for reads during writes
//! - **Connection pooling**: Concurrent ingestion calls share a small pool
//! - **Migrations**: Automatic schema versioning with sqlx
//!
//! Timestamps are stored as Unix milliseconds and UUIDs as text.

use std::collections::HashMap;
use std::path::Path;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow, SqliteSynchronous,
};
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::backend::{HealthStatus, StorageBackend};
use super::error::{StorageError, StorageResult};
use crate::{AlertCategory, AlertEvent, ResourceSample};

/// SQLite storage backend
pub struct SqliteBackend {
    pool: Pool<Sqlite>,
    db_path: String,
}

impl SqliteBackend {
    /// Create a new SQLite backend
    ///
    /// This will:
    /// 1. Create the database file if it doesn't exist
    /// 2. Run migrations to create tables
    /// 3. Configure SQLite for WAL mode
    ///
    /// ```no_run
    /// # use labwatch::storage::sqlite::SqliteBackend;
    /// # async fn example() -> anyhow::Result<()> {
    /// let backend = SqliteBackend::new("./labwatch.db").await?;
    /// # Ok(())
    /// # }
    /// ```
    #[instrument(skip_all)]
    pub async fn new(db_path: impl AsRef<Path>) -> StorageResult<Self> {
        let db_path_str = db_path.as_ref().to_string_lossy().to_string();

        info!("initializing SQLite backend at: {}", db_path_str);

        let options = SqliteConnectOptions::new()
            .filename(&db_path_str)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(std::time::Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| StorageError::ConnectionFailed(e.to_string()))?;

        debug!("running database migrations");
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::MigrationFailed(e.to_string()))?;

        info!("database migrations complete");

        Ok(Self {
            pool,
            db_path: db_path_str,
        })
    }

    fn timestamp_to_millis(dt: &DateTime<Utc>) -> i64 {
        dt.timestamp_millis()
    }

    fn millis_to_timestamp(millis: i64) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(millis).unwrap_or_else(Utc::now)
    }

    fn parse_uuid(raw: &str) -> StorageResult<Uuid> {
        Uuid::parse_str(raw)
            .map_err(|e| StorageError::SerializationError(format!("invalid uuid {raw}: {e}")))
    }

    fn sample_from_row(row: &SqliteRow) -> StorageResult<ResourceSample> {
        let computer_id: String = row.get("computer_id");
        Ok(ResourceSample {
            computer_id: Self::parse_uuid(&computer_id)?,
            cpu: row.get("cpu"),
            memory: row.get("memory"),
            network_in: row.get("network_in"),
            network_out: row.get("network_out"),
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
        })
    }

    fn alert_from_row(row: &SqliteRow) -> StorageResult<AlertEvent> {
        let id: String = row.get("id");
        let computer_id: String = row.get("computer_id");
        let category: String = row.get("category");

        Ok(AlertEvent {
            id: Self::parse_uuid(&id)?,
            computer_id: Self::parse_uuid(&computer_id)?,
            category: category
                .parse::<AlertCategory>()
                .map_err(StorageError::SerializationError)?,
            message: row.get("message"),
            timestamp: Self::millis_to_timestamp(row.get("timestamp")),
            resolved: row.get("resolved"),
        })
    }
}

#[async_trait]
impl StorageBackend for SqliteBackend {
    #[instrument(skip_all, fields(computer_id = %sample.computer_id))]
    async fn insert_sample(&self, sample: &ResourceSample) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO resource_logs (
                computer_id, timestamp, cpu, memory, network_in, network_out
            )
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(sample.computer_id.to_string())
        .bind(Self::timestamp_to_millis(&sample.timestamp))
        .bind(sample.cpu)
        .bind(sample.memory)
        .bind(sample.network_in)
        .bind(sample.network_out)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip_all, fields(alert_id = %alert.id, category = %alert.category))]
    async fn insert_alert(&self, alert: &AlertEvent) -> StorageResult<()> {
        sqlx::query(
            r#"
            INSERT INTO alerts (id, computer_id, category, message, timestamp, resolved)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(alert.id.to_string())
        .bind(alert.computer_id.to_string())
        .bind(alert.category.as_str())
        .bind(&alert.message)
        .bind(Self::timestamp_to_millis(&alert.timestamp))
        .bind(alert.resolved)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn query_latest(
        &self,
        computer_id: Uuid,
        limit: usize,
    ) -> StorageResult<Vec<ResourceSample>> {
        debug!("querying latest {} samples for {}", limit, computer_id);

        let rows = sqlx::query(
            r#"
            SELECT computer_id, timestamp, cpu, memory, network_in, network_out
            FROM resource_logs
            WHERE computer_id = ?
            ORDER BY timestamp DESC
            LIMIT ?
            "#,
        )
        .bind(computer_id.to_string())
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::sample_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn query_alerts(
        &self,
        resolved: Option<bool>,
        limit: usize,
    ) -> StorageResult<Vec<AlertEvent>> {
        let rows = sqlx::query(
            r#"
            SELECT id, computer_id, category, message, timestamp, resolved
            FROM alerts
            WHERE (?1 IS NULL OR resolved = ?1)
            ORDER BY timestamp DESC
            LIMIT ?2
            "#,
        )
        .bind(resolved)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::alert_from_row).collect()
    }

    #[instrument(skip(self))]
    async fn resolve_alert(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("UPDATE alerts SET resolved = 1 WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self))]
    async fn health_check(&self) -> StorageResult<HealthStatus> {
        match sqlx::query("SELECT 1").fetch_one(&self.pool).await {
            Ok(_) => {
                let mut metadata = HashMap::new();
                metadata.insert("backend".to_string(), "sqlite".to_string());
                metadata.insert("db_path".to_string(), self.db_path.clone());

                Ok(HealthStatus {
                    healthy: true,
                    message: "SQLite backend operational".to_string(),
                    metadata,
                })
            }
            Err(e) => {
                warn!("health check failed: {}", e);
                Ok(HealthStatus {
                    healthy: false,
                    message: format!("health check failed: {}", e),
                    metadata: HashMap::new(),
                })
            }
        }
    }

    #[instrument(skip(self))]
    async fn get_stats(&self) -> StorageResult<String> {
        let samples: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM resource_logs")
            .fetch_one(&self.pool)
            .await?;

        let alerts: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM alerts")
            .fetch_one(&self.pool)
            .await?;

        let file_size = std::fs::metadata(&self.db_path)
            .map(|m| m.len())
            .unwrap_or(0);

        Ok(format!(
            "SQLite: {} samples, {} alerts, {:.2} MB on disk",
            samples.0,
            alerts.0,
            file_size as f64 / 1_000_000.0
        ))
    }

    async fn close(&self) -> StorageResult<()> {
        info!("closing SQLite backend");
        self.pool.close().await;
        Ok(())
    }
}
