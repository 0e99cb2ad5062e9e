//! Operations on the `rain_history` table.
//!
//! Expected columns: `id` (integer identity), `start_time` and `end_time`
//! (text, `DD/MM/YYYY HH:mm:ss`), `duration` (integer seconds). Reads cast
//! each column so minor integer-width differences in the deployed schema
//! do not break decoding.

use rainwatch_core::{EpisodeRecord, EpisodeStore, HistoryEntry, StoreError};
use sqlx::PgPool;

use crate::error::DbError;
use crate::postgres::PostgresPool;

/// One row of `rain_history`.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct HistoryRow {
    /// Row identifier.
    pub id: i64,
    /// Formatted start time.
    pub start_time: String,
    /// Formatted end time.
    pub end_time: String,
    /// Duration in seconds.
    pub duration: i64,
}

impl From<HistoryRow> for HistoryEntry {
    fn from(row: HistoryRow) -> Self {
        Self {
            id: row.id,
            start_time: row.start_time,
            end_time: row.end_time,
            duration: row.duration,
        }
    }
}

/// Operations on the `rain_history` table.
pub struct HistoryStore<'a> {
    pool: &'a PgPool,
}

impl<'a> HistoryStore<'a> {
    /// Create a store bound to a connection pool.
    pub const fn new(pool: &'a PgPool) -> Self {
        Self { pool }
    }

    /// Append one completed episode.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::DurationOutOfRange`] if the duration does not
    /// fit a `BIGINT`, or [`DbError::Postgres`] if the insert fails.
    pub async fn insert(&self, record: &EpisodeRecord) -> Result<(), DbError> {
        let duration = i64::try_from(record.duration)
            .ok()
            .ok_or(DbError::DurationOutOfRange(record.duration))?;

        sqlx::query(
            r"INSERT INTO rain_history (start_time, end_time, duration)
              VALUES ($1, $2, $3)",
        )
        .bind(&record.start_time)
        .bind(&record.end_time)
        .bind(duration)
        .execute(self.pool)
        .await?;

        tracing::debug!(duration, "Inserted rain_history row");
        Ok(())
    }

    /// All rows, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the query fails.
    pub async fn list(&self) -> Result<Vec<HistoryRow>, DbError> {
        let rows = sqlx::query_as::<_, HistoryRow>(
            r"SELECT id::BIGINT AS id,
                     start_time::TEXT AS start_time,
                     end_time::TEXT AS end_time,
                     duration::BIGINT AS duration
              FROM rain_history
              ORDER BY id DESC",
        )
        .fetch_all(self.pool)
        .await?;

        tracing::debug!(count = rows.len(), "Fetched rain_history rows");
        Ok(rows)
    }

    /// Count rows; used at boot to confirm the table is reachable.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Postgres`] if the table is missing or the
    /// database is unreachable.
    pub async fn count(&self) -> Result<i64, DbError> {
        let count: i64 = sqlx::query_scalar(r"SELECT COUNT(*) FROM rain_history")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}

/// [`EpisodeStore`] backed by `PostgreSQL`.
#[derive(Debug, Clone)]
pub struct PgEpisodeStore {
    pool: PostgresPool,
}

impl PgEpisodeStore {
    /// Wrap a connection pool.
    pub const fn new(pool: PostgresPool) -> Self {
        Self { pool }
    }

    /// Check that `rain_history` is reachable, logging the outcome.
    ///
    /// Never fails: a broken table only degrades persisted history, so
    /// the caller keeps serving live traffic either way.
    pub async fn validate(&self) -> bool {
        tracing::info!("Validating rain_history table");
        match HistoryStore::new(self.pool.pool()).count().await {
            Ok(count) => {
                tracing::info!(rows = count, "Table rain_history is accessible");
                true
            }
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "Cannot access rain_history; check the database setup and ensure the table exists"
                );
                false
            }
        }
    }
}

#[async_trait::async_trait]
impl EpisodeStore for PgEpisodeStore {
    async fn save(&self, record: &EpisodeRecord) -> Result<(), StoreError> {
        HistoryStore::new(self.pool.pool())
            .insert(record)
            .await
            .map_err(StoreError::from)
    }

    async fn history(&self) -> Result<Vec<HistoryEntry>, StoreError> {
        let rows = HistoryStore::new(self.pool.pool()).list().await?;
        Ok(rows.into_iter().map(HistoryEntry::from).collect())
    }
}
