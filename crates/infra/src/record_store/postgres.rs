//! Postgres-backed record store.
//!
//! Record ids come from a `BIGSERIAL`, so they are strictly increasing and
//! never reused even after deletes. Every query is scoped by `container_id`.
//!
//! ## Error Mapping
//!
//! | SQLx Error | SourceError |
//! |------------|-------------|
//! | Database (check violation `23514`) | `InvalidAppend` |
//! | Database (other) | `Unavailable` |
//! | PoolClosed / Io / Tls / PoolTimedOut | `Unavailable` |
//! | Other | `Unavailable` |

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{FromRow, Row};
use tracing::instrument;

use feedline_core::{ContainerId, IdentityId, NewRecord, Record, RecordId};

use super::r#trait::{RecordSource, RecordStore, ScanOrder, ScanRange, SourceError};

/// Idempotent schema for the `records` table.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS records (
    id           BIGSERIAL PRIMARY KEY,
    container_id UUID        NOT NULL,
    author_id    UUID        NOT NULL,
    payload      JSONB       NOT NULL,
    created_at   TIMESTAMPTZ NOT NULL DEFAULT now(),
    CHECK (id > 0)
);
CREATE INDEX IF NOT EXISTS records_container_id_id_idx ON records (container_id, id);
"#;

const MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Clone)]
pub struct PostgresRecordStore {
    pool: Arc<PgPool>,
}

impl PostgresRecordStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Connect to `database_url` and ensure the schema exists.
    #[instrument(skip(database_url), err)]
    pub async fn connect(database_url: &str) -> Result<Self, SourceError> {
        let pool = PgPoolOptions::new()
            .max_connections(MAX_CONNECTIONS)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;

        let store = Self::new(pool);
        store.migrate().await?;
        Ok(store)
    }

    pub async fn migrate(&self) -> Result<(), SourceError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

#[async_trait]
impl RecordSource for PostgresRecordStore {
    #[instrument(
        skip(self),
        fields(container_id = %container_id),
        err
    )]
    async fn scan(
        &self,
        container_id: ContainerId,
        range: ScanRange,
        order: ScanOrder,
        limit: usize,
    ) -> Result<Vec<Record>, SourceError> {
        if limit == 0 || range.is_empty() {
            return Ok(vec![]);
        }

        let sql = match order {
            ScanOrder::NewestFirst => SCAN_NEWEST_FIRST,
            ScanOrder::OldestFirst => SCAN_OLDEST_FIRST,
        };

        let rows = sqlx::query(sql)
            .bind(container_id.as_uuid())
            .bind(range.older_than.map(to_db_id))
            .bind(range.newer_than.map(to_db_id))
            .bind(i64::try_from(limit).unwrap_or(i64::MAX))
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("scan", e))?;

        rows.iter()
            .map(|row| {
                RecordRow::from_row(row)
                    .map_err(|e| map_sqlx_error("scan", e))
                    .and_then(Record::try_from)
            })
            .collect()
    }
}

#[async_trait]
impl RecordStore for PostgresRecordStore {
    #[instrument(
        skip(self, record),
        fields(container_id = %record.container_id),
        err
    )]
    async fn append(&self, record: NewRecord) -> Result<Record, SourceError> {
        let row = sqlx::query(
            r#"
            INSERT INTO records (container_id, author_id, payload)
            VALUES ($1, $2, $3)
            RETURNING id, container_id, author_id, payload, created_at
            "#,
        )
        .bind(record.container_id.as_uuid())
        .bind(record.author_id.as_uuid())
        .bind(&record.payload)
        .fetch_one(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("append", e))?;

        RecordRow::from_row(&row)
            .map_err(|e| map_sqlx_error("append", e))
            .and_then(Record::try_from)
    }

    #[instrument(skip(self), fields(container_id = %container_id, record_id = %id), err)]
    async fn delete(&self, container_id: ContainerId, id: RecordId) -> Result<bool, SourceError> {
        let result = sqlx::query("DELETE FROM records WHERE container_id = $1 AND id = $2")
            .bind(container_id.as_uuid())
            .bind(to_db_id(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("delete", e))?;

        Ok(result.rows_affected() > 0)
    }
}

const SCAN_NEWEST_FIRST: &str = r#"
    SELECT id, container_id, author_id, payload, created_at
    FROM records
    WHERE container_id = $1
      AND ($2::BIGINT IS NULL OR id < $2)
      AND ($3::BIGINT IS NULL OR id > $3)
    ORDER BY id DESC
    LIMIT $4
"#;

const SCAN_OLDEST_FIRST: &str = r#"
    SELECT id, container_id, author_id, payload, created_at
    FROM records
    WHERE container_id = $1
      AND ($2::BIGINT IS NULL OR id < $2)
      AND ($3::BIGINT IS NULL OR id > $3)
    ORDER BY id ASC
    LIMIT $4
"#;

// Ids above i64::MAX cannot exist in a BIGSERIAL column; clamp so the bound
// still compares correctly.
fn to_db_id(id: RecordId) -> i64 {
    i64::try_from(id.get()).unwrap_or(i64::MAX)
}

fn map_sqlx_error(operation: &str, err: sqlx::Error) -> SourceError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {operation}: {}", db_err.message());
            match db_err.code().as_deref() {
                Some("23514") => SourceError::InvalidAppend(msg),
                _ => SourceError::Unavailable(msg),
            }
        }
        sqlx::Error::PoolClosed => {
            SourceError::Unavailable(format!("connection pool closed in {operation}"))
        }
        other => SourceError::Unavailable(format!("sqlx error in {operation}: {other}")),
    }
}

#[derive(Debug)]
struct RecordRow {
    id: i64,
    container_id: uuid::Uuid,
    author_id: uuid::Uuid,
    payload: serde_json::Value,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for RecordRow {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(RecordRow {
            id: row.try_get("id")?,
            container_id: row.try_get("container_id")?,
            author_id: row.try_get("author_id")?,
            payload: row.try_get("payload")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<RecordRow> for Record {
    type Error = SourceError;

    fn try_from(row: RecordRow) -> Result<Self, Self::Error> {
        let id = u64::try_from(row.id)
            .ok()
            .and_then(|v| RecordId::new(v).ok())
            .ok_or_else(|| SourceError::Unavailable(format!("corrupt record id {}", row.id)))?;

        Ok(Record {
            id,
            container_id: ContainerId::from_uuid(row.container_id),
            author_id: IdentityId::from_uuid(row.author_id),
            payload: row.payload,
            created_at: row.created_at,
        })
    }
}
