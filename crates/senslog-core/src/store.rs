use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use async_trait::async_trait;
use chrono::NaiveDateTime;
use senslog_parser::LongRecord;
use serde::Serialize;
use sqlx::{QueryBuilder, Sqlite};

use crate::db::{self, DbPool};
use crate::error::StoreError;
use crate::types::EventWindow;

/// Rows bound per staging INSERT; 7 columns each keeps well under SQLite's variable limit.
const INSERT_CHUNK_ROWS: usize = 500;

/// Plant/event metadata stored next to one session's rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionRecord {
    pub label: String,
    pub label_description: String,
    pub plant_name: String,
    pub machine_no: String,
    pub prefix: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub events: Vec<EventWindow>,
}

/// Time-series sink for long records.
///
/// `insert_new_rows` has set semantics: only rows not already stored (full-row equality)
/// are written, so feeding the same rows twice stores them once.
#[async_trait]
pub trait SensorStore: Send + Sync {
    async fn ensure_schema(&mut self) -> Result<(), StoreError>;

    /// Returns the number of rows actually written.
    async fn insert_new_rows(&mut self, rows: &[LongRecord]) -> Result<u64, StoreError>;

    async fn record_session(&mut self, session: &SessionRecord) -> Result<(), StoreError>;

    async fn row_count(&self) -> Result<u64, StoreError>;

    async fn close(&mut self) -> Result<(), StoreError>;
}

pub struct SqliteStore {
    pool: DbPool,
}

impl SqliteStore {
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let pool = db::connect(path).await?;
        Ok(Self { pool })
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }
}

#[async_trait]
impl SensorStore for SqliteStore {
    async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        db::ensure_schema(&self.pool).await
    }

    async fn insert_new_rows(&mut self, rows: &[LongRecord]) -> Result<u64, StoreError> {
        if rows.is_empty() {
            return Ok(0);
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"
            CREATE TEMP TABLE IF NOT EXISTS staging_sensor_data (
                timestamp TIMESTAMP,
                parameter_id TEXT,
                parameter_name TEXT,
                unit TEXT,
                value TEXT,
                source_file TEXT,
                sensor_type TEXT
            )
            "#,
        )
        .execute(&mut *tx)
        .await?;
        sqlx::query("DELETE FROM staging_sensor_data")
            .execute(&mut *tx)
            .await?;

        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
                "INSERT INTO staging_sensor_data ({}) ",
                LongRecord::COLUMNS.join(", ")
            ));
            builder.push_values(chunk, |mut row, record| {
                row.push_bind(record.timestamp)
                    .push_bind(record.parameter_id.clone())
                    .push_bind(record.parameter_name.clone())
                    .push_bind(record.unit.clone())
                    .push_bind(record.value.clone())
                    .push_bind(record.source_file.clone())
                    .push_bind(record.sensor_type.clone());
            });
            builder.build().execute(&mut *tx).await?;
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO sensor_data
                (timestamp, parameter_id, parameter_name, unit, value, source_file, sensor_type)
            SELECT timestamp, parameter_id, parameter_name, unit, value, source_file, sensor_type
            FROM staging_sensor_data
            EXCEPT
            SELECT timestamp, parameter_id, parameter_name, unit, value, source_file, sensor_type
            FROM sensor_data
            "#,
        )
        .execute(&mut *tx)
        .await?
        .rows_affected();

        sqlx::query("DELETE FROM staging_sensor_data")
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(inserted)
    }

    async fn record_session(&mut self, session: &SessionRecord) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO ingest_sessions
                (label, prefix, label_description, plant_name, machine_no, start_time, end_time)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (label, prefix) DO UPDATE SET
                label_description = excluded.label_description,
                plant_name = excluded.plant_name,
                machine_no = excluded.machine_no,
                start_time = excluded.start_time,
                end_time = excluded.end_time
            "#,
        )
        .bind(&session.label)
        .bind(&session.prefix)
        .bind(&session.label_description)
        .bind(&session.plant_name)
        .bind(&session.machine_no)
        .bind(session.start)
        .bind(session.end)
        .execute(&mut *tx)
        .await?;

        for event in &session.events {
            sqlx::query(
                r#"
                INSERT INTO ingest_events (label, event, description, start_time, end_time)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (label, event) DO UPDATE SET
                    description = excluded.description,
                    start_time = excluded.start_time,
                    end_time = excluded.end_time
                "#,
            )
            .bind(&session.label)
            .bind(&event.event)
            .bind(&event.description)
            .bind(event.start_time)
            .bind(event.end_time)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn row_count(&self) -> Result<u64, StoreError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sensor_data")
            .fetch_one(&self.pool)
            .await?;
        Ok(u64::try_from(count).unwrap_or(0))
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        self.pool.close().await;
        Ok(())
    }
}

/// In-process store with the same set semantics as [`SqliteStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    schema_ready: bool,
    rows: Vec<LongRecord>,
    index: HashSet<LongRecord>,
    sessions: BTreeMap<(String, String), SessionRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rows(&self) -> &[LongRecord] {
        &self.rows
    }

    pub fn sessions(&self) -> impl Iterator<Item = &SessionRecord> {
        self.sessions.values()
    }

    fn require_schema(&self) -> Result<(), StoreError> {
        if self.schema_ready {
            Ok(())
        } else {
            Err(StoreError::SchemaMissing)
        }
    }
}

#[async_trait]
impl SensorStore for MemoryStore {
    async fn ensure_schema(&mut self) -> Result<(), StoreError> {
        self.schema_ready = true;
        Ok(())
    }

    async fn insert_new_rows(&mut self, rows: &[LongRecord]) -> Result<u64, StoreError> {
        self.require_schema()?;
        let mut inserted = 0u64;
        for row in rows {
            if self.index.insert(row.clone()) {
                self.rows.push(row.clone());
                inserted += 1;
            }
        }
        Ok(inserted)
    }

    async fn record_session(&mut self, session: &SessionRecord) -> Result<(), StoreError> {
        self.require_schema()?;
        self.sessions.insert(
            (session.label.clone(), session.prefix.clone()),
            session.clone(),
        );
        Ok(())
    }

    async fn row_count(&self) -> Result<u64, StoreError> {
        Ok(self.rows.len() as u64)
    }

    async fn close(&mut self) -> Result<(), StoreError> {
        Ok(())
    }
}
