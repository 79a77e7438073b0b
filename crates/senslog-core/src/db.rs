// crates/senslog-core/src/db.rs

use std::path::Path;
use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::{Pool, Sqlite};
use tracing::info;

use crate::error::StoreError;

pub type DbPool = Pool<Sqlite>;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS sensor_data (
        timestamp TIMESTAMP,
        parameter_id TEXT,
        parameter_name TEXT,
        unit TEXT,
        value TEXT,
        source_file TEXT,
        sensor_type TEXT
    )
    "#,
    r#"
    CREATE INDEX IF NOT EXISTS sensor_data_parameter_time
        ON sensor_data (parameter_id, timestamp)
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ingest_sessions (
        label TEXT NOT NULL,
        prefix TEXT NOT NULL,
        label_description TEXT NOT NULL,
        plant_name TEXT NOT NULL,
        machine_no TEXT NOT NULL,
        start_time TIMESTAMP NOT NULL,
        end_time TIMESTAMP NOT NULL,
        PRIMARY KEY (label, prefix)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS ingest_events (
        label TEXT NOT NULL,
        event TEXT NOT NULL,
        description TEXT NOT NULL,
        start_time TIMESTAMP NOT NULL,
        end_time TIMESTAMP NOT NULL,
        PRIMARY KEY (label, event)
    )
    "#,
];

/// Opens (creating if needed) the SQLite store at `path`.
///
/// The pool holds one connection; the staging table used by set-difference inserts is
/// connection-local.
pub async fn connect(path: &Path) -> Result<DbPool, StoreError> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(10))
        .connect_with(options)
        .await?;

    info!(path = %path.display(), "Store connection established");
    Ok(pool)
}

/// Creates every table the pipeline writes to. Safe to call on an existing store.
pub async fn ensure_schema(pool: &DbPool) -> Result<(), StoreError> {
    for statement in SCHEMA {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}
