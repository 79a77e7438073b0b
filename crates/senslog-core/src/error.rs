// crates/senslog-core/src/error.rs

use std::path::PathBuf;

use senslog_parser::TableError;
use thiserror::Error;

use crate::config::ConfigError;

#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("target folder not found: {0}")]
    RootNotFound(PathBuf),

    #[error("target path is not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Failure to turn one file into long records. Never escalates past its group.
#[derive(Error, Debug)]
pub enum NormalizeError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read archive entry {path}: {source}")]
    Archive {
        path: String,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("{path} is not valid {encoding} text")]
    Decode { path: String, encoding: &'static str },

    #[error("{path}: {source}")]
    Table {
        path: String,
        #[source]
        source: TableError,
    },
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database query failed: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("store schema has not been created; call ensure_schema first")]
    SchemaMissing,
}

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Polars operation failed: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Run-level failure. File-level problems are reported as events instead.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Discovery(#[from] DiscoveryError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub type Result<T> = std::result::Result<T, IngestError>;
