use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::normalizer::resolve_encoding;
use crate::types::EventWindow;

/// Caller-supplied description of one ingestion run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub target_folder: PathBuf,
    pub name_patterns: Vec<String>,
    pub encoding: String,
    pub db_path: PathBuf,
    pub plant_name: String,
    pub machine_no: String,
    pub label: String,
    #[serde(default)]
    pub label_description: String,
    pub events: Vec<EventWindow>,
    #[serde(default = "default_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_session_bucket_hours")]
    pub session_bucket_hours: u32,
}

fn default_delimiter() -> char {
    ','
}

fn default_session_bucket_hours() -> u32 {
    24
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub field: String,
    pub message: String,
}

impl ValidationIssue {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid TOML in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("unsupported config format for {0} (expected .json or .toml)")]
    UnsupportedFormat(PathBuf),

    #[error("configuration failed validation: {}", join_issues(.0))]
    Invalid(Vec<ValidationIssue>),
}

fn join_issues(issues: &[ValidationIssue]) -> String {
    issues
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl IngestConfig {
    /// Reads and validates a JSON or TOML config, chosen by file extension.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        let config: IngestConfig = match extension.as_deref() {
            Some("json") => serde_json::from_str(&raw).map_err(|source| ConfigError::Json {
                path: path.to_path_buf(),
                source,
            })?,
            Some("toml") => toml::from_str(&raw).map_err(|source| ConfigError::Toml {
                path: path.to_path_buf(),
                source,
            })?,
            _ => return Err(ConfigError::UnsupportedFormat(path.to_path_buf())),
        };
        config.validate()?;
        Ok(config)
    }

    /// Collects every problem instead of stopping at the first one.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut issues = Vec::new();

        if !self.target_folder.is_dir() {
            issues.push(ValidationIssue::new(
                "target_folder",
                format!("{} is not an existing directory", self.target_folder.display()),
            ));
        }
        if self.name_patterns.is_empty() {
            issues.push(ValidationIssue::new(
                "name_patterns",
                "at least one pattern is required",
            ));
        }
        for (idx, pattern) in self.name_patterns.iter().enumerate() {
            if pattern.is_empty() {
                issues.push(ValidationIssue::new(
                    format!("name_patterns[{idx}]"),
                    "pattern must not be empty",
                ));
            }
        }
        if resolve_encoding(&self.encoding).is_none() {
            issues.push(ValidationIssue::new(
                "encoding",
                format!("unknown text encoding '{}'", self.encoding),
            ));
        }
        if self.db_path.as_os_str().is_empty() {
            issues.push(ValidationIssue::new("db_path", "store location is required"));
        }
        for (field, value) in [
            ("plant_name", &self.plant_name),
            ("machine_no", &self.machine_no),
            ("label", &self.label),
        ] {
            if value.trim().is_empty() {
                issues.push(ValidationIssue::new(field, "must not be empty"));
            }
        }
        if !self.delimiter.is_ascii() || matches!(self.delimiter, '\n' | '\r' | '"') {
            issues.push(ValidationIssue::new(
                "delimiter",
                format!("{:?} cannot be used as a field separator", self.delimiter),
            ));
        }
        if self.session_bucket_hours == 0 {
            issues.push(ValidationIssue::new(
                "session_bucket_hours",
                "must be greater than zero",
            ));
        }
        for (idx, event) in self.events.iter().enumerate() {
            if event.event.trim().is_empty() {
                issues.push(ValidationIssue::new(
                    format!("events[{idx}].event"),
                    "event name must not be empty",
                ));
            }
            if event.start_time > event.end_time {
                issues.push(ValidationIssue::new(
                    format!("events[{idx}]"),
                    format!(
                        "start_time {} is after end_time {}",
                        event.start_time, event.end_time
                    ),
                ));
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(issues))
        }
    }

    pub fn session_bucket(&self) -> Duration {
        Duration::hours(i64::from(self.session_bucket_hours))
    }
}
