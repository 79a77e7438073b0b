use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Header token that marks a column with no real parameter behind it.
pub const PLACEHOLDER: &str = "－";

/// Session facts recovered from a sensor-log file name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilenameMetadata {
    pub plant_code: String,
    pub machine_code: String,
    pub sensor_type: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

/// The three header levels of one data column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParameterKey {
    pub id: String,
    pub name: String,
    pub unit: String,
}

impl ParameterKey {
    pub fn new(id: impl Into<String>, name: impl Into<String>, unit: impl Into<String>) -> Self {
        Self {
            id: id.into().trim().to_string(),
            name: name.into().trim().to_string(),
            unit: unit.into().trim().to_string(),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.name == PLACEHOLDER && self.unit == PLACEHOLDER
    }
}

/// One (timestamp, parameter) observation in long format.
///
/// `value` keeps the raw cell text; numeric interpretation is left to the store.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LongRecord {
    pub timestamp: Option<NaiveDateTime>,
    pub parameter_id: String,
    pub parameter_name: String,
    pub unit: String,
    pub value: Option<String>,
    pub source_file: String,
    pub sensor_type: String,
}

impl LongRecord {
    pub const COLUMNS: [&'static str; 7] = [
        "timestamp",
        "parameter_id",
        "parameter_name",
        "unit",
        "value",
        "source_file",
        "sensor_type",
    ];
}

/// Provenance attached to every record emitted for one file.
#[derive(Debug, Clone, Copy)]
pub struct RecordSource<'a> {
    pub source_file: &'a str,
    pub sensor_type: &'a str,
}
