// crates/senslog-core/src/types.rs

use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use senslog_parser::FilenameMetadata;
use serde::{Deserialize, Serialize};

/// One discovered sensor-log file, either on disk or inside a zip archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileDescriptor {
    pub plant_code: String,
    pub machine_code: String,
    pub sensor_type: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub source_file_path: PathBuf,
    pub source_archive_path: Option<PathBuf>,
    pub internal_path: Option<String>,
}

impl FileDescriptor {
    pub fn plain(metadata: FilenameMetadata, path: &Path) -> Self {
        Self::build(metadata, path.to_path_buf(), None, None)
    }

    pub fn archived(metadata: FilenameMetadata, archive: &Path, internal_path: &str) -> Self {
        Self::build(
            metadata,
            PathBuf::from(internal_path),
            Some(archive.to_path_buf()),
            Some(internal_path.to_string()),
        )
    }

    fn build(
        metadata: FilenameMetadata,
        source_file_path: PathBuf,
        source_archive_path: Option<PathBuf>,
        internal_path: Option<String>,
    ) -> Self {
        Self {
            plant_code: metadata.plant_code,
            machine_code: metadata.machine_code,
            sensor_type: metadata.sensor_type,
            start_time: metadata.start_time,
            end_time: metadata.end_time,
            source_file_path,
            source_archive_path,
            internal_path,
        }
    }

    pub fn is_archived(&self) -> bool {
        self.source_archive_path.is_some()
    }

    /// Human-readable location, `archive.zip!entry.csv` for archive members.
    pub fn display_path(&self) -> String {
        match (&self.source_archive_path, &self.internal_path) {
            (Some(archive), Some(internal)) => format!("{}!{}", archive.display(), internal),
            _ => self.source_file_path.display().to_string(),
        }
    }

    /// Value stored in each record's `source_file` column.
    pub fn source_file(&self) -> String {
        self.source_file_path.display().to_string()
    }

    pub fn window(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

/// Files of one plant/machine recorded within one session bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupedSensorFileSet {
    pub prefix: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub files: Vec<FileDescriptor>,
}

impl GroupedSensorFileSet {
    pub fn window(&self) -> TimeRange {
        TimeRange::new(self.start, self.end)
    }

    pub fn sensor_types(&self) -> Vec<String> {
        let mut types: Vec<String> = self.files.iter().map(|f| f.sensor_type.clone()).collect();
        types.sort();
        types.dedup();
        types
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventWindow {
    pub event: String,
    #[serde(default)]
    pub description: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl EventWindow {
    pub fn window(&self) -> TimeRange {
        TimeRange::new(self.start_time, self.end_time)
    }
}

/// Closed interval `[start, end]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeRange {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Boundary-inclusive: ranges that only touch still overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    pub fn union(&self, other: &TimeRange) -> TimeRange {
        TimeRange::new(self.start.min(other.start), self.end.max(other.end))
    }
}
