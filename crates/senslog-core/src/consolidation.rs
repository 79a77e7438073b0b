use std::collections::HashSet;

use senslog_parser::LongRecord;

use crate::error::NormalizeError;
use crate::events::{EventSink, IngestEvent};
use crate::normalizer::{normalize_file, NormalizeOptions};
use crate::types::{FileDescriptor, GroupedSensorFileSet};

#[derive(Debug, Clone, Default)]
pub struct ConsolidatedGroup {
    pub prefix: String,
    pub records: Vec<LongRecord>,
    pub parameters: usize,
    pub files_failed: usize,
}

pub fn consolidate_group(
    group: &GroupedSensorFileSet,
    options: &NormalizeOptions,
    sink: &dyn EventSink,
) -> ConsolidatedGroup {
    consolidate_with(group, sink, |file| normalize_file(file, options))
}

/// Concatenates the long records of every file in group order.
///
/// A parameter id already emitted by an earlier file is dropped from later files, so each
/// parameter stream comes from exactly one file. Files that fail to normalize are reported
/// and skipped.
pub fn consolidate_with<F>(
    group: &GroupedSensorFileSet,
    sink: &dyn EventSink,
    mut normalize: F,
) -> ConsolidatedGroup
where
    F: FnMut(&FileDescriptor) -> Result<Vec<LongRecord>, NormalizeError>,
{
    let mut seen_parameters: HashSet<String> = HashSet::new();
    let mut records = Vec::new();
    let mut files_failed = 0usize;

    for file in &group.files {
        let path = file.display_path();
        sink.emit(IngestEvent::FileProcessing {
            prefix: group.prefix.clone(),
            path: path.clone(),
            sensor_type: file.sensor_type.clone(),
        });

        let rows = match normalize(file) {
            Ok(rows) => rows,
            Err(err) => {
                files_failed += 1;
                sink.emit(IngestEvent::FileFailed {
                    prefix: group.prefix.clone(),
                    path,
                    error: err.to_string(),
                });
                continue;
            }
        };

        let fresh: Vec<LongRecord> = rows
            .into_iter()
            .filter(|row| !seen_parameters.contains(&row.parameter_id))
            .collect();
        seen_parameters.extend(fresh.iter().map(|row| row.parameter_id.clone()));
        records.extend(fresh);
    }

    sink.emit(IngestEvent::GroupConsolidated {
        prefix: group.prefix.clone(),
        rows: records.len(),
        parameters: seen_parameters.len(),
        files_failed,
    });

    ConsolidatedGroup {
        prefix: group.prefix.clone(),
        records,
        parameters: seen_parameters.len(),
        files_failed,
    }
}
