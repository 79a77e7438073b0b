use std::collections::BTreeMap;

use chrono::{DateTime, Duration, NaiveDateTime};

use crate::events::{EventSink, IngestEvent};
use crate::types::{FileDescriptor, GroupedSensorFileSet};

const SECONDS_PER_DAY: i64 = 86_400;

/// Start of the bucket containing `timestamp`, with buckets aligned to the epoch.
pub fn bucket_start(timestamp: NaiveDateTime, width: Duration) -> NaiveDateTime {
    let width_secs = width.num_seconds().max(1);
    let secs = timestamp.and_utc().timestamp();
    let floored = secs.div_euclid(width_secs) * width_secs;
    DateTime::from_timestamp(floored, 0)
        .map(|dt| dt.naive_utc())
        .unwrap_or(timestamp)
}

fn session_prefix(plant: &str, machine: &str, bucket: NaiveDateTime, width: Duration) -> String {
    let format = if width.num_seconds() % SECONDS_PER_DAY == 0 {
        "%Y%m%d"
    } else {
        "%Y%m%dT%H%M"
    };
    format!("{plant}#{machine}_{}", bucket.format(format))
}

/// Clusters descriptors by plant, machine and session bucket.
///
/// Files inside a group are ordered by start time (ties by location) so consolidation
/// is deterministic. Groups come back ordered by start time, then prefix.
pub fn group_sessions(
    files: Vec<FileDescriptor>,
    bucket_width: Duration,
    sink: &dyn EventSink,
) -> Vec<GroupedSensorFileSet> {
    let mut buckets: BTreeMap<(String, String, NaiveDateTime), Vec<FileDescriptor>> =
        BTreeMap::new();
    for file in files {
        let key = (
            file.plant_code.clone(),
            file.machine_code.clone(),
            bucket_start(file.start_time, bucket_width),
        );
        buckets.entry(key).or_default().push(file);
    }

    let mut groups: Vec<GroupedSensorFileSet> = buckets
        .into_iter()
        .filter_map(|((plant, machine, bucket), mut members)| {
            members.sort_by(|a, b| {
                a.start_time
                    .cmp(&b.start_time)
                    .then_with(|| a.display_path().cmp(&b.display_path()))
            });
            let start = members.iter().map(|f| f.start_time).min()?;
            let end = members.iter().map(|f| f.end_time).max()?;
            Some(GroupedSensorFileSet {
                prefix: session_prefix(&plant, &machine, bucket, bucket_width),
                start,
                end,
                files: members,
            })
        })
        .collect();

    groups.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.prefix.cmp(&b.prefix)));

    for group in &groups {
        sink.emit(IngestEvent::GroupSummary {
            prefix: group.prefix.clone(),
            window: group.window(),
            file_count: group.files.len(),
            sensor_types: group.sensor_types(),
        });
    }

    groups
}
