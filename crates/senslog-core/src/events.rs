use std::sync::Mutex;

use serde::Serialize;
use tracing::{info, warn};

use crate::types::{EventWindow, TimeRange};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    UnrecognizedName,
    NestedArchive,
}

impl SkipReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            SkipReason::UnrecognizedName => "unrecognized file name",
            SkipReason::NestedArchive => "nested archive",
        }
    }
}

/// Diagnostic emitted while a run progresses. Not part of the stored data.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IngestEvent {
    FileMatched {
        path: String,
        sensor_type: String,
        archived: bool,
    },
    FileSkipped {
        path: String,
        reason: SkipReason,
    },
    ArchiveUnreadable {
        path: String,
        error: String,
    },
    WalkFailed {
        error: String,
    },
    DiscoverySummary {
        root: String,
        plain_files: usize,
        archived_entries: usize,
        skipped: usize,
        unreadable_archives: usize,
    },
    GroupSummary {
        prefix: String,
        window: TimeRange,
        file_count: usize,
        sensor_types: Vec<String>,
    },
    GroupSelected {
        prefix: String,
        events: Vec<String>,
    },
    NoMatchingGroups {
        available: Option<TimeRange>,
        requested: Vec<EventWindow>,
    },
    FileProcessing {
        prefix: String,
        path: String,
        sensor_type: String,
    },
    FileFailed {
        prefix: String,
        path: String,
        error: String,
    },
    GroupConsolidated {
        prefix: String,
        rows: usize,
        parameters: usize,
        files_failed: usize,
    },
    ExportFailed {
        prefix: String,
        path: String,
        error: String,
    },
    RowsPersisted {
        prefix: String,
        submitted: usize,
        inserted: u64,
    },
    RunCancelled {
        remaining_groups: usize,
    },
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: IngestEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: IngestEvent) {
        match event {
            IngestEvent::FileMatched {
                path,
                sensor_type,
                archived,
            } => info!(%path, %sensor_type, archived, "Matched sensor file"),
            IngestEvent::FileSkipped { path, reason } => {
                warn!(%path, reason = reason.as_str(), "Skipping file")
            }
            IngestEvent::ArchiveUnreadable { path, error } => {
                warn!(%path, %error, "Archive is corrupt or unreadable; skipping")
            }
            IngestEvent::WalkFailed { error } => warn!(%error, "Error accessing entry"),
            IngestEvent::DiscoverySummary {
                root,
                plain_files,
                archived_entries,
                skipped,
                unreadable_archives,
            } => info!(
                %root,
                plain_files,
                archived_entries,
                skipped,
                unreadable_archives,
                "Discovery complete"
            ),
            IngestEvent::GroupSummary {
                prefix,
                window,
                file_count,
                sensor_types,
            } => info!(
                %prefix,
                start = %window.start,
                end = %window.end,
                file_count,
                sensor_types = %sensor_types.join(","),
                "Session group formed"
            ),
            IngestEvent::GroupSelected { prefix, events } => {
                info!(%prefix, events = %events.join(","), "Session group selected")
            }
            IngestEvent::NoMatchingGroups {
                available,
                requested,
            } => {
                let requested: Vec<String> = requested
                    .iter()
                    .map(|e| format!("{} [{} .. {}]", e.event, e.start_time, e.end_time))
                    .collect();
                match available {
                    Some(range) => warn!(
                        available_start = %range.start,
                        available_end = %range.end,
                        requested = %requested.join("; "),
                        "No session group overlaps the requested events"
                    ),
                    None => warn!(
                        requested = %requested.join("; "),
                        "No session groups were discovered"
                    ),
                }
            }
            IngestEvent::FileProcessing {
                prefix,
                path,
                sensor_type,
            } => info!(%prefix, %path, %sensor_type, "Normalizing file"),
            IngestEvent::FileFailed {
                prefix,
                path,
                error,
            } => warn!(%prefix, %path, %error, "Failed to normalize file; continuing"),
            IngestEvent::GroupConsolidated {
                prefix,
                rows,
                parameters,
                files_failed,
            } => info!(%prefix, rows, parameters, files_failed, "Group consolidated"),
            IngestEvent::ExportFailed {
                prefix,
                path,
                error,
            } => warn!(%prefix, %path, %error, "Parquet export failed; persisting anyway"),
            IngestEvent::RowsPersisted {
                prefix,
                submitted,
                inserted,
            } => info!(%prefix, submitted, inserted, "Rows persisted"),
            IngestEvent::RunCancelled { remaining_groups } => {
                warn!(remaining_groups, "Run cancelled between groups")
            }
        }
    }
}

/// Keeps every event in memory, in emission order.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<IngestEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<IngestEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }
}

impl EventSink for CollectingSink {
    fn emit(&self, event: IngestEvent) {
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event);
    }
}
