use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chrono::NaiveDateTime;
use senslog_parser::LongRecord;
use serde::Serialize;
use tracing::info;

use crate::config::{ConfigError, IngestConfig, ValidationIssue};
use crate::consolidation::consolidate_group;
use crate::discovery::discover_files;
use crate::error::Result;
use crate::event_filter::{select_groups, EventSelection};
use crate::events::{EventSink, IngestEvent};
use crate::frame::write_parquet;
use crate::grouping::group_sessions;
use crate::normalizer::NormalizeOptions;
use crate::store::{SensorStore, SessionRecord};
use crate::types::TimeRange;

/// Shared stop request, honoured between groups.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag(Arc<AtomicBool>);

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Debug, Clone, Default)]
pub struct IngestOptions {
    /// When set, each selected group's records are also written as `<prefix>.parquet`.
    pub export_dir: Option<PathBuf>,
}

/// Outcome of discovery, grouping and event filtering.
#[derive(Debug, Clone, Serialize)]
pub struct SessionPlan {
    pub discovered_files: usize,
    pub groups_formed: usize,
    pub selection: EventSelection,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupReport {
    pub prefix: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub files: usize,
    pub files_failed: usize,
    pub parameters: usize,
    pub rows_consolidated: usize,
    pub rows_inserted: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exported_to: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IngestReport {
    pub discovered_files: usize,
    pub groups_formed: usize,
    pub groups_selected: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_range: Option<TimeRange>,
    pub groups: Vec<GroupReport>,
    pub rows_inserted: u64,
    pub cancelled: bool,
}

fn normalize_options(config: &IngestConfig) -> std::result::Result<NormalizeOptions, ConfigError> {
    NormalizeOptions::new(&config.encoding, config.delimiter).ok_or_else(|| {
        ConfigError::Invalid(vec![ValidationIssue {
            field: "encoding".to_string(),
            message: format!(
                "cannot build a reader for encoding '{}' with delimiter {:?}",
                config.encoding, config.delimiter
            ),
        }])
    })
}

/// Writes one group's parquet file. A failed export is reported and never stops the run.
fn export_group(
    dir: &Path,
    prefix: &str,
    records: &[LongRecord],
    sink: &dyn EventSink,
) -> Option<PathBuf> {
    let path = dir.join(format!("{}.parquet", prefix.replace('#', "_")));
    match write_parquet(&path, records) {
        Ok(()) => Some(path),
        Err(err) => {
            sink.emit(IngestEvent::ExportFailed {
                prefix: prefix.to_string(),
                path: path.display().to_string(),
                error: err.to_string(),
            });
            None
        }
    }
}

/// Discovers, groups and filters files without reading their contents.
pub fn plan_sessions(config: &IngestConfig, sink: &dyn EventSink) -> Result<SessionPlan> {
    let files = discover_files(&config.target_folder, &config.name_patterns, sink)?;
    let discovered_files = files.len();

    let groups = group_sessions(files, config.session_bucket(), sink);
    let groups_formed = groups.len();

    let selection = select_groups(groups, &config.events, sink);
    Ok(SessionPlan {
        discovered_files,
        groups_formed,
        selection,
    })
}

/// Runs the whole pipeline against `store`.
///
/// The caller owns the store and closes it afterwards, whatever the outcome. Only invalid
/// configuration and store failures end the run early; per-file and export problems surface
/// as events.
pub async fn run_ingest(
    config: &IngestConfig,
    store: &mut dyn SensorStore,
    sink: &dyn EventSink,
    cancel: &CancellationFlag,
    options: &IngestOptions,
) -> Result<IngestReport> {
    config.validate()?;
    let normalize = normalize_options(config)?;

    let plan = plan_sessions(config, sink)?;
    let available_range = plan.selection.available;
    let selected = plan.selection.selected;
    let groups_selected = selected.len();

    store.ensure_schema().await?;

    let mut reports = Vec::with_capacity(groups_selected);
    let mut rows_inserted = 0u64;
    let mut cancelled = false;

    for (idx, group) in selected.iter().enumerate() {
        if cancel.is_cancelled() {
            cancelled = true;
            sink.emit(IngestEvent::RunCancelled {
                remaining_groups: groups_selected - idx,
            });
            break;
        }

        let consolidated = consolidate_group(group, &normalize, sink);

        let exported_to = match &options.export_dir {
            Some(dir) if !consolidated.records.is_empty() => {
                export_group(dir, &group.prefix, &consolidated.records, sink)
            }
            _ => None,
        };

        let inserted = store.insert_new_rows(&consolidated.records).await?;
        sink.emit(IngestEvent::RowsPersisted {
            prefix: group.prefix.clone(),
            submitted: consolidated.records.len(),
            inserted,
        });

        store
            .record_session(&SessionRecord {
                label: config.label.clone(),
                label_description: config.label_description.clone(),
                plant_name: config.plant_name.clone(),
                machine_no: config.machine_no.clone(),
                prefix: group.prefix.clone(),
                start: group.start,
                end: group.end,
                events: config
                    .events
                    .iter()
                    .filter(|event| event.window().overlaps(&group.window()))
                    .cloned()
                    .collect(),
            })
            .await?;

        rows_inserted += inserted;
        reports.push(GroupReport {
            prefix: group.prefix.clone(),
            start: group.start,
            end: group.end,
            files: group.files.len(),
            files_failed: consolidated.files_failed,
            parameters: consolidated.parameters,
            rows_consolidated: consolidated.records.len(),
            rows_inserted: inserted,
            exported_to,
        });
    }

    info!(
        groups = reports.len(),
        rows_inserted,
        cancelled,
        "Ingestion run finished"
    );

    Ok(IngestReport {
        discovered_files: plan.discovered_files,
        groups_formed: plan.groups_formed,
        groups_selected,
        available_range,
        groups: reports,
        rows_inserted,
        cancelled,
    })
}
