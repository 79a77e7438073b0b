//! Recursive discovery of sensor-log files, including members of zip archives.

use std::fs::{self, File};
use std::path::Path;

use chrono::{DateTime, Local, NaiveDateTime};
use senslog_parser::extract_metadata;
use walkdir::WalkDir;
use zip::ZipArchive;

use crate::error::DiscoveryError;
use crate::events::{EventSink, IngestEvent, SkipReason};
use crate::types::FileDescriptor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateKind {
    Table,
    Archive,
}

#[derive(Debug, Default)]
struct DiscoveryStats {
    plain_files: usize,
    archived_entries: usize,
    skipped: usize,
    unreadable_archives: usize,
}

/// Substring containment against any pattern; no globbing.
pub fn matches_any_pattern(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| name.contains(pattern.as_str()))
}

fn candidate_kind(name: &str) -> Option<CandidateKind> {
    let extension = Path::new(name)
        .extension()?
        .to_str()?
        .to_ascii_lowercase();
    match extension.as_str() {
        "csv" => Some(CandidateKind::Table),
        "zip" => Some(CandidateKind::Archive),
        _ => None,
    }
}

fn modified_time(path: &Path) -> Option<NaiveDateTime> {
    let modified = fs::metadata(path).and_then(|meta| meta.modified()).ok()?;
    Some(DateTime::<Local>::from(modified).naive_local())
}

/// Walks `root` and returns a descriptor for every recognizable sensor file.
///
/// Unrecognized names, unreadable directory entries and corrupt archives are reported
/// through `sink` and skipped; only a missing root fails the call.
pub fn discover_files(
    root: &Path,
    patterns: &[String],
    sink: &dyn EventSink,
) -> Result<Vec<FileDescriptor>, DiscoveryError> {
    if !root.exists() {
        return Err(DiscoveryError::RootNotFound(root.to_path_buf()));
    }
    if !root.is_dir() {
        return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
    }

    let mut stats = DiscoveryStats::default();
    let mut collected = Vec::new();

    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = match entry {
            Ok(entry) => entry,
            Err(err) => {
                sink.emit(IngestEvent::WalkFailed {
                    error: err.to_string(),
                });
                continue;
            }
        };
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let name = entry.file_name().to_string_lossy();
        let Some(kind) = candidate_kind(&name) else {
            continue;
        };
        if !matches_any_pattern(&name, patterns) {
            continue;
        }

        match kind {
            CandidateKind::Table => match extract_metadata(&name, modified_time(path)) {
                Some(metadata) => {
                    let descriptor = FileDescriptor::plain(metadata, path);
                    sink.emit(IngestEvent::FileMatched {
                        path: descriptor.display_path(),
                        sensor_type: descriptor.sensor_type.clone(),
                        archived: descriptor.is_archived(),
                    });
                    stats.plain_files += 1;
                    collected.push(descriptor);
                }
                None => {
                    stats.skipped += 1;
                    sink.emit(IngestEvent::FileSkipped {
                        path: path.display().to_string(),
                        reason: SkipReason::UnrecognizedName,
                    });
                }
            },
            CandidateKind::Archive => match expand_archive(path, patterns, sink, &mut stats) {
                Ok(entries) => {
                    stats.archived_entries += entries.len();
                    collected.extend(entries);
                }
                Err(err) => {
                    stats.unreadable_archives += 1;
                    sink.emit(IngestEvent::ArchiveUnreadable {
                        path: path.display().to_string(),
                        error: err.to_string(),
                    });
                }
            },
        }
    }

    sink.emit(IngestEvent::DiscoverySummary {
        root: root.display().to_string(),
        plain_files: stats.plain_files,
        archived_entries: stats.archived_entries,
        skipped: stats.skipped,
        unreadable_archives: stats.unreadable_archives,
    });

    Ok(collected)
}

/// Lists matching members of one archive. Any read failure discards the whole archive.
fn expand_archive(
    archive_path: &Path,
    patterns: &[String],
    sink: &dyn EventSink,
    stats: &mut DiscoveryStats,
) -> zip::result::ZipResult<Vec<FileDescriptor>> {
    let file = File::open(archive_path)?;
    let mut archive = ZipArchive::new(file)?;

    let mut names = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let entry = archive.by_index_raw(index)?;
        if entry.is_dir() {
            continue;
        }
        names.push(entry.name().to_string());
    }

    let mut descriptors = Vec::new();
    let mut skipped = Vec::new();
    for internal_path in names {
        if !matches_any_pattern(&internal_path, patterns) {
            continue;
        }
        let display = format!("{}!{}", archive_path.display(), internal_path);
        if candidate_kind(&internal_path) == Some(CandidateKind::Archive) {
            skipped.push((display, SkipReason::NestedArchive));
            continue;
        }
        match extract_metadata(&internal_path, None) {
            Some(metadata) => {
                descriptors.push(FileDescriptor::archived(metadata, archive_path, &internal_path))
            }
            None => skipped.push((display, SkipReason::UnrecognizedName)),
        }
    }

    for descriptor in &descriptors {
        sink.emit(IngestEvent::FileMatched {
            path: descriptor.display_path(),
            sensor_type: descriptor.sensor_type.clone(),
            archived: descriptor.is_archived(),
        });
    }
    stats.skipped += skipped.len();
    for (path, reason) in skipped {
        sink.emit(IngestEvent::FileSkipped { path, reason });
    }

    Ok(descriptors)
}
