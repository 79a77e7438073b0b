use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use senslog_core::discovery::{discover_files, matches_any_pattern};
use senslog_core::error::DiscoveryError;
use senslog_core::event_filter::select_groups;
use senslog_core::events::{CollectingSink, IngestEvent, SkipReason};
use senslog_core::grouping::{bucket_start, group_sessions};
use senslog_core::types::EventWindow;
use zip::write::FileOptions;
use zip::ZipWriter;

const TABLE: &str = "ID,P1,P2\nName,Temp,Speed\nUnit,C,rpm\n2024/11/21 08:30:00,1.0,100\n";

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid test timestamp")
}

fn write_zip(path: &Path, entries: &[(&str, &str)]) -> Result<()> {
    let mut writer = ZipWriter::new(File::create(path)?);
    for (name, contents) in entries {
        writer.start_file(*name, FileOptions::default())?;
        writer.write_all(contents.as_bytes())?;
    }
    writer.finish()?;
    Ok(())
}

fn patterns(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

fn event(name: &str, start: NaiveDateTime, end: NaiveDateTime) -> EventWindow {
    EventWindow {
        event: name.to_string(),
        description: String::new(),
        start_time: start,
        end_time: end,
    }
}

#[test]
fn folder_with_plain_file_archive_and_garbage_yields_one_session() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("TKY#101211124083000_Vib.csv"), TABLE)?;
    fs::write(dir.path().join("garbage.csv"), "not a sensor log")?;
    write_zip(
        &dir.path().join("TKY#101211124083000_bundle.zip"),
        &[("TKY#101211124084500_Tmp.csv", TABLE)],
    )?;

    let sink = CollectingSink::new();
    let files = discover_files(dir.path(), &patterns(&["TKY", "garbage"]), &sink)?;

    assert_eq!(files.len(), 2);
    let archived: Vec<_> = files.iter().filter(|f| f.is_archived()).collect();
    assert_eq!(archived.len(), 1);
    assert_eq!(archived[0].sensor_type, "Tmp");
    assert_eq!(
        archived[0].internal_path.as_deref(),
        Some("TKY#101211124084500_Tmp.csv")
    );
    assert_eq!(archived[0].start_time, at(2024, 11, 21, 8, 45));
    assert_eq!(archived[0].end_time, at(2024, 11, 21, 10, 45));

    let events = sink.events();
    assert!(events.iter().any(|e| matches!(
        e,
        IngestEvent::FileSkipped { path, reason: SkipReason::UnrecognizedName }
            if path.ends_with("garbage.csv")
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        IngestEvent::FileMatched { sensor_type, archived: true, .. } if sensor_type == "Tmp"
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        IngestEvent::FileMatched { sensor_type, archived: false, .. } if sensor_type == "Vib"
    )));

    let groups = group_sessions(files, Duration::hours(24), &sink);
    assert_eq!(groups.len(), 1);
    assert_eq!(groups[0].prefix, "TKY#101_20241121");
    assert_eq!(groups[0].start, at(2024, 11, 21, 8, 30));
    assert_eq!(groups[0].end, at(2024, 11, 21, 10, 45));
    assert_eq!(groups[0].sensor_types(), vec!["Tmp", "Vib"]);

    let selection = select_groups(
        groups,
        &[event("startup", at(2024, 11, 21, 9, 0), at(2024, 11, 21, 9, 30))],
        &sink,
    );
    assert_eq!(selection.selected.len(), 1);
    Ok(())
}

#[test]
fn files_not_matching_any_pattern_are_ignored() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("TKY#101211124083000_Vib.csv"), TABLE)?;
    fs::write(dir.path().join("OSK#7211124083000_Vib.csv"), TABLE)?;
    fs::write(dir.path().join("TKY#101211124083000_Vib.txt"), TABLE)?;

    let sink = CollectingSink::new();
    let files = discover_files(dir.path(), &patterns(&["OSK"]), &sink)?;

    assert_eq!(files.len(), 1);
    assert_eq!(files[0].plant_code, "OSK");
    assert!(matches_any_pattern("TKY#101_Vib.csv", &patterns(&["101", "zzz"])));
    assert!(!matches_any_pattern("TKY#101_Vib.csv", &patterns(&["tky"])));
    Ok(())
}

#[test]
fn corrupt_archive_is_skipped_without_failing_the_walk() -> Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("TKY#101211124083000_broken.zip"), b"PK\x03\x04junk")?;
    write_zip(
        &dir.path().join("TKY#101211124090000_good.zip"),
        &[
            ("TKY#101211124090000_Vib.csv", TABLE),
            ("nested/TKY#101211124091000_inner.zip", "zip bytes"),
            ("readme.txt", "ignored"),
        ],
    )?;
    fs::create_dir(dir.path().join("sub"))?;
    fs::write(dir.path().join("sub/TKY#101211124100000_Cur.csv"), TABLE)?;

    let sink = CollectingSink::new();
    let files = discover_files(dir.path(), &patterns(&["TKY"]), &sink)?;

    assert_eq!(files.len(), 2);
    let events = sink.events();
    assert!(events
        .iter()
        .any(|e| matches!(e, IngestEvent::ArchiveUnreadable { path, .. } if path.contains("broken"))));
    assert!(events.iter().any(|e| matches!(
        e,
        IngestEvent::FileSkipped { reason: SkipReason::NestedArchive, .. }
    )));
    assert!(events.iter().any(|e| matches!(
        e,
        IngestEvent::DiscoverySummary {
            plain_files: 1,
            archived_entries: 1,
            unreadable_archives: 1,
            ..
        }
    )));
    Ok(())
}

#[test]
fn missing_root_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("absent");
    let sink = CollectingSink::new();

    let err = discover_files(&missing, &patterns(&["TKY"]), &sink).unwrap_err();
    assert!(matches!(err, DiscoveryError::RootNotFound(_)));
}

#[test]
fn sessions_split_by_machine_and_day() -> Result<()> {
    let dir = tempfile::tempdir()?;
    for name in [
        "TKY#101211124083000_Vib.csv",
        "TKY#101211124233000_Tmp.csv",
        "TKY#101221124003000_Vib.csv",
        "TKY#102211124083000_Vib.csv",
    ] {
        fs::write(dir.path().join(name), TABLE)?;
    }

    let sink = CollectingSink::new();
    let files = discover_files(dir.path(), &patterns(&["TKY"]), &sink)?;
    let groups = group_sessions(files, Duration::hours(24), &sink);

    let prefixes: Vec<&str> = groups.iter().map(|g| g.prefix.as_str()).collect();
    assert_eq!(
        prefixes,
        vec!["TKY#101_20241121", "TKY#102_20241121", "TKY#101_20241122"]
    );
    for group in &groups {
        for file in &group.files {
            assert!(group.start <= file.start_time);
            assert!(file.end_time <= group.end);
        }
    }
    assert_eq!(groups[0].files.len(), 2);
    assert_eq!(groups[0].end, at(2024, 11, 22, 1, 30));
    Ok(())
}

#[test]
fn buckets_align_to_epoch_multiples() {
    let ts = at(2024, 11, 21, 8, 45);
    assert_eq!(bucket_start(ts, Duration::hours(6)), at(2024, 11, 21, 6, 0));
    assert_eq!(bucket_start(ts, Duration::hours(24)), at(2024, 11, 21, 0, 0));
}

#[test]
fn event_filter_is_boundary_inclusive() -> Result<()> {
    let dir = tempfile::tempdir()?;
    write_zip(
        &dir.path().join("TKY#101211124083000_a.zip"),
        &[("TKY#101211124083000_Vib.csv", TABLE)],
    )?;

    let sink = CollectingSink::new();
    let files = discover_files(dir.path(), &patterns(&["TKY"]), &sink)?;
    let groups = group_sessions(files, Duration::hours(24), &sink);

    let touching = event("touch", at(2024, 11, 21, 10, 30), at(2024, 11, 21, 11, 0));
    let selection = select_groups(groups.clone(), &[touching], &sink);
    assert_eq!(selection.selected.len(), 1);

    let after = event("later", at(2024, 11, 21, 10, 31), at(2024, 11, 21, 11, 0));
    let sink = CollectingSink::new();
    let selection = select_groups(groups, &[after], &sink);
    assert!(selection.selected.is_empty());
    let available = selection.available.expect("range");
    assert_eq!(available.start, at(2024, 11, 21, 8, 30));
    assert_eq!(available.end, at(2024, 11, 21, 10, 30));
    assert!(sink
        .events()
        .iter()
        .any(|e| matches!(e, IngestEvent::NoMatchingGroups { available: Some(_), .. })));
    Ok(())
}
