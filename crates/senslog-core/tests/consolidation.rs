use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime};
use senslog_core::consolidation::{consolidate_group, consolidate_with};
use senslog_core::error::NormalizeError;
use senslog_core::events::{CollectingSink, IngestEvent};
use senslog_core::normalizer::{decode, normalize_file, resolve_encoding, NormalizeOptions};
use senslog_core::types::{FileDescriptor, GroupedSensorFileSet};
use senslog_parser::extract_metadata;
use zip::write::FileOptions;
use zip::ZipWriter;

fn at(h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 21)
        .and_then(|date| date.and_hms_opt(h, min, 0))
        .expect("valid test timestamp")
}

fn plain(dir: &Path, name: &str, contents: &[u8]) -> Result<FileDescriptor> {
    let path = dir.join(name);
    fs::write(&path, contents)?;
    let meta = extract_metadata(name, None).expect("recognizable name");
    Ok(FileDescriptor::plain(meta, &path))
}

fn group(files: Vec<FileDescriptor>) -> GroupedSensorFileSet {
    GroupedSensorFileSet {
        prefix: "TKY#101_20241121".to_string(),
        start: files.iter().map(|f| f.start_time).min().expect("files"),
        end: files.iter().map(|f| f.end_time).max().expect("files"),
        files,
    }
}

#[test]
fn earlier_file_wins_each_parameter() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let first = plain(
        dir.path(),
        "TKY#101211124083000_Vib.csv",
        b"ID,P1\nName,Vibration\nUnit,mm/s\n2024/11/21 08:30:00,0.4\n2024/11/21 08:31:00,0.5\n",
    )?;
    let second = plain(
        dir.path(),
        "TKY#101211124084500_Tmp.csv",
        b"ID,P1,P2\nName,Vibration,Temp\nUnit,mm/s,C\n2024/11/21 08:45:00,9.9,41.0\n",
    )?;

    let sink = CollectingSink::new();
    let consolidated = consolidate_group(
        &group(vec![first, second]),
        &NormalizeOptions::default(),
        &sink,
    );

    assert_eq!(consolidated.records.len(), 3);
    assert_eq!(consolidated.parameters, 2);
    assert_eq!(consolidated.files_failed, 0);

    let p1: Vec<_> = consolidated
        .records
        .iter()
        .filter(|r| r.parameter_id == "P1")
        .collect();
    assert_eq!(p1.len(), 2);
    assert!(p1.iter().all(|r| r.source_file.ends_with("TKY#101211124083000_Vib.csv")));
    assert!(p1.iter().all(|r| r.sensor_type == "Vib"));

    let p2: Vec<_> = consolidated
        .records
        .iter()
        .filter(|r| r.parameter_id == "P2")
        .collect();
    assert_eq!(p2.len(), 1);
    assert_eq!(p2[0].timestamp, Some(at(8, 45)));
    assert_eq!(p2[0].value.as_deref(), Some("41.0"));
    assert_eq!(p2[0].sensor_type, "Tmp");
    Ok(())
}

#[test]
fn failing_file_is_reported_and_skipped() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let broken = plain(dir.path(), "TKY#101211124083000_Vib.csv", b"ID,P1\nName,Vibration\n")?;
    let good = plain(
        dir.path(),
        "TKY#101211124090000_Tmp.csv",
        b"ID,P1\nName,Vibration\nUnit,mm/s\n2024/11/21 09:00:00,0.7\n",
    )?;

    let sink = CollectingSink::new();
    let consolidated = consolidate_group(
        &group(vec![broken, good]),
        &NormalizeOptions::default(),
        &sink,
    );

    assert_eq!(consolidated.files_failed, 1);
    assert_eq!(consolidated.records.len(), 1);
    assert!(consolidated.records[0]
        .source_file
        .ends_with("TKY#101211124090000_Tmp.csv"));
    assert!(sink.events().iter().any(|e| matches!(
        e,
        IngestEvent::FileFailed { path, .. } if path.ends_with("TKY#101211124083000_Vib.csv")
    )));
    Ok(())
}

#[test]
fn group_with_no_usable_files_is_empty() {
    let meta = extract_metadata("TKY#101211124083000_Vib.csv", None).expect("metadata");
    let file = FileDescriptor::plain(meta, Path::new("/nonexistent/TKY#101211124083000_Vib.csv"));
    let sink = CollectingSink::new();

    let consolidated = consolidate_with(&group(vec![file]), &sink, |descriptor| {
        Err(NormalizeError::Decode {
            path: descriptor.display_path(),
            encoding: "UTF-8",
        })
    });

    assert!(consolidated.records.is_empty());
    assert_eq!(consolidated.parameters, 0);
    assert!(sink.events().iter().any(|e| matches!(
        e,
        IngestEvent::GroupConsolidated { rows: 0, files_failed: 1, .. }
    )));
}

#[test]
fn archive_member_is_read_and_tagged_with_entry_name() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let archive_path = dir.path().join("bundle.zip");
    let entry = "logs/TKY#101211124083000_Vib.csv";

    let mut writer = ZipWriter::new(File::create(&archive_path)?);
    writer.start_file(entry, FileOptions::default())?;
    writer.write_all(b"ID,P1\nName,Vibration\nUnit,mm/s\n2024/11/21 08:30:00,0.4\n")?;
    writer.finish()?;

    let meta = extract_metadata(entry, None).expect("metadata");
    let descriptor = FileDescriptor::archived(meta, &archive_path, entry);
    let records = normalize_file(&descriptor, &NormalizeOptions::default())?;

    assert_eq!(records.len(), 1);
    assert_eq!(records[0].source_file, entry);
    assert_eq!(records[0].parameter_name, "Vibration");
    assert_eq!(records[0].timestamp, Some(at(8, 30)));
    Ok(())
}

#[test]
fn shift_jis_content_is_decoded() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let text = "ID,P1,P2\n名称,温度,振動\n単位,℃,mm/s\n2024/11/21 08:30:00,25.5,0.1\n";
    let (bytes, _, had_errors) = encoding_rs::SHIFT_JIS.encode(text);
    assert!(!had_errors);
    let descriptor = plain(dir.path(), "TKY#101211124083000_Tmp.csv", &bytes)?;

    let options = NormalizeOptions::new("cp932", ',').expect("known encoding");
    let records = normalize_file(&descriptor, &options)?;

    assert_eq!(records.len(), 2);
    assert_eq!(records[0].parameter_name, "温度");
    assert_eq!(records[0].unit, "℃");
    assert_eq!(records[1].parameter_name, "振動");
    assert_eq!(records[1].unit, "mm/s");
    Ok(())
}

#[test]
fn invalid_bytes_fail_strict_decoding() {
    let encoding = resolve_encoding("utf-8").expect("utf-8");
    let err = decode(&[b'I', b'D', 0xff, 0xfe, b'\n'], encoding, "bad.csv").unwrap_err();
    assert!(matches!(err, NormalizeError::Decode { .. }));

    let decoded = decode("\u{feff}ID,P1".as_bytes(), encoding, "bom.csv").expect("decodes");
    assert_eq!(decoded, "ID,P1");
}

#[test]
fn encoding_aliases_resolve() {
    assert_eq!(resolve_encoding("shift_jis"), Some(encoding_rs::SHIFT_JIS));
    assert_eq!(resolve_encoding("CP932"), Some(encoding_rs::SHIFT_JIS));
    assert_eq!(resolve_encoding("utf_8"), Some(encoding_rs::UTF_8));
    assert!(resolve_encoding("klingon").is_none());
}
