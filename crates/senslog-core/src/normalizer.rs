use std::fs::{self, File};
use std::io::Read;

use encoding_rs::Encoding;
use senslog_parser::{LongRecord, MultiHeaderTable, RecordSource};
use zip::ZipArchive;

use crate::error::NormalizeError;
use crate::types::FileDescriptor;

/// Looks up an encoding by label, accepting the spellings common in config files
/// (`shift_jis`, `cp932`, `utf_8`, ...).
pub fn resolve_encoding(label: &str) -> Option<&'static Encoding> {
    let normalized = label.trim().to_ascii_lowercase();
    let alias = match normalized.as_str() {
        "cp932" | "ms-932" | "windows-932" => "windows-31j",
        other => other,
    };
    Encoding::for_label(alias.as_bytes())
        .or_else(|| Encoding::for_label(alias.replace('_', "-").as_bytes()))
}

/// How raw bytes become long records.
#[derive(Debug, Clone, Copy)]
pub struct NormalizeOptions {
    pub encoding: &'static Encoding,
    pub table: MultiHeaderTable,
}

impl NormalizeOptions {
    pub fn new(encoding_label: &str, delimiter: char) -> Option<Self> {
        let encoding = resolve_encoding(encoding_label)?;
        let table = MultiHeaderTable::new(delimiter).ok()?;
        Some(Self { encoding, table })
    }
}

impl Default for NormalizeOptions {
    fn default() -> Self {
        Self {
            encoding: encoding_rs::UTF_8,
            table: MultiHeaderTable::default(),
        }
    }
}

/// Raw bytes of a descriptor, from its archive member when it has one.
pub fn read_raw(descriptor: &FileDescriptor) -> Result<Vec<u8>, NormalizeError> {
    let path = descriptor.display_path();
    match (&descriptor.source_archive_path, &descriptor.internal_path) {
        (Some(archive_path), Some(internal_path)) => {
            let file = File::open(archive_path).map_err(|source| NormalizeError::Io {
                path: path.clone(),
                source,
            })?;
            let mut archive = ZipArchive::new(file).map_err(|source| NormalizeError::Archive {
                path: path.clone(),
                source,
            })?;
            let mut entry =
                archive
                    .by_name(internal_path)
                    .map_err(|source| NormalizeError::Archive {
                        path: path.clone(),
                        source,
                    })?;
            let mut bytes = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
            entry
                .read_to_end(&mut bytes)
                .map_err(|source| NormalizeError::Io { path, source })?;
            Ok(bytes)
        }
        _ => fs::read(&descriptor.source_file_path)
            .map_err(|source| NormalizeError::Io { path, source }),
    }
}

/// Strict decode: any malformed sequence fails the file. A leading BOM is dropped.
pub fn decode(
    bytes: &[u8],
    encoding: &'static Encoding,
    path: &str,
) -> Result<String, NormalizeError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors {
        return Err(NormalizeError::Decode {
            path: path.to_string(),
            encoding: encoding.name(),
        });
    }
    let text = text.as_ref();
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text).to_string())
}

/// Reads, decodes and reshapes one file into long records.
pub fn normalize_file(
    descriptor: &FileDescriptor,
    options: &NormalizeOptions,
) -> Result<Vec<LongRecord>, NormalizeError> {
    let path = descriptor.display_path();
    let bytes = read_raw(descriptor)?;
    let text = decode(&bytes, options.encoding, &path)?;

    let source_file = descriptor.source_file();
    let source = RecordSource {
        source_file: &source_file,
        sensor_type: &descriptor.sensor_type,
    };
    options
        .table
        .normalize(&text, source)
        .map_err(|source| NormalizeError::Table { path, source })
}
