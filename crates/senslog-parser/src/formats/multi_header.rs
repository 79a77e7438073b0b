use std::collections::HashSet;

use csv::StringRecord;

use crate::errors::TableError;
use crate::model::{LongRecord, ParameterKey, RecordSource};

use super::{parse_timestamp, strip_trailing_delimiters};

const HEADER_LABELS: [&str; 3] = ["parameter id", "parameter name", "unit"];

/// A data column that survived header filtering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderColumn {
    pub index: usize,
    pub key: ParameterKey,
    /// Header cells exactly as read; duplicate detection compares these.
    pub raw: [String; 3],
}

/// Reader for the three-row-header layout: parameter id, parameter name, unit.
///
/// Column 0 is the timestamp axis; every other column is one parameter.
#[derive(Debug, Clone, Copy)]
pub struct MultiHeaderTable {
    delimiter: u8,
}

impl Default for MultiHeaderTable {
    fn default() -> Self {
        Self { delimiter: b',' }
    }
}

impl MultiHeaderTable {
    pub fn new(delimiter: char) -> Result<Self, TableError> {
        if !delimiter.is_ascii() || matches!(delimiter, '\n' | '\r' | '"') {
            return Err(TableError::InvalidDelimiter(delimiter));
        }
        Ok(Self {
            delimiter: delimiter as u8,
        })
    }

    pub fn delimiter(&self) -> char {
        self.delimiter as char
    }

    /// Reshapes a wide table into long records, one per (data row, surviving column).
    pub fn normalize(
        &self,
        content: &str,
        source: RecordSource<'_>,
    ) -> Result<Vec<LongRecord>, TableError> {
        let cleaned = strip_trailing_delimiters(content, self.delimiter());
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .delimiter(self.delimiter)
            .from_reader(cleaned.as_bytes());
        let mut records = reader.records();

        let mut header_rows = Vec::with_capacity(HEADER_LABELS.len());
        for (row_index, label) in HEADER_LABELS.into_iter().enumerate() {
            let row = records
                .next()
                .ok_or(TableError::MissingHeader {
                    row_index: row_index + 1,
                    label,
                })?
                .map_err(|err| TableError::Csv {
                    line_index: row_index + 1,
                    source: err,
                })?;
            header_rows.push(row);
        }

        let width = header_rows.iter().map(StringRecord::len).max().unwrap_or(0);
        let columns = retain_parameter_columns(parse_header(&header_rows, width));

        let mut output = Vec::new();
        for record in records {
            let record = record.map_err(|err| TableError::Csv {
                line_index: err.position().map(|pos| pos.line() as usize).unwrap_or(0),
                source: err,
            })?;
            let line_index = record
                .position()
                .map(|pos| pos.line() as usize)
                .unwrap_or(0);

            if record.len() > width {
                return Err(TableError::DataRow {
                    line_index,
                    message: format!(
                        "expected at most {width} fields but found {}",
                        record.len()
                    ),
                });
            }

            let timestamp = record.get(0).and_then(parse_timestamp);
            for column in &columns {
                let value = record
                    .get(column.index)
                    .filter(|cell| !cell.is_empty())
                    .map(str::to_string);
                output.push(LongRecord {
                    timestamp,
                    parameter_id: column.key.id.clone(),
                    parameter_name: column.key.name.clone(),
                    unit: column.key.unit.clone(),
                    value,
                    source_file: source.source_file.to_string(),
                    sensor_type: source.sensor_type.to_string(),
                });
            }
        }

        Ok(output)
    }
}

/// Builds one key per data column. Short header rows are padded with empty levels.
pub fn parse_header(rows: &[StringRecord], width: usize) -> Vec<HeaderColumn> {
    (1..width)
        .map(|index| {
            let raw = [0, 1, 2].map(|row| header_level(rows, row, index).to_string());
            HeaderColumn {
                index,
                key: ParameterKey::new(raw[0].as_str(), raw[1].as_str(), raw[2].as_str()),
                raw,
            }
        })
        .collect()
}

fn header_level(rows: &[StringRecord], row: usize, index: usize) -> &str {
    rows.get(row)
        .and_then(|record| record.get(index))
        .unwrap_or("")
}

/// Drops placeholder columns and repeated headers, keeping the first occurrence.
///
/// Repeats are judged on the untrimmed cells, so ` P1 ` and `P1` are distinct columns even
/// though both emit records under the id `P1`.
pub fn retain_parameter_columns(columns: Vec<HeaderColumn>) -> Vec<HeaderColumn> {
    let mut seen = HashSet::new();
    columns
        .into_iter()
        .filter(|column| !column.key.is_placeholder())
        .filter(|column| seen.insert(column.raw.clone()))
        .collect()
}
