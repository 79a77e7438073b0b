use std::fs::File;
use std::path::Path;

use polars::prelude::*;
use senslog_parser::LongRecord;

use crate::error::ExportError;

/// Builds a DataFrame with the persisted column order and a microsecond timestamp column.
pub fn records_to_frame(records: &[LongRecord]) -> PolarsResult<DataFrame> {
    let timestamps: Vec<Option<i64>> = records
        .iter()
        .map(|r| r.timestamp.map(|ts| ts.and_utc().timestamp_micros()))
        .collect();
    let timestamp = Series::new("timestamp".into(), timestamps)
        .cast(&DataType::Datetime(TimeUnit::Microseconds, None))?;

    let values: Vec<Option<&str>> = records.iter().map(|r| r.value.as_deref()).collect();

    DataFrame::new(vec![
        timestamp.into(),
        text_column(
            "parameter_id",
            records.iter().map(|r| r.parameter_id.as_str()).collect(),
        ),
        text_column(
            "parameter_name",
            records.iter().map(|r| r.parameter_name.as_str()).collect(),
        ),
        text_column("unit", records.iter().map(|r| r.unit.as_str()).collect()),
        Series::new("value".into(), values).into(),
        text_column(
            "source_file",
            records.iter().map(|r| r.source_file.as_str()).collect(),
        ),
        text_column(
            "sensor_type",
            records.iter().map(|r| r.sensor_type.as_str()).collect(),
        ),
    ])
}

fn text_column(name: &str, values: Vec<&str>) -> Column {
    Series::new(name.into(), values).into()
}

pub fn write_parquet(path: &Path, records: &[LongRecord]) -> Result<(), ExportError> {
    let mut df = records_to_frame(records)?;
    let file = File::create(path)?;
    ParquetWriter::new(file).finish(&mut df)?;
    Ok(())
}
