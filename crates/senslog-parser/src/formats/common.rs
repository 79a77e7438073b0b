use chrono::{DateTime, Local, NaiveDate, NaiveDateTime};

/// Removes every trailing `delimiter` from each line.
///
/// Loggers emit a dangling separator at the end of each row; left in place it adds a
/// phantom empty column to every line that has one.
pub(crate) fn strip_trailing_delimiters(content: &str, delimiter: char) -> String {
    let mut cleaned = String::with_capacity(content.len());
    for line in content.lines() {
        cleaned.push_str(line.trim_end_matches(delimiter));
        cleaned.push('\n');
    }
    cleaned
}

/// Best-effort timestamp parse; `None` means the cell is not a recognizable time.
///
/// Values carrying a UTC offset or `Z` are converted to naive local time.
pub(crate) fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    static DATETIME_FORMATS: &[&str] = &[
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S",
        "%Y/%m/%d %H:%M",
        "%Y/%m/%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%d/%m/%Y %H:%M:%S",
        "%d/%m/%Y %H:%M",
    ];
    static OFFSET_FORMATS: &[&str] = &[
        "%Y-%m-%d %H:%M:%S%.f%:z",
        "%Y-%m-%d %H:%M:%S%.f%z",
        "%Y/%m/%d %H:%M:%S%.f%:z",
        "%Y/%m/%d %H:%M:%S%.f%z",
    ];
    static DATE_FORMATS: &[&str] = &["%Y/%m/%d", "%Y-%m-%d", "%d/%m/%Y"];

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
    {
        return Some(dt);
    }
    if let Some(dt) = DateTime::parse_from_rfc3339(trimmed).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|fmt| DateTime::parse_from_str(trimmed, fmt).ok())
    }) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(trimmed, fmt).ok())
        .and_then(|date| date.and_hms_opt(0, 0, 0))
}
