use std::path::Path;

use chrono::{Duration, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::model::FilenameMetadata;

/// Longest window, in hours, a single file is assumed to cover.
pub const SESSION_HOURS: i64 = 2;

static FILENAME_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?P<plant_code>[A-Z]+)#(?P<machine_code>\d+)(?P<date>\d{6})(?P<time>\d{6})_(?P<sensor_type>[^.]+)\.(?i:csv|zip)$",
    )
    .expect("filename pattern compiles")
});

/// Parses `<PLANT>#<MACHINE><DDMMYY><HHMMSS>_<SENSOR>.<csv|zip>`.
///
/// Only the last path component is inspected, so archive entry names with folders work
/// unchanged. Returns `None` for anything that does not follow the naming contract,
/// including names whose digits do not form a real calendar date.
///
/// `modified` caps the window: the file cannot have been recording after it was last
/// written. Without it the window is the fixed [`SESSION_HOURS`].
pub fn extract_metadata(
    file_name: &str,
    modified: Option<NaiveDateTime>,
) -> Option<FilenameMetadata> {
    let base = Path::new(file_name)
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or(file_name);
    let captures = FILENAME_PATTERN.captures(base)?;

    let stamp = format!("{}{}", &captures["date"], &captures["time"]);
    let start_time = NaiveDateTime::parse_from_str(&stamp, "%d%m%y%H%M%S").ok()?;

    Some(FilenameMetadata {
        plant_code: captures["plant_code"].to_string(),
        machine_code: captures["machine_code"].to_string(),
        sensor_type: captures["sensor_type"].to_string(),
        start_time,
        end_time: session_end(start_time, modified),
    })
}

fn session_end(start_time: NaiveDateTime, modified: Option<NaiveDateTime>) -> NaiveDateTime {
    let nominal_end = start_time + Duration::hours(SESSION_HOURS);
    match modified {
        // a write stamp older than the name's own stamp still yields an empty, valid window
        Some(modified) => nominal_end.min(modified).max(start_time),
        None => nominal_end,
    }
}
