//! Conversion from the legacy line-based log.
//!
//! Each legacy line is `YYYY-M-D H:M<whitespace>task`, local time, with
//! optional leading zeros. Blank lines separated days.

use std::io::{self, BufRead};

use chrono::{Local, NaiveDateTime, TimeZone};
use omw_core::{EntryId, StoredEntry};
use uuid::Uuid;

const LEGACY_TIMESTAMP: &str = "%Y-%m-%d %H:%M";

/// Reads legacy log lines into entries with fresh IDs.
///
/// Lines without a task or with an unreadable timestamp are skipped.
pub fn convert(reader: impl BufRead) -> io::Result<Vec<StoredEntry>> {
    let mut entries = Vec::new();

    for (number, line) in reader.lines().enumerate() {
        let line = line?;
        match convert_line(&line) {
            Some(entry) => entries.push(entry),
            None if line.trim().is_empty() => {}
            None => tracing::warn!(line = number + 1, "skipping unreadable legacy line"),
        }
    }

    Ok(entries)
}

fn convert_line(line: &str) -> Option<StoredEntry> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < 3 {
        return None;
    }

    let stamp = format!("{} {}", fields[0], fields[1]);
    let naive = NaiveDateTime::parse_from_str(&stamp, LEGACY_TIMESTAMP).ok()?;
    let start_time = Local.from_local_datetime(&naive).earliest()?.fixed_offset();

    Some(StoredEntry {
        id: EntryId::new(Uuid::new_v4().to_string()).ok()?,
        start_time,
        task: fields[2..].join(" "),
    })
}

/// Renders entries as an entry file.
pub fn to_toml(entries: &[StoredEntry]) -> Result<String, toml::ser::Error> {
    crate::format::encode(entries)
}
