//! TOML encoding of the entry file.
//!
//! ```toml
//! [[entries]]
//! id = "5b1e0c8e-..."
//! start = "2024-01-01T09:00:00+01:00"
//! task = "code review"
//! ```
//!
//! The file is meant to be edited by hand, so decoding is per record: a
//! record that can't be decoded is logged and skipped. When a hand edit breaks
//! the TOML syntax of one record, the file is re-read one `[[entries]]` block
//! at a time so the other records survive.

use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
use omw_core::{EntryId, StoredEntry};
use serde::{Deserialize, Serialize};
use toml::Value;

#[derive(Serialize)]
struct Document<'a> {
    entries: &'a [StoredEntry],
}

#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    entries: Vec<Value>,
}

/// Encodes entries as `[[entries]]` tables.
pub fn encode(entries: &[StoredEntry]) -> Result<String, toml::ser::Error> {
    toml::to_string(&Document { entries })
}

const RECORD_HEADER: &str = "[[entries]]";

/// Decodes every well-formed record of an entry file, in file order.
///
/// Fails only when the text is not TOML and no `[[entries]]` block in it can
/// be read on its own.
pub fn decode(content: &str) -> Result<Vec<StoredEntry>, toml::de::Error> {
    match toml::from_str::<RawDocument>(content) {
        Ok(document) => Ok(decode_records(&document.entries)),
        Err(err) => {
            tracing::warn!(%err, "entry file is not valid TOML, reading records one by one");
            decode_blocks(content).ok_or(err)
        }
    }
}

fn decode_records(values: &[Value]) -> Vec<StoredEntry> {
    values
        .iter()
        .enumerate()
        .filter_map(|(index, value)| match decode_entry(value) {
            Ok(entry) => Some(entry),
            Err(reason) => {
                tracing::warn!(index, reason, "skipping malformed entry");
                None
            }
        })
        .collect()
}

/// Decodes each `[[entries]]` block separately, skipping blocks that don't
/// parse. `None` when no block parses.
fn decode_blocks(content: &str) -> Option<Vec<StoredEntry>> {
    let mut entries = Vec::new();
    let mut readable = false;

    for (block, text) in split_blocks(content).into_iter().enumerate() {
        let is_record = text.trim_start().starts_with(RECORD_HEADER);
        match toml::from_str::<RawDocument>(&text) {
            Ok(document) => {
                readable |= is_record;
                entries.extend(decode_records(&document.entries));
            }
            Err(err) => tracing::warn!(block, %err, "skipping unreadable record"),
        }
    }

    readable.then_some(entries)
}

/// Splits text before every `[[entries]]` header line. Text ahead of the first
/// header is its own block.
fn split_blocks(content: &str) -> Vec<String> {
    let mut blocks: Vec<String> = vec![String::new()];
    for line in content.split_inclusive('\n') {
        if line.trim_start().starts_with(RECORD_HEADER) {
            blocks.push(String::new());
        }
        if let Some(block) = blocks.last_mut() {
            block.push_str(line);
        }
    }
    blocks.retain(|block| !block.trim().is_empty());
    blocks
}

fn decode_entry(value: &Value) -> Result<StoredEntry, &'static str> {
    let table = value.as_table().ok_or("entry is not a table")?;

    let id = table
        .get("id")
        .and_then(Value::as_str)
        .ok_or("missing id")?;
    let id = EntryId::new(id).map_err(|_| "empty id")?;

    let start_time = table
        .get("start")
        .ok_or("missing start")
        .and_then(|start| decode_timestamp(start).ok_or("invalid start"))?;

    // An empty task is kept; reports skip it.
    let task = match table.get("task") {
        None => String::new(),
        Some(Value::String(task)) => task.clone(),
        Some(_) => return Err("task is not a string"),
    };

    Ok(StoredEntry {
        id,
        start_time,
        task,
    })
}

/// Accepts RFC 3339 strings and native TOML datetimes. Timestamps without an
/// offset are read as local time.
fn decode_timestamp(value: &Value) -> Option<DateTime<FixedOffset>> {
    let text = match value {
        Value::String(s) => s.clone(),
        Value::Datetime(dt) => dt.to_string(),
        _ => return None,
    };
    let text = text.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt);
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.fixed_offset())
}
