//! Report computation.
//!
//! Entries only carry the moment a task ended, so the time spent on a task is
//! the span since the previous entry. The span never crosses a calendar day:
//! the first entry of each day starts a fresh span of zero length, so a
//! forgotten sign-off does not turn into a task lasting all night.

use chrono::{DateTime, FixedOffset, Local, LocalResult, NaiveDate, NaiveTime, TimeDelta, TimeZone};
use serde::{Serialize, Serializer};
use thiserror::Error;

use crate::parser::{self, ParseError};
use crate::types::{Category, EntryId, StoredEntry};

/// Errors that abort a report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    /// An entry in range is marked as both break and ignore.
    #[error("entry {id} at {timestamp} is marked as both break and ignore: {task:?}")]
    CategoryConflict {
        id: EntryId,
        timestamp: DateTime<FixedOffset>,
        task: String,
    },
    /// The day after the requested end date is not representable.
    #[error("report range ending {to} is out of range")]
    OutOfRange { to: DateTime<FixedOffset> },
}

fn serialize_millis<S: Serializer>(duration: &TimeDelta, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_i64(duration.num_milliseconds())
}

/// Elapsed time per category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Totals {
    #[serde(serialize_with = "serialize_millis")]
    pub work: TimeDelta,
    #[serde(rename = "break", serialize_with = "serialize_millis")]
    pub breaks: TimeDelta,
    #[serde(rename = "ignore", serialize_with = "serialize_millis")]
    pub ignored: TimeDelta,
}

impl Default for Totals {
    fn default() -> Self {
        Self {
            work: TimeDelta::zero(),
            breaks: TimeDelta::zero(),
            ignored: TimeDelta::zero(),
        }
    }
}

impl Totals {
    fn add(&mut self, category: Category, duration: TimeDelta) {
        let slot = match category {
            Category::Work => &mut self.work,
            Category::Break => &mut self.breaks,
            Category::Ignore => &mut self.ignored,
        };
        *slot += duration;
    }

    /// Returns the total for one category.
    pub const fn get(&self, category: Category) -> TimeDelta {
        match category {
            Category::Work => self.work,
            Category::Break => self.breaks,
            Category::Ignore => self.ignored,
        }
    }

    /// Sum over all categories.
    pub fn sum(&self) -> TimeDelta {
        self.work + self.breaks + self.ignored
    }
}

/// One task as it appears in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportEntry {
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    #[serde(serialize_with = "serialize_millis")]
    pub duration: TimeDelta,
    pub title: String,
    pub category: Category,
}

/// Totals and entries for a time window.
///
/// `to` is the effective upper bound, one day past the requested end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub from: DateTime<FixedOffset>,
    pub to: DateTime<FixedOffset>,
    pub totals: Totals,
    pub entries: Vec<ReportEntry>,
}

/// State carried from one entry to the next.
#[derive(Debug, Default)]
struct Accumulator {
    cursor: Option<DateTime<FixedOffset>>,
    totals: Totals,
    entries: Vec<ReportEntry>,
}

impl Accumulator {
    fn push(mut self, entry: &StoredEntry) -> Result<Self, BuildError> {
        let parsed = match parser::parse(&entry.task) {
            Ok(parsed) => parsed,
            Err(ParseError::CategoryConflict { .. }) => {
                return Err(BuildError::CategoryConflict {
                    id: entry.id.clone(),
                    timestamp: entry.start_time,
                    task: entry.task.clone(),
                });
            }
            Err(err) => {
                tracing::debug!(id = %entry.id, task = %entry.task, %err, "skipping unparsable entry");
                return Ok(self);
            }
        };

        let end = entry.start_time;
        // Out-of-order entries restart the span like a new day does.
        let start = match self.cursor {
            Some(previous) if previous.date_naive() == end.date_naive() && previous <= end => {
                previous
            }
            _ => end,
        };
        let duration = end - start;

        self.cursor = Some(end);
        self.totals.add(parsed.category, duration);
        self.entries.push(ReportEntry {
            start,
            end,
            duration,
            title: parsed.title,
            category: parsed.category,
        });
        Ok(self)
    }
}

/// Builds a report over entries between `from` and the end of the day `to`.
///
/// Both bounds are inclusive. Entries are taken in stored order; unparsable
/// entries are skipped, an entry with conflicting markers fails the build.
pub fn build(
    entries: &[StoredEntry],
    from: DateTime<FixedOffset>,
    to: DateTime<FixedOffset>,
) -> Result<Report, BuildError> {
    let to = to
        .checked_add_signed(TimeDelta::hours(24))
        .ok_or(BuildError::OutOfRange { to })?;

    let acc = entries
        .iter()
        .filter(|entry| entry.start_time >= from && entry.start_time <= to)
        .try_fold(Accumulator::default(), Accumulator::push)?;

    tracing::debug!(entries = acc.entries.len(), %from, %to, "built report");

    Ok(Report {
        from,
        to,
        totals: acc.totals,
        entries: acc.entries,
    })
}

/// Converts a local date at midnight to a timestamp.
/// Handles DST ambiguity by picking the earlier time.
pub fn local_midnight(date: NaiveDate) -> DateTime<FixedOffset> {
    let midnight = date.and_time(NaiveTime::MIN);
    match Local.from_local_datetime(&midnight) {
        // Single or ambiguous (DST fall-back): use the earlier time
        LocalResult::Single(dt) | LocalResult::Ambiguous(dt, _) => dt.fixed_offset(),
        LocalResult::None => {
            // Midnight skipped by a spring-forward; 01:00 exists
            midnight
                .checked_add_signed(TimeDelta::hours(1))
                .and_then(|one_am| Local.from_local_datetime(&one_am).earliest())
                .map_or_else(|| midnight.and_utc().fixed_offset(), |dt| dt.fixed_offset())
        }
    }
}
