//! Report output formats.

use std::fmt::Write;

use chrono::{DateTime, FixedOffset, NaiveDate, TimeDelta};
use serde::Serialize;
use thiserror::Error;

use crate::report::{Report, ReportEntry};
use crate::types::Category;

/// Rendering errors.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Output encoding for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
    /// Event list for calendar widgets.
    CalendarFeed,
}

impl ReportFormat {
    /// Maps a format name to a format; unknown names fall back to text.
    pub fn from_name(name: &str) -> Self {
        match name.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "fc" | "calendar" | "calendar-feed" => Self::CalendarFeed,
            _ => Self::Text,
        }
    }
}

/// Renders a report in the requested format.
pub fn render(report: &Report, format: ReportFormat) -> Result<String, RenderError> {
    match format {
        ReportFormat::Text => Ok(render_text(report)),
        ReportFormat::Json => Ok(serde_json::to_string_pretty(report)?),
        ReportFormat::CalendarFeed => render_calendar_feed(report),
    }
}

// ========== Calendar Feed ==========

#[derive(Debug, Serialize)]
struct FeedEntry<'a> {
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    title: &'a str,
    #[serde(rename = "classNames")]
    class_names: Vec<&'static str>,
}

impl<'a> From<&'a ReportEntry> for FeedEntry<'a> {
    fn from(entry: &'a ReportEntry) -> Self {
        let class_names = match entry.category {
            Category::Work => vec![],
            Category::Break => vec!["breakEntry"],
            Category::Ignore => vec!["ignoreEntry"],
        };
        Self {
            start: entry.start,
            end: entry.start + entry.duration,
            title: &entry.title,
            class_names,
        }
    }
}

fn render_calendar_feed(report: &Report) -> Result<String, RenderError> {
    let feed: Vec<FeedEntry<'_>> = report.entries.iter().map(FeedEntry::from).collect();
    Ok(serde_json::to_string_pretty(&feed)?)
}

// ========== Text ==========

/// Formats a duration as `Xh Ym`, or `Xm` below one hour.
/// Negative durations are shown as 0m.
pub fn format_duration(duration: TimeDelta) -> String {
    let total_minutes = duration.num_minutes().max(0);
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    if hours >= 1 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}

/// Groups entries by the calendar day they start on, in first-seen order.
fn group_by_day(entries: &[ReportEntry]) -> Vec<(NaiveDate, Vec<&ReportEntry>)> {
    let mut days: Vec<(NaiveDate, Vec<&ReportEntry>)> = Vec::new();
    for entry in entries {
        let day = entry.start.date_naive();
        match days.iter_mut().find(|(d, _)| *d == day) {
            Some((_, group)) => group.push(entry),
            None => days.push((day, vec![entry])),
        }
    }
    days
}

fn render_text(report: &Report) -> String {
    let mut output = String::new();

    writeln!(output, "Report Start: {}", report.from.format("%Y-%m-%d %H:%M")).unwrap();
    writeln!(output, "Report End:   {}", report.to.format("%Y-%m-%d %H:%M")).unwrap();

    if report.entries.is_empty() {
        writeln!(output).unwrap();
        writeln!(output, "No entries recorded in this period.").unwrap();
    }

    for (day, entries) in group_by_day(&report.entries) {
        writeln!(output).unwrap();
        writeln!(
            output,
            "----------------------- {} -----------------------",
            day.format("%A, %Y-%m-%d")
        )
        .unwrap();
        for entry in entries {
            writeln!(
                output,
                "({}) {}-{} -- {}",
                format_duration(entry.duration),
                entry.start.format("%H:%M"),
                entry.end.format("%H:%M"),
                entry.title
            )
            .unwrap();
        }
    }

    writeln!(output).unwrap();
    writeln!(output, "Total Work Hours:   {}", format_duration(report.totals.work)).unwrap();
    writeln!(output, "Total Break Hours:  {}", format_duration(report.totals.breaks)).unwrap();
    writeln!(output, "Total Ignore Hours: {}", format_duration(report.totals.ignored)).unwrap();

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::build;
    use crate::types::{EntryId, StoredEntry};
    use insta::assert_snapshot;

    fn ts(s: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(s).unwrap()
    }

    fn scenario_report() -> Report {
        let entries: Vec<StoredEntry> = [
            ("2024-01-01T09:00:00Z", "design ***"),
            ("2024-01-01T10:00:00Z", "code"),
            ("2024-01-01T12:00:00Z", "lunch **"),
            ("2024-01-02T09:00:00Z", "code"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (start, task))| StoredEntry {
            id: EntryId::new(format!("e{i}")).unwrap(),
            start_time: ts(start),
            task: (*task).to_string(),
        })
        .collect();
        build(&entries, ts("2024-01-01T00:00:00Z"), ts("2024-01-02T00:00:00Z")).unwrap()
    }

    // ========== Duration Formatting Tests ==========

    #[test]
    fn test_format_duration_hours_and_minutes() {
        assert_eq!(format_duration(TimeDelta::minutes(150)), "2h 30m");
        assert_eq!(format_duration(TimeDelta::hours(1)), "1h 0m");
    }

    #[test]
    fn test_format_duration_minutes_only() {
        assert_eq!(format_duration(TimeDelta::minutes(45)), "45m");
        assert_eq!(format_duration(TimeDelta::zero()), "0m");
        assert_eq!(format_duration(TimeDelta::seconds(2754)), "45m");
    }

    #[test]
    fn test_format_duration_negative_is_zero() {
        assert_eq!(format_duration(TimeDelta::hours(-1)), "0m");
    }

    // ========== Format Selection Tests ==========

    #[test]
    fn test_format_from_name() {
        assert_eq!(ReportFormat::from_name("json"), ReportFormat::Json);
        assert_eq!(ReportFormat::from_name("JSON"), ReportFormat::Json);
        assert_eq!(ReportFormat::from_name("fc"), ReportFormat::CalendarFeed);
        assert_eq!(ReportFormat::from_name("calendar"), ReportFormat::CalendarFeed);
        assert_eq!(ReportFormat::from_name("text"), ReportFormat::Text);
        assert_eq!(ReportFormat::from_name("yaml"), ReportFormat::Text);
        assert_eq!(ReportFormat::from_name(""), ReportFormat::Text);
    }

    // ========== Output Tests ==========

    #[test]
    fn test_calendar_feed_class_names() {
        let output = render(&scenario_report(), ReportFormat::CalendarFeed).unwrap();
        let feed: serde_json::Value = serde_json::from_str(&output).unwrap();
        let feed = feed.as_array().unwrap();

        assert_eq!(feed.len(), 4);
        assert_eq!(feed[0]["classNames"], serde_json::json!(["ignoreEntry"]));
        assert_eq!(feed[1]["classNames"], serde_json::json!([]));
        assert_eq!(feed[2]["classNames"], serde_json::json!(["breakEntry"]));
        assert_eq!(feed[2]["title"], "lunch");
        assert_eq!(feed[2]["start"], "2024-01-01T10:00:00+00:00");
        assert_eq!(feed[2]["end"], "2024-01-01T12:00:00+00:00");
        assert_eq!(feed[3]["start"], feed[3]["end"]);
    }

    #[test]
    fn test_json_contains_full_report() {
        let output = render(&scenario_report(), ReportFormat::Json).unwrap();
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();

        assert_eq!(json["from"], "2024-01-01T00:00:00+00:00");
        assert_eq!(json["to"], "2024-01-03T00:00:00+00:00");
        assert_eq!(json["totals"]["work"], 3_600_000);
        assert_eq!(json["totals"]["break"], 7_200_000);
        assert_eq!(json["entries"].as_array().unwrap().len(), 4);
        assert_eq!(json["entries"][0]["category"], "ignore");
        assert_eq!(json["entries"][1]["duration"], 3_600_000);
    }

    #[test]
    fn test_text_report() {
        let output = render(&scenario_report(), ReportFormat::Text).unwrap();
        assert_snapshot!(output, @r"
Report Start: 2024-01-01 00:00
Report End:   2024-01-03 00:00

----------------------- Monday, 2024-01-01 -----------------------
(0m) 09:00-09:00 -- design
(1h 0m) 09:00-10:00 -- code
(2h 0m) 10:00-12:00 -- lunch

----------------------- Tuesday, 2024-01-02 -----------------------
(0m) 09:00-09:00 -- code

Total Work Hours:   1h 0m
Total Break Hours:  2h 0m
Total Ignore Hours: 0m
");
    }

    #[test]
    fn test_text_day_headers_once_per_day() {
        let entries: Vec<StoredEntry> = [
            ("2024-01-02T09:00:00Z", "b1"),
            ("2024-01-01T09:00:00Z", "a1"),
            ("2024-01-02T10:00:00Z", "b2"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (start, task))| StoredEntry {
            id: EntryId::new(format!("e{i}")).unwrap(),
            start_time: ts(start),
            task: (*task).to_string(),
        })
        .collect();
        let report = build(&entries, ts("2024-01-01T00:00:00Z"), ts("2024-01-02T00:00:00Z")).unwrap();
        let output = render(&report, ReportFormat::Text).unwrap();

        assert_eq!(output.matches("Tuesday, 2024-01-02").count(), 1);
        assert_eq!(output.matches("Monday, 2024-01-01").count(), 1);
        let tuesday = output.find("Tuesday").unwrap();
        let monday = output.find("Monday").unwrap();
        assert!(tuesday < monday, "days keep encounter order");
        assert!(output.find("b2").unwrap() < monday, "b2 grouped under Tuesday");
    }

    #[test]
    fn test_text_empty_report() {
        let report = build(&[], ts("2024-01-01T00:00:00Z"), ts("2024-01-01T00:00:00Z")).unwrap();
        let output = render(&report, ReportFormat::Text).unwrap();
        assert!(output.contains("No entries recorded in this period."));
        assert!(output.contains("Total Work Hours:   0m"));
    }
}
