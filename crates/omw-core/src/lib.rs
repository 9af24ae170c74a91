//! Core domain logic for the omw time tracker.
//!
//! This crate contains the fundamental types and logic for:
//! - Parsing: extracting a task title and category from free-form text
//! - Reports: reconstructing per-task durations from entry timestamps
//! - Rendering: text, JSON and calendar-feed output

pub mod parser;
pub mod render;
pub mod report;
mod types;

pub use parser::{BREAK_MARKER, IGNORE_MARKER, ParseError, ParsedTask, format_task, parse};
pub use render::{RenderError, ReportFormat, format_duration, render};
pub use report::{BuildError, Report, ReportEntry, Totals, build, local_midnight};
pub use types::{Category, EntryId, StoredEntry, ValidationError};
