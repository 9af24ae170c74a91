//! Task text parsing.
//!
//! Task text is a title followed by an optional run of category markers:
//!
//! ```text
//! task   := title (ws* marker (ws+ marker)*)? rest
//! title  := title-char+            (trailing whitespace trimmed)
//! marker := "**" | "***"
//! ```
//!
//! Title characters are alphanumerics, whitespace and `, . _ + : @ % / -`.
//! `**` marks a break, `***` marks time to ignore, no marker means work.
//! Anything after the title that does not start with `*` is not part of the
//! task and is dropped.

use thiserror::Error;

use crate::types::Category;

const TITLE_PUNCTUATION: &[char] = &[',', '.', '_', '+', ':', '@', '%', '/', '-'];

/// Marker appended to break entries.
pub const BREAK_MARKER: &str = "**";
/// Marker appended to ignored entries.
pub const IGNORE_MARKER: &str = "***";

/// Errors produced while parsing task text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Nothing but whitespace.
    #[error("task text is empty")]
    Empty,

    /// The text starts with a character that cannot begin a title.
    #[error("unexpected character {found:?}, expected a task title")]
    InvalidCharacter { found: char },

    /// A run of `*` that is neither a break nor an ignore marker.
    #[error("unknown modifier {marker:?}, expected ** (break) or *** (ignore)")]
    UnknownModifier { marker: String },

    /// Both break and ignore markers on one task.
    #[error("task {title:?} is marked as both break and ignore")]
    CategoryConflict { title: String },
}

/// A task title with its category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTask {
    pub title: String,
    pub category: Category,
}

fn is_title_char(c: char) -> bool {
    c.is_alphanumeric() || c.is_whitespace() || TITLE_PUNCTUATION.contains(&c)
}

/// Parses raw task text into a title and category.
pub fn parse(raw: &str) -> Result<ParsedTask, ParseError> {
    let text = raw.trim();
    let Some(first) = text.chars().next() else {
        return Err(ParseError::Empty);
    };

    let title_end = text.find(|c: char| !is_title_char(c)).unwrap_or(text.len());
    let title = text[..title_end].trim_end();
    if title.is_empty() {
        return Err(ParseError::InvalidCharacter { found: first });
    }

    let rest = &text[title_end..];
    let category = if rest.starts_with('*') {
        lex_markers(title, rest)?
    } else {
        Category::Work
    };

    Ok(ParsedTask {
        title: title.to_string(),
        category,
    })
}

/// Reads consecutive markers from the start of `rest`.
///
/// Repeating a marker is harmless; mixing break and ignore is a conflict.
fn lex_markers(title: &str, rest: &str) -> Result<Category, ParseError> {
    let mut category: Option<Category> = None;

    for token in rest.split_whitespace() {
        let stars = token.chars().take_while(|&c| c == '*').count();
        if stars == 0 {
            break;
        }

        let marker = &token[..stars];
        let found = match marker {
            BREAK_MARKER => Category::Break,
            IGNORE_MARKER => Category::Ignore,
            _ => {
                return Err(ParseError::UnknownModifier {
                    marker: marker.to_string(),
                });
            }
        };

        match category {
            Some(existing) if existing != found => {
                return Err(ParseError::CategoryConflict {
                    title: title.to_string(),
                });
            }
            _ => category = Some(found),
        }

        // "**lunch" ends the marker run
        if stars < token.len() {
            break;
        }
    }

    Ok(category.unwrap_or_default())
}

/// Builds the stored text for a title in the given category.
pub fn format_task(title: &str, category: Category) -> String {
    match category {
        Category::Work => title.to_string(),
        Category::Break => format!("{title} {BREAK_MARKER}"),
        Category::Ignore => format!("{title} {IGNORE_MARKER}"),
    }
}
