//! Core type definitions with validation.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Unknown category name.
    #[error("unknown category: {value}")]
    UnknownCategory { value: String },
}

/// Generates a validated string ID newtype with common trait implementations.
macro_rules! define_string_id {
    (
        $(#[$meta:meta])*
        $name:ident, $field_name:literal
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(String);

        impl $name {
            /// Creates a new ID after validation.
            pub fn new(id: impl Into<String>) -> Result<Self, ValidationError> {
                let id = id.into();
                if id.trim().is_empty() {
                    return Err(ValidationError::Empty { field: $field_name });
                }
                Ok(Self(id))
            }

            /// Returns the ID as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = ValidationError;

            fn try_from(value: String) -> Result<Self, Self::Error> {
                Self::new(value)
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_string_id!(
    /// A validated entry identifier.
    ///
    /// Entry IDs must be non-empty. New entries get a random UUID; IDs found
    /// in hand-edited files are taken verbatim.
    EntryId, "entry ID"
);

/// How the time leading up to an entry is accounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    #[default]
    Work,
    Break,
    Ignore,
}

impl Category {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "work",
            Self::Break => "break",
            Self::Ignore => "ignore",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "work" => Ok(Self::Work),
            "break" => Ok(Self::Break),
            "ignore" => Ok(Self::Ignore),
            _ => Err(ValidationError::UnknownCategory {
                value: s.to_string(),
            }),
        }
    }
}

/// One persisted task record.
///
/// `task` holds the title plus any trailing modifier markers exactly as they
/// were written; the category is re-derived from it by the parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub id: EntryId,
    #[serde(rename = "start")]
    pub start_time: DateTime<FixedOffset>,
    pub task: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_id_rejects_empty() {
        let err = EntryId::new("").unwrap_err();
        assert_eq!(err.to_string(), "entry ID cannot be empty");
        assert!(EntryId::new("   ").is_err());
    }

    #[test]
    fn entry_id_roundtrips_through_string() {
        let id = EntryId::new("abc-123").unwrap();
        let s: String = id.clone().into();
        assert_eq!(EntryId::try_from(s).unwrap(), id);
        assert_eq!(id.as_str(), "abc-123");
    }

    #[test]
    fn category_parses_known_names() {
        for category in [Category::Work, Category::Break, Category::Ignore] {
            let parsed: Category = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn category_rejects_unknown() {
        let err = "nap".parse::<Category>().unwrap_err();
        assert_eq!(err.to_string(), "unknown category: nap");
    }

    #[test]
    fn stored_entry_serializes_start_key() {
        let entry = StoredEntry {
            id: EntryId::new("e1").unwrap(),
            start_time: DateTime::parse_from_rfc3339("2024-01-01T09:00:00+01:00").unwrap(),
            task: "code".to_string(),
        };
        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["start"], "2024-01-01T09:00:00+01:00");
        assert_eq!(json["id"], "e1");
    }

    #[test]
    fn stored_entry_rejects_empty_id() {
        let json = r#"{"id": "", "start": "2024-01-01T09:00:00Z", "task": "code"}"#;
        let result: Result<StoredEntry, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }
}
