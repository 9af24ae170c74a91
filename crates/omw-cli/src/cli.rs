//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use omw_core::ReportFormat;

/// Out of My Way: a plain-text log of what you just finished.
///
/// Each entry records the moment a task ended. Reports turn the gaps between
/// entries into time spent on each task.
#[derive(Debug, Parser)]
#[command(name = "omw", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Record a task you just finished.
    #[command(visible_alias = "a")]
    Add {
        /// Task description; append `**` for a break or `***` to ignore it.
        #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
        task: Vec<String>,
    },

    /// Start the day. Time before this entry is not counted.
    #[command(visible_alias = "h")]
    Hello,

    /// Record that you just finished a break.
    #[command(visible_alias = "b")]
    Break,

    /// Record time that should not count at all.
    #[command(visible_alias = "i")]
    Ignore,

    /// Continue the last task up to now.
    #[command(visible_alias = "s")]
    Stretch,

    /// Summarize time spent between two dates.
    #[command(visible_alias = "r")]
    Report {
        /// First day to include (YYYY-MM-DD, `today`, `yesterday`, `N days ago`).
        #[arg(short, long)]
        from: Option<String>,

        /// Last day to include. Defaults to today.
        #[arg(short, long)]
        to: Option<String>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Open the entry file in your editor.
    #[command(visible_alias = "e")]
    Edit,

    /// Serve commands over HTTP on the loopback interface.
    Server,

    /// Convert a legacy text log to the entry file format.
    Convert {
        /// Legacy log to read.
        path: PathBuf,
    },
}

/// Report formats selectable on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    /// Calendar feed events (`fc` for short).
    #[value(alias = "fc")]
    Calendar,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Text => Self::Text,
            OutputFormat::Json => Self::Json,
            OutputFormat::Calendar => Self::CalendarFeed,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_add_collects_words() {
        let cli = Cli::parse_from(["omw", "add", "lunch", "**"]);
        match cli.command {
            Some(Commands::Add { task }) => assert_eq!(task, vec!["lunch", "**"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_add_requires_task() {
        assert!(Cli::try_parse_from(["omw", "add"]).is_err());
    }

    #[test]
    fn test_short_aliases() {
        let cli = Cli::parse_from(["omw", "b"]);
        assert!(matches!(cli.command, Some(Commands::Break)));
        let cli = Cli::parse_from(["omw", "s"]);
        assert!(matches!(cli.command, Some(Commands::Stretch)));
    }

    #[test]
    fn test_report_format_alias() {
        let cli = Cli::parse_from(["omw", "report", "--format", "fc", "--from", "2024-01-01"]);
        match cli.command {
            Some(Commands::Report { from, to, format }) => {
                assert_eq!(from.as_deref(), Some("2024-01-01"));
                assert_eq!(to, None);
                assert_eq!(ReportFormat::from(format), ReportFormat::CalendarFeed);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::parse_from(["omw", "hello", "-v", "--config", "/tmp/omw.toml"]);
        assert!(cli.verbose);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/omw.toml")));
    }
}
