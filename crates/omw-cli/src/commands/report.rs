//! Report command for summarizing logged time.

use std::io::Write;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use omw_core::{Report, ReportFormat};
use omw_store::{Clock, EntryStore, ResourceLock};

use super::util::parse_date;

/// Inclusive range of calendar days to report on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Period {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Names of the report bounds on the command line.
pub const CLI_BOUNDS: [&str; 2] = ["--from", "--to"];

/// Names of the report bounds in an HTTP query.
pub const QUERY_BOUNDS: [&str; 2] = ["start", "end"];

impl Period {
    /// Resolves the bounds; a missing bound means `today`.
    ///
    /// `names` labels the two bounds in error messages.
    pub fn resolve(
        from: Option<&str>,
        to: Option<&str>,
        today: NaiveDate,
        names: [&str; 2],
    ) -> Result<Self> {
        let [from_name, to_name] = names;
        let from = from
            .map(|s| parse_date(s, today))
            .transpose()
            .with_context(|| format!("invalid {from_name}"))?
            .unwrap_or(today);
        let to = to
            .map(|s| parse_date(s, today))
            .transpose()
            .with_context(|| format!("invalid {to_name}"))?
            .unwrap_or(today);

        if to < from {
            anyhow::bail!("report ends ({to}) before it starts ({from})");
        }

        Ok(Self { from, to })
    }
}

/// Builds the report for `period` from the store's current contents.
pub fn generate<L: ResourceLock, C: Clock>(
    store: &EntryStore<L, C>,
    period: Period,
) -> Result<Report> {
    let entries = store.read_all()?;
    tracing::debug!(count = entries.len(), ?period, "building report");

    let report = omw_core::build(
        &entries,
        omw_core::local_midnight(period.from),
        omw_core::local_midnight(period.to),
    )
    .context("failed to build report")?;
    Ok(report)
}

pub fn run<W, L, C>(
    writer: &mut W,
    store: &EntryStore<L, C>,
    period: Period,
    format: ReportFormat,
) -> Result<()>
where
    W: Write,
    L: ResourceLock,
    C: Clock,
{
    let report = generate(store, period)?;
    let output = omw_core::render(&report, format)?;

    writer.write_all(output.as_bytes())?;
    if !output.ends_with('\n') {
        writeln!(writer)?;
    }
    Ok(())
}
