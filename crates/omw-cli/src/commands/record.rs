//! Commands that append an entry: add, hello, break, ignore, stretch.

use std::io::Write;

use anyhow::{Context, Result};
use omw_core::StoredEntry;
use omw_store::{Clock, EntryStore, ResourceLock};

/// Which entry to append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action<'a> {
    Add(&'a [String]),
    Hello,
    Break,
    Ignore,
    Stretch,
}

pub fn run<W, L, C>(writer: &mut W, store: &EntryStore<L, C>, action: Action<'_>) -> Result<()>
where
    W: Write,
    L: ResourceLock,
    C: Clock,
{
    let entry = match action {
        Action::Add(words) => {
            let task = words.join(" ");
            store
                .append(&task)
                .with_context(|| format!("failed to add {task:?}"))?
        }
        Action::Hello => store.hello().context("failed to start the day")?,
        Action::Break => store.add_break().context("failed to record break")?,
        Action::Ignore => store.add_ignore().context("failed to record ignored time")?,
        Action::Stretch => store.stretch().context("failed to stretch last task")?,
    };

    print_entry(writer, &entry)
}

fn print_entry<W: Write>(writer: &mut W, entry: &StoredEntry) -> Result<()> {
    writeln!(
        writer,
        "{} {}",
        entry.start_time.format("%Y-%m-%d %H:%M"),
        entry.task
    )?;
    Ok(())
}
