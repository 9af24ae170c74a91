//! Convert command: legacy line log to entry file.

use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

use anyhow::{Context, Result};
use omw_store::legacy;

/// Writes the converted entry file to `writer`.
///
/// Nothing is written to the store; the output is meant to be reviewed and
/// then saved over the store file.
pub fn run<W: Write>(writer: &mut W, legacy_path: &Path) -> Result<usize> {
    let file = File::open(legacy_path)
        .with_context(|| format!("failed to open {}", legacy_path.display()))?;
    let entries = legacy::convert(BufReader::new(file))
        .with_context(|| format!("failed to read {}", legacy_path.display()))?;
    tracing::debug!(count = entries.len(), "converted legacy entries");

    let document = legacy::to_toml(&entries).context("failed to encode entries")?;
    writer.write_all(document.as_bytes())?;
    Ok(entries.len())
}
