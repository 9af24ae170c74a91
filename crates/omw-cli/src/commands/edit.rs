//! Edit command: opens the entry file in the user's editor.

use std::process::Command;

use anyhow::{Context, Result};
use omw_store::{Clock, EntryStore, ResourceLock};

#[cfg(windows)]
const FALLBACK_EDITOR: &str = "notepad";
#[cfg(not(windows))]
const FALLBACK_EDITOR: &str = "vi";

/// Picks the editor command: configured, then `$EDITOR`, then a platform default.
pub fn resolve_editor(configured: Option<&str>, env_editor: Option<&str>) -> String {
    [configured, env_editor]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|editor| !editor.is_empty())
        .unwrap_or(FALLBACK_EDITOR)
        .to_string()
}

/// Splits an editor command like `code --wait` into program and arguments.
fn split_command(editor: &str) -> (&str, Vec<&str>) {
    let mut parts = editor.split_whitespace();
    let program = parts.next().unwrap_or(FALLBACK_EDITOR);
    (program, parts.collect())
}

/// Runs the editor on the store file while holding the store lock, so no
/// entry is appended underneath the editor's buffer.
pub fn run<L: ResourceLock, C: Clock>(store: &EntryStore<L, C>, editor: &str) -> Result<()> {
    let (program, args) = split_command(editor);
    tracing::debug!(program, ?args, path = %store.path().display(), "launching editor");

    let status = store
        .with_exclusive(|path| Command::new(program).args(&args).arg(path).status())?
        .with_context(|| format!("failed to launch editor {program:?}"))?;

    if !status.success() {
        anyhow::bail!("editor {program:?} exited with {status}");
    }
    Ok(())
}
