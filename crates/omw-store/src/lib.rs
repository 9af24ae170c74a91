//! Storage layer for the omw time tracker.
//!
//! Entries live in a single TOML file (see [`format`]) that only ever grows:
//! new entries are appended as text at the end of the file and existing text
//! is never rewritten, so hand edits made between runs survive untouched.
//!
//! # Concurrency
//!
//! Appends take an exclusive [`ResourceLock`] around the serialize-and-write
//! step. Lock acquisition is a single non-blocking attempt; a held lock
//! surfaces as [`StoreError::Lock`] and the caller decides whether to retry.
//!
//! Reads are not locked. Each append is one `write_all` of a complete
//! record, so a reader racing with a writer sees the file either before or
//! after the append.

pub mod clock;
pub mod format;
pub mod legacy;
pub mod lock;

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use omw_core::{Category, EntryId, ParseError, StoredEntry, ValidationError, format_task};
use thiserror::Error;
use uuid::Uuid;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lock::{FileLock, LockError, MemoryLock, ResourceLock};

/// Task text written by [`EntryStore::hello`].
pub const HELLO_TASK: &str = "hello";

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The task text was rejected before anything was written.
    #[error("invalid task: {0}")]
    Parse(#[from] ParseError),
    /// Another process holds the store lock.
    #[error("{} is locked by another process, try again", .path.display())]
    Lock { path: PathBuf },
    /// Reading or writing the backing file failed.
    #[error("failed to {op} {}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The backing file is not a TOML entry file.
    #[error("{} is not a valid entry file", .path.display())]
    Format {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
    /// Nothing to stretch.
    #[error("no previous task to stretch in {}", .path.display())]
    EmptyStore { path: PathBuf },
    /// An entry could not be encoded.
    #[error("failed to serialize entry: {0}")]
    Serialize(#[from] toml::ser::Error),
    /// A generated value failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

/// Append-only entry log backed by a TOML file.
#[derive(Debug)]
pub struct EntryStore<L = FileLock, C = SystemClock> {
    path: PathBuf,
    lock: L,
    clock: C,
}

impl EntryStore {
    /// Opens the store at `path` with a sidecar file lock and the system clock.
    ///
    /// Nothing is touched on disk until the first write.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let lock = FileLock::for_store(&path);
        Self::with_parts(path, lock, SystemClock)
    }
}

impl<L: ResourceLock, C: Clock> EntryStore<L, C> {
    pub fn with_parts(path: impl Into<PathBuf>, lock: L, clock: C) -> Self {
        Self {
            path: path.into(),
            lock,
            clock,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a task stamped with the current time.
    ///
    /// The stored text is the parsed title plus its category marker; input the
    /// parser drops (`fix bug! again` → `fix bug`) is not written.
    pub fn append(&self, task: &str) -> Result<StoredEntry, StoreError> {
        self.write_entry(task, false)
    }

    /// Appends a blank line and a `hello` entry, marking the start of a day.
    pub fn hello(&self) -> Result<StoredEntry, StoreError> {
        self.write_entry(HELLO_TASK, true)
    }

    /// Appends a break entry.
    pub fn add_break(&self) -> Result<StoredEntry, StoreError> {
        self.append(&format_task("break", Category::Break))
    }

    /// Appends an ignored entry.
    pub fn add_ignore(&self) -> Result<StoredEntry, StoreError> {
        self.append(&format_task("ignore", Category::Ignore))
    }

    /// Repeats the most recent task with the current time, extending it.
    pub fn stretch(&self) -> Result<StoredEntry, StoreError> {
        let entries = self.read_all()?;
        let last = entries.last().ok_or_else(|| StoreError::EmptyStore {
            path: self.path.clone(),
        })?;

        if matches!(
            omw_core::parse(&last.task),
            Err(ParseError::Empty | ParseError::InvalidCharacter { .. })
        ) {
            return Err(StoreError::EmptyStore {
                path: self.path.clone(),
            });
        }

        self.write_entry(&last.task, false)
    }

    /// Reads every well-formed entry in file order.
    ///
    /// A missing file reads as empty. Malformed records are skipped.
    pub fn read_all(&self) -> Result<Vec<StoredEntry>, StoreError> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error("read", source)),
        };

        format::decode(&content).map_err(|source| StoreError::Format {
            path: self.path.clone(),
            source,
        })
    }

    /// Runs `f` on the store path while holding the store lock.
    ///
    /// Used to keep writers out while the file is open in an editor. The file
    /// is created first if missing.
    pub fn with_exclusive<T>(&self, f: impl FnOnce(&Path) -> T) -> Result<T, StoreError> {
        self.ensure_parent()?;
        let _guard = self.acquire()?;
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|source| self.io_error("create", source))?;
        Ok(f(&self.path))
    }

    fn write_entry(&self, task: &str, blank_line: bool) -> Result<StoredEntry, StoreError> {
        let parsed = omw_core::parse(task)?;
        let task = format_task(&parsed.title, parsed.category);

        self.ensure_parent()?;
        let _guard = self.acquire()?;

        let entry = StoredEntry {
            id: EntryId::new(Uuid::new_v4().to_string())?,
            start_time: self.clock.now(),
            task,
        };
        let record = format::encode(std::slice::from_ref(&entry))?;

        let mut file = OpenOptions::new()
            .read(true)
            .append(true)
            .create(true)
            .open(&self.path)
            .map_err(|source| self.io_error("open", source))?;

        let mut text = self.separator(&mut file, blank_line)?;
        text.push_str(&record);

        file.write_all(text.as_bytes())
            .and_then(|()| file.sync_data())
            .map_err(|source| self.io_error("append to", source))?;

        tracing::info!(id = %entry.id, task = %entry.task, "appended entry");
        Ok(entry)
    }

    /// Blank line between the previous record and the new one, plus a line
    /// break if a hand edit left the file without a trailing newline.
    fn separator(&self, file: &mut File, blank_line: bool) -> Result<String, StoreError> {
        let len = file
            .metadata()
            .map_err(|source| self.io_error("inspect", source))?
            .len();

        let mut separator = String::new();
        if len > 0 {
            let mut last = [0u8; 1];
            file.seek(SeekFrom::End(-1))
                .and_then(|_| file.read_exact(&mut last))
                .map_err(|source| self.io_error("read", source))?;
            if last[0] != b'\n' {
                separator.push('\n');
            }
            separator.push('\n');
        }
        if blank_line {
            separator.push('\n');
        }
        Ok(separator)
    }

    fn acquire(&self) -> Result<L::Guard<'_>, StoreError> {
        self.lock.try_acquire().map_err(|err| match err {
            LockError::Contended => StoreError::Lock {
                path: self.path.clone(),
            },
            LockError::Io { path, source } => StoreError::Io {
                op: "lock",
                path,
                source,
            },
        })
    }

    fn ensure_parent(&self) -> Result<(), StoreError> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => fs::create_dir_all(parent)
                .map_err(|source| StoreError::Io {
                    op: "create directory",
                    path: parent.to_path_buf(),
                    source,
                }),
            _ => Ok(()),
        }
    }

    fn io_error(&self, op: &'static str, source: io::Error) -> StoreError {
        StoreError::Io {
            op,
            path: self.path.clone(),
            source,
        }
    }
}
