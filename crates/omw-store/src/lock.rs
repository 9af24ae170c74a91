//! Exclusive access to the backing file.
//!
//! Every lock makes exactly one non-blocking attempt. Contention is reported
//! to the caller instead of queueing.

use std::fs::{File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, TryLockError};

use fs2::FileExt;
use thiserror::Error;

/// Lock acquisition errors.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another holder has the lock.
    #[error("resource is locked")]
    Contended,
    /// The lock file could not be opened.
    #[error("failed to open lock file {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A mutual-exclusion primitive guarding the entry store.
///
/// The lock is held for as long as the returned guard lives.
pub trait ResourceLock {
    type Guard<'a>
    where
        Self: 'a;

    /// Makes a single attempt to take the lock.
    fn try_acquire(&self) -> Result<Self::Guard<'_>, LockError>;
}

impl<L: ResourceLock> ResourceLock for Arc<L> {
    type Guard<'a>
        = L::Guard<'a>
    where
        Self: 'a;

    fn try_acquire(&self) -> Result<Self::Guard<'_>, LockError> {
        self.as_ref().try_acquire()
    }
}

/// Cross-process advisory lock on a sidecar file.
///
/// Processes that don't take the lock are not stopped from writing.
#[derive(Debug, Clone)]
pub struct FileLock {
    path: PathBuf,
}

impl FileLock {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Lock file next to the store file: `omw.toml` → `omw.toml.lock`.
    pub fn for_store(store_path: &Path) -> Self {
        let mut name = store_path.as_os_str().to_owned();
        name.push(".lock");
        Self::new(name)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Held [`FileLock`]; unlocks on drop.
#[derive(Debug)]
pub struct FileLockGuard {
    file: File,
}

impl Drop for FileLockGuard {
    fn drop(&mut self) {
        if let Err(err) = FileExt::unlock(&self.file) {
            tracing::warn!(%err, "failed to release file lock");
        }
    }
}

impl ResourceLock for FileLock {
    type Guard<'a> = FileLockGuard;

    fn try_acquire(&self) -> Result<Self::Guard<'_>, LockError> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&self.path)
            .map_err(|source| LockError::Io {
                path: self.path.clone(),
                source,
            })?;

        match FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(FileLockGuard { file }),
            Err(err) if err.raw_os_error() == fs2::lock_contended_error().raw_os_error() => {
                tracing::debug!(path = %self.path.display(), "lock contended");
                Err(LockError::Contended)
            }
            Err(source) => Err(LockError::Io {
                path: self.path.clone(),
                source,
            }),
        }
    }
}

/// In-process lock for single-process deployments and tests.
#[derive(Debug, Default)]
pub struct MemoryLock {
    inner: Mutex<()>,
}

impl ResourceLock for MemoryLock {
    type Guard<'a> = MutexGuard<'a, ()>;

    fn try_acquire(&self) -> Result<Self::Guard<'_>, LockError> {
        match self.inner.try_lock() {
            Ok(guard) => Ok(guard),
            // Nothing is protected by the mutex itself, so poisoning is harmless.
            Err(TryLockError::Poisoned(poisoned)) => Ok(poisoned.into_inner()),
            Err(TryLockError::WouldBlock) => Err(LockError::Contended),
        }
    }
}
