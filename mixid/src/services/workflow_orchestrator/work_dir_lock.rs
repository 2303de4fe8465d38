//! Exclusive ownership of a per-input working directory
//!
//! The lock is an advisory file lock on `<work_dir>.lock`, a sibling of the
//! working directory, so removing the directory never removes the lock. The
//! operating system drops the lock when its holder exits, so a crashed run
//! never blocks the next one.

use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

/// Held for the lifetime of one run; released on drop
#[derive(Debug)]
pub struct WorkDirLock {
    _file: File,
    path: PathBuf,
}

impl WorkDirLock {
    /// Lock file guarding `work_dir`
    pub fn lock_path(work_dir: &Path) -> PathBuf {
        work_dir.with_extension("lock")
    }

    /// Take the lock without waiting
    ///
    /// Returns `Ok(None)` when another run (in this process or another one)
    /// already holds it.
    pub fn try_acquire(work_dir: &Path) -> io::Result<Option<Self>> {
        let path = Self::lock_path(work_dir);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(&path)?;

        match fs2::FileExt::try_lock_exclusive(&file) {
            Ok(()) => Ok(Some(Self { _file: file, path })),
            Err(e) if e.raw_os_error() == fs2::lock_contended_error().raw_os_error() => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}
