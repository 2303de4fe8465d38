//! CLEANING_UP
//!
//! Runs on every exit path. Failures here are logged, never returned.

use super::{RunContext, WorkflowOrchestrator};
use std::fs;
use std::path::Path;

impl WorkflowOrchestrator {
    /// Remove the working directory, release its lock and close the
    /// recognition backend
    ///
    /// A run that never acquired the lock leaves the directory alone: it
    /// belongs to whichever run holds it.
    pub(super) async fn cleanup(&self, run: &mut RunContext) {
        let run_id = run.run_id();

        if let Some(lock) = run.work_dir_lock.take() {
            let work_dir = run.work_dir.clone();
            match tokio::task::spawn_blocking(move || remove_work_dir(&work_dir)).await {
                Ok(true) => {
                    tracing::debug!(run_id = %run_id, work_dir = %run.work_dir.display(), "Working directory removed")
                }
                Ok(false) => tracing::warn!(
                    run_id = %run_id,
                    work_dir = %run.work_dir.display(),
                    "Working directory could not be fully removed"
                ),
                Err(e) => tracing::warn!(run_id = %run_id, error = %e, "Cleanup task panicked"),
            }
            drop(lock);
        } else {
            tracing::debug!(
                run_id = %run_id,
                work_dir = %run.work_dir.display(),
                "Working directory not owned by this run, leaving it in place"
            );
        }

        self.dispatcher.close().await;
    }
}

/// Best-effort removal of a working directory
///
/// Removes each entry individually (logging failures), then the directory
/// tree, falling back to a plain `remove_dir`. Returns whether the
/// directory is gone afterwards.
pub fn remove_work_dir(work_dir: &Path) -> bool {
    if !work_dir.exists() {
        return true;
    }

    match fs::read_dir(work_dir) {
        Ok(entries) => {
            for entry in entries.flatten() {
                let path = entry.path();
                let removed = if path.is_dir() {
                    fs::remove_dir_all(&path)
                } else {
                    fs::remove_file(&path)
                };
                if let Err(e) = removed {
                    tracing::warn!(path = %path.display(), error = %e, "Failed to remove temporary file");
                }
            }
        }
        Err(e) => {
            tracing::warn!(work_dir = %work_dir.display(), error = %e, "Failed to list working directory")
        }
    }

    if let Err(e) = fs::remove_dir_all(work_dir) {
        tracing::debug!(work_dir = %work_dir.display(), error = %e, "remove_dir_all failed, trying remove_dir");
        if let Err(e) = fs::remove_dir(work_dir) {
            tracing::warn!(work_dir = %work_dir.display(), error = %e, "Failed to remove working directory");
        }
    }

    !work_dir.exists()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_removes_files_and_nested_dirs() {
        let temp = TempDir::new().unwrap();
        let work_dir = temp.path().join("abc");
        fs::create_dir_all(work_dir.join("nested")).unwrap();
        fs::write(work_dir.join("segment_0_60.mp3"), b"data").unwrap();
        fs::write(work_dir.join("nested").join("download.mp3"), b"data").unwrap();

        assert!(remove_work_dir(&work_dir));
        assert!(!work_dir.exists());
        assert!(temp.path().exists());
    }

    #[test]
    fn test_unremovable_path_reports_failure() {
        let temp = TempDir::new().unwrap();
        // A regular file where the directory should be cannot be listed or
        // removed as a directory
        let work_dir = temp.path().join("0123456789abcdef");
        fs::write(&work_dir, b"not a directory").unwrap();

        assert!(!remove_work_dir(&work_dir));
        assert!(work_dir.is_file());
    }

    #[test]
    fn test_missing_dir_counts_as_removed() {
        let temp = TempDir::new().unwrap();
        assert!(remove_work_dir(&temp.path().join("never-created")));
    }
}
