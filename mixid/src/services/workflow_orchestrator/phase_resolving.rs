//! Phase 1: RESOLVING
//!
//! Working directory ownership, input classification, remote acquisition
//! and metadata normalization

use super::{RunContext, WorkDirLock, WorkflowOrchestrator};
use crate::error::{ProcessingError, ProcessingResult};
use crate::services::input_resolver::ResolvedInput;

impl WorkflowOrchestrator {
    /// Phase 1: RESOLVING - Produce a local audio file and its metadata
    pub(super) async fn phase_resolving(&self, run: &mut RunContext) -> ProcessingResult<ResolvedInput> {
        tracing::info!(run_id = %run.run_id(), "Phase 1: RESOLVING");

        let lock = WorkDirLock::try_acquire(&run.work_dir).map_err(|e| {
            ProcessingError::Internal(format!(
                "Failed to lock working directory {}: {}",
                run.work_dir.display(),
                e
            ))
        })?;
        match lock {
            Some(lock) => {
                tracing::debug!(run_id = %run.run_id(), lock = %lock.path().display(), "Working directory locked");
                run.work_dir_lock = Some(lock);
            }
            None => {
                return Err(ProcessingError::WorkDirBusy {
                    work_dir: run.work_dir.clone(),
                })
            }
        }

        tokio::fs::create_dir_all(&run.work_dir).await.map_err(|e| {
            ProcessingError::Internal(format!(
                "Failed to create working directory {}: {}",
                run.work_dir.display(),
                e
            ))
        })?;

        let resolved = self
            .resolver
            .resolve(&run.status.input, &run.work_dir)
            .await?;

        run.source_label = resolved.source_label.clone();
        run.metadata = resolved.metadata.clone();

        tracing::info!(
            run_id = %run.run_id(),
            path = %resolved.local_path.display(),
            remote = resolved.is_remote,
            title = %run.metadata.title,
            "Input resolved"
        );

        Ok(resolved)
    }
}
