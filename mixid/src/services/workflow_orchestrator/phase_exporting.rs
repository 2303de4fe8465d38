//! Phase 4: EXPORTING
//!
//! Mix info assembly and tracklist files. Never fails the run.

use super::{RunContext, WorkflowOrchestrator};
use crate::models::{MixInfo, Track};
use crate::services::mix_info_builder::build_mix_info;
use std::path::PathBuf;

impl WorkflowOrchestrator {
    /// Phase 4: EXPORTING - Write the tracklist in the configured format
    pub(super) async fn phase_exporting(
        &self,
        run: &RunContext,
        tracks: &[Track],
    ) -> (MixInfo, Vec<PathBuf>) {
        let format = self.config.output_format.clone();
        tracing::info!(run_id = %run.run_id(), format = %format, "Phase 4: EXPORTING");

        let mix_info = build_mix_info(&run.metadata, tracks);

        let writer = self.output_writer.clone();
        let info = mix_info.clone();
        let tracks = tracks.to_vec();
        let written = tokio::task::spawn_blocking(move || writer.write(&info, &tracks, &format))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(run_id = %run.run_id(), error = %e, "Tracklist writer panicked");
                Vec::new()
            });

        (mix_info, written)
    }
}
