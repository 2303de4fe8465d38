//! Phase 2: SEGMENTING
//!
//! Duration probe, window planning and bounded-parallel transcoding

use super::{RunContext, WorkflowOrchestrator};
use crate::error::{ProcessingError, ProcessingResult};
use crate::models::AudioSegment;
use crate::services::segment_planner::plan_segments;
use chrono::Utc;
use mixid_common::events::MixidEvent;
use std::path::Path;
use std::sync::Arc;

impl WorkflowOrchestrator {
    /// Phase 2: SEGMENTING - Materialize the analysis windows
    ///
    /// Fails only when no window could be materialized.
    pub(super) async fn phase_segmenting(
        &self,
        run: &mut RunContext,
        source: &Path,
    ) -> ProcessingResult<Vec<AudioSegment>> {
        let run_id = run.run_id();
        tracing::info!(run_id = %run_id, "Phase 2: SEGMENTING");

        let probe = Arc::clone(&self.duration_probe);
        let path = source.to_path_buf();
        let probed = tokio::task::spawn_blocking(move || probe.probe(&path))
            .await
            .map_err(|e| ProcessingError::Internal(format!("Duration probe panicked: {}", e)))?;

        let total_duration = match probed {
            Ok(seconds) => {
                if run.metadata.known_duration().is_none() {
                    run.metadata.duration_seconds = seconds;
                }
                seconds
            }
            Err(e) => {
                tracing::warn!(
                    run_id = %run_id,
                    error = %e,
                    fallback = run.metadata.duration_seconds,
                    "Duration probe failed, using source metadata"
                );
                run.metadata.duration_seconds
            }
        };

        let plans = plan_segments(
            total_duration,
            self.config.segment_length,
            self.config.overlap_duration,
            &run.work_dir,
        );

        tracing::info!(
            run_id = %run_id,
            total_duration,
            windows = plans.len(),
            segment_length = self.config.segment_length,
            overlap = self.config.overlap_duration,
            "Segment plan ready"
        );

        let event_bus = &self.event_bus;
        let segments = self
            .materializer
            .materialize(source, plans, |progress| {
                event_bus.emit_lossy(MixidEvent::SegmentProgress {
                    run_id,
                    completed: progress.completed,
                    succeeded: progress.succeeded,
                    total: progress.total,
                    timestamp: Utc::now(),
                });
            })
            .await;

        run.segments_created = segments.len();

        if segments.is_empty() {
            return Err(ProcessingError::NoSegments {
                input_path: run.source_label.clone(),
            });
        }

        Ok(segments)
    }
}
