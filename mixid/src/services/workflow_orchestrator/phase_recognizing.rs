//! Phase 3: RECOGNIZING
//!
//! One backend call over all segments, then the result policy

use super::{RunContext, WorkflowOrchestrator};
use crate::error::{IdentificationContext, ProcessingError, ProcessingResult};
use crate::models::{AudioSegment, Track};
use crate::services::recognition::{RecognitionError, RecognitionOutcome};

impl WorkflowOrchestrator {
    /// Phase 3: RECOGNIZING - Map segments to tracks
    pub(super) async fn phase_recognizing(
        &self,
        run: &RunContext,
        segments: &[AudioSegment],
    ) -> ProcessingResult<Vec<Track>> {
        tracing::info!(
            run_id = %run.run_id(),
            backend = self.dispatcher.backend_name(),
            segments = segments.len(),
            "Phase 3: RECOGNIZING"
        );

        match self.dispatcher.identify(segments).await {
            Ok(RecognitionOutcome::Tracks(tracks)) => Ok(tracks),
            Ok(RecognitionOutcome::Empty) => Err(ProcessingError::no_tracks(IdentificationContext {
                segments_created: run.segments_created,
                input_path: run.source_label.clone(),
                file_duration: run.metadata.known_duration(),
            })),
            Ok(RecognitionOutcome::BelowThreshold {
                discarded,
                threshold,
            }) => Err(ProcessingError::InsufficientConfidence {
                discarded,
                threshold,
            }),
            Err(RecognitionError::NoSegments) => Err(ProcessingError::NoSegments {
                input_path: run.source_label.clone(),
            }),
            Err(e) => Err(ProcessingError::Recognition(e.to_string())),
        }
    }
}
