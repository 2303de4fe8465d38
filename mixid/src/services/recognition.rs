//! Recognition dispatch
//!
//! The dispatcher owns the result policy around a [`RecognitionBackend`]:
//! refusing to call it without segments, turning backend failures into a
//! single error and applying the confidence threshold.

use crate::models::{AudioSegment, Track};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Maps audio segments to recognized tracks
#[async_trait]
pub trait RecognitionBackend: Send + Sync {
    /// Backend name for logging (e.g. "acoustid")
    fn name(&self) -> &'static str;

    /// Identify the tracks heard across `segments`
    ///
    /// `time_in_mix` of each returned track is the segment start it was
    /// recognized in. An empty result is not an error.
    async fn identify_tracks(&self, segments: &[AudioSegment]) -> anyhow::Result<Vec<Track>>;

    /// Release backend resources; called once during run cleanup
    async fn close(&self) {}
}

/// Recognition dispatch errors
#[derive(Debug, Error)]
pub enum RecognitionError {
    #[error("No audio segments to identify")]
    NoSegments,

    #[error("Recognition backend {backend} failed: {message}")]
    Backend {
        backend: &'static str,
        message: String,
    },
}

/// Result of a recognition attempt that reached the backend
#[derive(Debug, Clone, PartialEq)]
pub enum RecognitionOutcome {
    /// Tracks at or above the confidence threshold
    Tracks(Vec<Track>),
    /// Backend found nothing
    Empty,
    /// Backend found tracks but all were below the threshold
    BelowThreshold { discarded: usize, threshold: f64 },
}

/// Calls the recognition backend and applies the result policy
pub struct RecognitionDispatcher {
    backend: Arc<dyn RecognitionBackend>,
    min_confidence: f64,
}

impl RecognitionDispatcher {
    pub fn new(backend: Arc<dyn RecognitionBackend>, min_confidence: f64) -> Self {
        Self {
            backend,
            min_confidence,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Identify tracks across all segments in a single backend call
    pub async fn identify(
        &self,
        segments: &[AudioSegment],
    ) -> Result<RecognitionOutcome, RecognitionError> {
        if segments.is_empty() {
            return Err(RecognitionError::NoSegments);
        }

        let backend = self.backend.name();
        info!(backend, segments = segments.len(), "Identifying tracks");

        let tracks = self
            .backend
            .identify_tracks(segments)
            .await
            .map_err(|e| RecognitionError::Backend {
                backend,
                message: format!("{:#}", e),
            })?;

        if tracks.is_empty() {
            return Ok(RecognitionOutcome::Empty);
        }

        let recognized = tracks.len();
        let kept: Vec<Track> = tracks
            .into_iter()
            .filter(|t| t.confidence >= self.min_confidence)
            .collect();
        let discarded = recognized - kept.len();

        if discarded > 0 {
            debug!(
                discarded,
                threshold = self.min_confidence,
                "Discarded low-confidence tracks"
            );
        }

        if kept.is_empty() {
            warn!(
                discarded,
                threshold = self.min_confidence,
                "Every recognized track was below the confidence threshold"
            );
            return Ok(RecognitionOutcome::BelowThreshold {
                discarded,
                threshold: self.min_confidence,
            });
        }

        info!(backend, tracks = kept.len(), "Tracks identified");
        Ok(RecognitionOutcome::Tracks(kept))
    }

    /// Forward the lifecycle hook to the backend
    pub async fn close(&self) {
        self.backend.close().await;
    }
}
