//! Run-level error types for mixid
//!
//! Only input, working directory, acquisition, empty segmentation and
//! recognition failures end a run. Export and cleanup problems are logged
//! where they happen and never reach this type.

use crate::models::RunState;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Diagnostic context attached when a run recognizes no tracks
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IdentificationContext {
    pub segments_created: usize,
    pub input_path: String,
    /// Known mix duration in seconds, if it was determined
    pub file_duration: Option<f64>,
}

impl fmt::Display for IdentificationContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let duration = self
            .file_duration
            .map(mixid_common::human_time::format_duration)
            .unwrap_or_else(|| "unknown".to_string());
        write!(
            f,
            "segments_created={}, input_path={}, file_duration={}",
            self.segments_created, self.input_path, duration
        )
    }
}

/// Terminal error of a processing run
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Input is neither a usable local path nor a remote reference
    #[error("Invalid URL or file path provided: {0}")]
    InvalidInput(String),

    /// Local input file does not exist
    #[error("Local file not found: {}", .0.display())]
    NotFound(PathBuf),

    /// Remote input could not be acquired
    #[error("Failed to acquire remote input {reference}: {message}")]
    Acquisition { reference: String, message: String },

    /// Another run of the same input holds the working directory
    #[error("Another run is already processing this input (working directory {} is locked)", .work_dir.display())]
    WorkDirBusy { work_dir: PathBuf },

    /// Every segment transcode failed (or the input had no readable duration)
    #[error("No audio segments were created from {input_path}")]
    NoSegments { input_path: String },

    /// Recognition ran but found nothing
    #[error("{message} ({context})")]
    TrackIdentification {
        message: String,
        context: IdentificationContext,
    },

    /// Tracks were recognized but none reached the confidence threshold
    #[error("No tracks were identified with sufficient confidence ({discarded} below {threshold})")]
    InsufficientConfidence { discarded: usize, threshold: f64 },

    /// Recognition backend failed
    #[error("Track recognition failed: {0}")]
    Recognition(String),

    /// Shutdown signal observed before entering a stage
    #[error("Processing cancelled before {stage}")]
    Cancelled { stage: RunState },

    /// Unexpected internal failure (I/O on the working directory, join errors)
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProcessingError {
    /// Build the zero-track error with its diagnostic context
    pub fn no_tracks(context: IdentificationContext) -> Self {
        let message = format!(
            "No tracks were identified in the audio file. Created {} segments but no matches found. \
             This could be due to poor audio quality, instrumental music, or unsupported audio content.",
            context.segments_created
        );
        ProcessingError::TrackIdentification { message, context }
    }

    /// Identification context, when the error carries one
    pub fn context(&self) -> Option<&IdentificationContext> {
        match self {
            ProcessingError::TrackIdentification { context, .. } => Some(context),
            _ => None,
        }
    }

    /// Whether this error came from the shutdown signal
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ProcessingError::Cancelled { .. })
    }
}

/// Result type for processing runs
pub type ProcessingResult<T> = Result<T, ProcessingError>;
