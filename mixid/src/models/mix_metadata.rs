//! Mix-level metadata
//!
//! [`MixMetadata`] is what the input resolver learned about the source
//! (normalized once, then owned by the orchestrator for the run).
//! [`MixInfo`] is the record handed to the tracklist exporters.

use crate::utils::sanitize;
use serde::{Deserialize, Serialize};

/// Uploader placeholder when the source names none
pub const UNKNOWN_ARTIST: &str = "Unknown artist";

/// Normalized metadata of the mix being processed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixMetadata {
    pub title: String,
    pub uploader: String,
    /// Total duration in seconds; 0 until known
    pub duration_seconds: f64,
}

impl MixMetadata {
    /// Build with sanitized strings and a normalized duration
    ///
    /// Missing, negative or non-finite durations become 0.
    pub fn new(title: &str, uploader: &str, duration_seconds: Option<f64>) -> Self {
        let duration_seconds = duration_seconds
            .filter(|d| d.is_finite() && *d >= 0.0)
            .unwrap_or(0.0);

        Self {
            title: sanitize(title),
            uploader: sanitize(uploader),
            duration_seconds,
        }
    }

    /// Duration if it has been determined
    pub fn known_duration(&self) -> Option<f64> {
        if self.duration_seconds > 0.0 {
            Some(self.duration_seconds)
        } else {
            None
        }
    }
}

impl Default for MixMetadata {
    fn default() -> Self {
        Self {
            title: String::new(),
            uploader: UNKNOWN_ARTIST.to_string(),
            duration_seconds: 0.0,
        }
    }
}

/// Metadata record written alongside the tracklist
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixInfo {
    pub title: String,
    pub artist: String,
    /// Build date, `YYYY-MM-DD`
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    pub track_count: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_sanitizes_and_normalizes() {
        let metadata = MixMetadata::new("  Sunset\u{0007} Set ", "\tDJ  Example", Some(3600.5));
        assert_eq!(metadata.title, "Sunset Set");
        assert_eq!(metadata.uploader, "DJ Example");
        assert_eq!(metadata.known_duration(), Some(3600.5));
    }

    #[test]
    fn test_invalid_durations_become_unknown() {
        assert_eq!(MixMetadata::new("t", "u", None).known_duration(), None);
        assert_eq!(MixMetadata::new("t", "u", Some(-3.0)).duration_seconds, 0.0);
        assert_eq!(MixMetadata::new("t", "u", Some(f64::NAN)).duration_seconds, 0.0);
    }
}
