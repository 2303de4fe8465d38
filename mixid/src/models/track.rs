//! Recognized track

use serde::{Deserialize, Serialize};

/// A track recognized somewhere in the mix
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub artist: String,
    pub song_name: String,
    /// Position in the mix where the track was first heard (seconds)
    pub time_in_mix: u32,
    /// Recognition confidence (0.0 - 1.0)
    pub confidence: f64,
}

impl Track {
    pub fn new(artist: impl Into<String>, song_name: impl Into<String>) -> Self {
        Self {
            artist: artist.into(),
            song_name: song_name.into(),
            time_in_mix: 0,
            confidence: 1.0,
        }
    }

    pub fn at(mut self, seconds: u32) -> Self {
        self.time_in_mix = seconds;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = confidence;
        self
    }

    /// `"Artist - Song"` when both parts are present
    pub fn display_name(&self) -> Option<String> {
        let artist = self.artist.trim();
        let song = self.song_name.trim();
        if artist.is_empty() || song.is_empty() {
            None
        } else {
            Some(format!("{} - {}", artist, song))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_name_requires_both_parts() {
        assert_eq!(Track::new("A", "B").display_name(), Some("A - B".to_string()));
        assert_eq!(Track::new("", "B").display_name(), None);
        assert_eq!(Track::new("A", "  ").display_name(), None);
    }

    #[test]
    fn test_builder_sets_position_and_confidence() {
        let track = Track::new("A", "B").at(90).with_confidence(0.75);
        assert_eq!(track.time_in_mix, 90);
        assert_eq!(track.confidence, 0.75);
    }
}
