//! Mix info assembly for the tracklist exporters

use crate::models::{MixInfo, MixMetadata, Track};
use chrono::{Local, NaiveDate};

/// Title used when neither the source nor the tracks provide one
pub const FALLBACK_TITLE: &str = "Identified Mix";

/// Stored title, else "Artist - Song" of the first track, else the fallback
pub fn resolve_title(stored_title: &str, tracks: &[Track]) -> String {
    let stored = stored_title.trim();
    if !stored.is_empty() {
        return stored.to_string();
    }

    tracks
        .first()
        .and_then(Track::display_name)
        .unwrap_or_else(|| FALLBACK_TITLE.to_string())
}

/// Build the mix info record dated `date`
pub fn build_mix_info_on(metadata: &MixMetadata, tracks: &[Track], date: NaiveDate) -> MixInfo {
    MixInfo {
        title: resolve_title(&metadata.title, tracks),
        artist: metadata.uploader.clone(),
        date: date.format("%Y-%m-%d").to_string(),
        duration: metadata.known_duration().filter(|d| d.is_finite()),
        track_count: tracks.len(),
    }
}

/// Build the mix info record dated today (local time)
pub fn build_mix_info(metadata: &MixMetadata, tracks: &[Track]) -> MixInfo {
    build_mix_info_on(metadata, tracks, Local::now().date_naive())
}
