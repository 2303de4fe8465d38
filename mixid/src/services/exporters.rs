//! Tracklist exporters
//!
//! Each exporter renders the mix info and tracks into one file format.
//! [`TracklistOutput`] binds a tracklist to an output directory and writes
//! one or all formats.

use crate::models::{MixInfo, Track};
use crate::utils::sanitize_filename;
use mixid_common::human_time::format_timestamp;
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Export errors
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to render {format}: {message}")]
    Render {
        format: &'static str,
        message: String,
    },

    #[error("Failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Renders a tracklist into one file format
pub trait TracklistExporter: Send + Sync {
    /// Format name as accepted by `--format`
    fn format(&self) -> &'static str;

    /// File extension without the dot
    fn extension(&self) -> &'static str;

    fn render(&self, mix_info: &MixInfo, tracks: &[Track]) -> Result<String, ExportError>;
}

/// `{mix_info, tracks}` pretty-printed JSON
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonExporter;

#[derive(Serialize)]
struct JsonTracklist<'a> {
    mix_info: &'a MixInfo,
    tracks: &'a [Track],
}

impl TracklistExporter for JsonExporter {
    fn format(&self) -> &'static str {
        "json"
    }

    fn extension(&self) -> &'static str {
        "json"
    }

    fn render(&self, mix_info: &MixInfo, tracks: &[Track]) -> Result<String, ExportError> {
        let mut json = serde_json::to_string_pretty(&JsonTracklist { mix_info, tracks })
            .map_err(|e| ExportError::Render {
                format: self.format(),
                message: e.to_string(),
            })?;
        json.push('\n');
        Ok(json)
    }
}

/// Human-readable Markdown tracklist
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownExporter;

impl TracklistExporter for MarkdownExporter {
    fn format(&self) -> &'static str {
        "markdown"
    }

    fn extension(&self) -> &'static str {
        "md"
    }

    fn render(&self, mix_info: &MixInfo, tracks: &[Track]) -> Result<String, ExportError> {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", mix_info.title);
        let _ = writeln!(out, "- **Artist:** {}", mix_info.artist);
        let _ = writeln!(out, "- **Date:** {}", mix_info.date);
        if let Some(duration) = mix_info.duration {
            let _ = writeln!(
                out,
                "- **Duration:** {}",
                mixid_common::human_time::format_duration(duration)
            );
        }
        let _ = writeln!(out, "- **Tracks:** {}\n", mix_info.track_count);
        let _ = writeln!(out, "## Tracklist\n");

        for (index, track) in tracks.iter().enumerate() {
            let _ = writeln!(
                out,
                "{}. [{}] {} - {}",
                index + 1,
                format_timestamp(u64::from(track.time_in_mix)),
                track.artist,
                track.song_name
            );
        }

        Ok(out)
    }
}

/// Extended M3U playlist
#[derive(Debug, Clone, Copy, Default)]
pub struct M3uExporter;

impl TracklistExporter for M3uExporter {
    fn format(&self) -> &'static str {
        "m3u"
    }

    fn extension(&self) -> &'static str {
        "m3u"
    }

    fn render(&self, mix_info: &MixInfo, tracks: &[Track]) -> Result<String, ExportError> {
        let mut out = String::from("#EXTM3U\n");
        let _ = writeln!(out, "#PLAYLIST:{}", mix_info.title);

        for track in tracks {
            let _ = writeln!(out, "# {}", format_timestamp(u64::from(track.time_in_mix)));
            let _ = writeln!(out, "#EXTINF:-1,{} - {}", track.artist, track.song_name);
            let _ = writeln!(out, "{} - {}", track.artist, track.song_name);
        }

        Ok(out)
    }
}

/// Exporters for every built-in format
pub fn default_exporters() -> Vec<Arc<dyn TracklistExporter>> {
    vec![
        Arc::new(JsonExporter),
        Arc::new(MarkdownExporter),
        Arc::new(M3uExporter),
    ]
}

/// A tracklist bound to an output directory
pub struct TracklistOutput {
    mix_info: MixInfo,
    tracks: Vec<Track>,
    output_dir: PathBuf,
    exporters: Vec<Arc<dyn TracklistExporter>>,
}

impl TracklistOutput {
    pub fn new(mix_info: MixInfo, tracks: Vec<Track>, output_dir: impl Into<PathBuf>) -> Self {
        Self::with_exporters(mix_info, tracks, output_dir, default_exporters())
    }

    pub fn with_exporters(
        mix_info: MixInfo,
        tracks: Vec<Track>,
        output_dir: impl Into<PathBuf>,
        exporters: Vec<Arc<dyn TracklistExporter>>,
    ) -> Self {
        Self {
            mix_info,
            tracks,
            output_dir: output_dir.into(),
            exporters,
        }
    }

    /// File a given exporter writes to
    pub fn output_path(&self, exporter: &dyn TracklistExporter) -> PathBuf {
        self.output_dir.join(format!(
            "{}_{}.{}",
            sanitize_filename(&self.mix_info.title),
            self.mix_info.date,
            exporter.extension()
        ))
    }

    /// Write one format
    pub fn save(&self, format: &str) -> Result<PathBuf, ExportError> {
        let exporter = self
            .exporters
            .iter()
            .find(|e| e.format() == format)
            .ok_or_else(|| ExportError::UnsupportedFormat(format.to_string()))?;
        self.write_with(exporter.as_ref())
    }

    /// Write every format; one result per exporter, in registration order
    pub fn save_all(&self) -> Vec<(&'static str, Result<PathBuf, ExportError>)> {
        self.exporters
            .iter()
            .map(|e| (e.format(), self.write_with(e.as_ref())))
            .collect()
    }

    fn write_with(&self, exporter: &dyn TracklistExporter) -> Result<PathBuf, ExportError> {
        let content = exporter.render(&self.mix_info, &self.tracks)?;
        let path = self.output_path(exporter);
        write_file(&path, &content)?;
        Ok(path)
    }
}

fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    let write_error = |source: std::io::Error| ExportError::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(write_error)?;
    }
    std::fs::write(path, content).map_err(write_error)
}
