//! Output writing
//!
//! Never fails a run: every problem is logged and reflected only in the
//! returned list of written files.

use crate::models::{MixInfo, Track};
use crate::services::exporters::{default_exporters, TracklistExporter, TracklistOutput};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Pseudo-format selecting every exporter
pub const ALL_FORMATS: &str = "all";

/// Canonical format name for user input (`md` is an alias of `markdown`)
pub fn normalize_format(format: &str) -> String {
    let format = format.trim().to_ascii_lowercase();
    match format.as_str() {
        "md" => "markdown".to_string(),
        _ => format,
    }
}

/// Writes tracklists into the configured output directory
#[derive(Clone)]
pub struct OutputWriter {
    output_dir: PathBuf,
    exporters: Vec<Arc<dyn TracklistExporter>>,
}

impl OutputWriter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self::with_exporters(output_dir, default_exporters())
    }

    pub fn with_exporters(
        output_dir: impl Into<PathBuf>,
        exporters: Vec<Arc<dyn TracklistExporter>>,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            exporters,
        }
    }

    /// Whether `format` names an exporter or `all`
    pub fn supports(&self, format: &str) -> bool {
        let format = normalize_format(format);
        format == ALL_FORMATS || self.exporters.iter().any(|e| e.format() == format)
    }

    /// Write `tracks` in `format`, returning the files actually written
    pub fn write(&self, mix_info: &MixInfo, tracks: &[Track], format: &str) -> Vec<PathBuf> {
        if tracks.is_empty() {
            error!("No tracks to write");
            return Vec::new();
        }

        let format = normalize_format(format);
        if !self.supports(&format) {
            error!(format = %format, "Unsupported output format");
            return Vec::new();
        }

        let output = TracklistOutput::with_exporters(
            mix_info.clone(),
            tracks.to_vec(),
            self.output_dir.clone(),
            self.exporters.clone(),
        );

        if format == ALL_FORMATS {
            let mut written = Vec::new();
            for (format, result) in output.save_all() {
                match result {
                    Ok(path) => {
                        info!(format, path = %path.display(), "Tracklist written");
                        written.push(path);
                    }
                    Err(e) => warn!(format, error = %e, "Failed to write tracklist"),
                }
            }
            if written.is_empty() {
                error!("Failed to write the tracklist in any format");
            }
            return written;
        }

        match output.save(&format) {
            Ok(path) => {
                info!(format = %format, path = %path.display(), "Tracklist written");
                vec![path]
            }
            Err(e) => {
                error!(format = %format, error = %e, "Failed to write tracklist");
                Vec::new()
            }
        }
    }
}
