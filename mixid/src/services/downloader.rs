//! Media acquisition: turning a remote reference into a local audio file
//!
//! The default implementation shells out to `yt-dlp`, extracting audio to
//! MP3 inside the run's working directory so that cleanup removes it.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use thiserror::Error;

/// Download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Downloader binary not found in PATH
    #[error("Downloader binary not found: {0}")]
    BinaryNotFound(String),

    /// Failed to execute the downloader
    #[error("Failed to execute downloader: {0}")]
    ExecutionError(String),

    /// Downloader ran but reported failure
    #[error("Download failed: {0}")]
    DownloadFailed(String),

    /// Downloader output could not be parsed
    #[error("Failed to parse downloader output: {0}")]
    ParseError(String),

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Provenance metadata reported by a downloader
///
/// Every field is optional; the input resolver decides the fallbacks.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct DownloadMetadata {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
}

/// Metadata a downloader exposes on itself rather than per download
pub type DownloaderAttributes = DownloadMetadata;

/// A downloader for one remote reference
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Identifier for logging (e.g. "yt-dlp")
    fn name(&self) -> &'static str;

    /// Download the reference into `target_dir`
    ///
    /// `Ok(None)` means the download completed without producing a file.
    async fn download(
        &self,
        reference: &str,
        target_dir: &Path,
    ) -> Result<Option<PathBuf>, DownloadError>;

    /// Metadata captured by the last successful download
    fn last_metadata(&self) -> Option<DownloadMetadata>;

    /// Metadata the downloader exposes outside of a download result
    ///
    /// Second source in the resolver's fallback chain.
    fn attributes(&self) -> DownloaderAttributes {
        DownloaderAttributes::default()
    }
}

/// Creates downloaders for the references it supports
pub trait DownloaderFactory: Send + Sync {
    /// `None` when no downloader supports the reference
    fn create_downloader(&self, reference: &str) -> Option<Box<dyn Downloader>>;
}

/// Subset of the `yt-dlp --print-json` document we use
#[derive(Debug, Clone, Deserialize)]
struct YtDlpInfo {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    uploader: Option<String>,
    #[serde(default)]
    channel: Option<String>,
    #[serde(default)]
    duration: Option<f64>,
}

/// Factory for [`YtDlpDownloader`]; accepts http and https references
pub struct YtDlpDownloaderFactory {
    binary_path: String,
}

impl YtDlpDownloaderFactory {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }
}

impl DownloaderFactory for YtDlpDownloaderFactory {
    fn create_downloader(&self, reference: &str) -> Option<Box<dyn Downloader>> {
        let url = reqwest::Url::parse(reference).ok()?;
        if !matches!(url.scheme(), "http" | "https") {
            return None;
        }
        Some(Box::new(YtDlpDownloader::new(self.binary_path.clone())))
    }
}

/// Audio downloader backed by the `yt-dlp` command-line tool
pub struct YtDlpDownloader {
    binary_path: String,
    last_info: Mutex<Option<YtDlpInfo>>,
}

impl YtDlpDownloader {
    pub fn new(binary_path: String) -> Self {
        Self {
            binary_path,
            last_info: Mutex::new(None),
        }
    }

    /// Last JSON document on stdout (yt-dlp prints one per downloaded entry)
    fn parse_info(stdout: &str) -> Result<YtDlpInfo, DownloadError> {
        let line = stdout
            .lines()
            .rev()
            .find(|l| l.trim_start().starts_with('{'))
            .ok_or_else(|| DownloadError::ParseError("no JSON document in output".to_string()))?;

        serde_json::from_str(line).map_err(|e| DownloadError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl Downloader for YtDlpDownloader {
    fn name(&self) -> &'static str {
        "yt-dlp"
    }

    async fn download(
        &self,
        reference: &str,
        target_dir: &Path,
    ) -> Result<Option<PathBuf>, DownloadError> {
        std::fs::create_dir_all(target_dir)?;
        let template = target_dir.join("%(id)s.%(ext)s");

        tracing::debug!(
            reference,
            target_dir = %target_dir.display(),
            "Running yt-dlp"
        );

        let output = tokio::task::spawn_blocking({
            let binary = self.binary_path.clone();
            let reference = reference.to_string();
            let template = template.to_string_lossy().into_owned();

            move || {
                Command::new(&binary)
                    .args([
                        "--no-playlist",
                        "--no-progress",
                        "--extract-audio",
                        "--audio-format",
                        "mp3",
                        "--print-json",
                        "--output",
                    ])
                    .arg(&template)
                    .arg(&reference)
                    .output()
            }
        })
        .await
        .map_err(|e| DownloadError::ExecutionError(e.to_string()))?
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                DownloadError::BinaryNotFound(self.binary_path.clone())
            } else {
                DownloadError::ExecutionError(e.to_string())
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(DownloadError::DownloadFailed(stderr.trim().to_string()));
        }

        let info = Self::parse_info(&String::from_utf8_lossy(&output.stdout))?;
        let audio_path = target_dir.join(format!("{}.mp3", info.id));

        if let Ok(mut last) = self.last_info.lock() {
            *last = Some(info);
        }

        if audio_path.exists() {
            Ok(Some(audio_path))
        } else {
            tracing::warn!(
                expected = %audio_path.display(),
                "yt-dlp reported success but the audio file is missing"
            );
            Ok(None)
        }
    }

    fn last_metadata(&self) -> Option<DownloadMetadata> {
        let last = self.last_info.lock().ok()?;
        last.as_ref().map(|info| DownloadMetadata {
            title: info.title.clone(),
            uploader: info.uploader.clone(),
            duration: info.duration,
        })
    }

    fn attributes(&self) -> DownloaderAttributes {
        // Some extractors only fill `channel`
        let channel = self
            .last_info
            .lock()
            .ok()
            .and_then(|last| last.as_ref().and_then(|info| info.channel.clone()));
        DownloaderAttributes {
            title: None,
            uploader: channel,
            duration: None,
        }
    }
}
