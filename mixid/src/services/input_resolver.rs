//! Input resolution
//!
//! Classifies the raw input as a local path or a remote reference, acquires
//! remote media through a [`DownloaderFactory`] and normalizes the mix
//! metadata exactly once.

use crate::error::{ProcessingError, ProcessingResult};
use crate::models::{MixMetadata, UNKNOWN_ARTIST};
use crate::services::downloader::{DownloadMetadata, DownloaderAttributes, DownloaderFactory};
use crate::utils::{file_stem_title, sanitize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Classified input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputKind {
    /// Path on the local filesystem (not yet checked for existence)
    Local(PathBuf),
    /// http or https reference
    Remote(String),
}

/// Result of a successful resolution
#[derive(Debug, Clone)]
pub struct ResolvedInput {
    /// Audio file the rest of the pipeline reads
    pub local_path: PathBuf,
    /// Human-readable source (the URL or the local path) for diagnostics
    pub source_label: String,
    pub metadata: MixMetadata,
    pub is_remote: bool,
}

/// Trim whitespace and one pair of surrounding quotes
fn normalize_input(input: &str) -> &str {
    let trimmed = input.trim();
    for quote in ['"', '\''] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return trimmed[1..trimmed.len() - 1].trim();
        }
    }
    trimmed
}

/// Decide whether the input is a local path or a remote reference
pub fn classify_input(input: &str) -> ProcessingResult<InputKind> {
    let input = normalize_input(input);

    if input.is_empty() {
        return Err(ProcessingError::InvalidInput("empty input".to_string()));
    }
    if input.contains('\0') {
        return Err(ProcessingError::InvalidInput(
            "input contains NUL bytes".to_string(),
        ));
    }

    if !input.contains("://") {
        return Ok(InputKind::Local(PathBuf::from(input)));
    }

    let url = reqwest::Url::parse(input)
        .map_err(|e| ProcessingError::InvalidInput(format!("{}: {}", input, e)))?;

    match url.scheme() {
        "http" | "https" if url.host_str().is_some_and(|h| !h.is_empty()) => {
            Ok(InputKind::Remote(url.to_string()))
        }
        "file" => url
            .to_file_path()
            .map(InputKind::Local)
            .map_err(|_| ProcessingError::InvalidInput(input.to_string())),
        _ => Err(ProcessingError::InvalidInput(input.to_string())),
    }
}

/// First non-empty sanitized string among the candidates
fn first_text<'a>(candidates: impl IntoIterator<Item = Option<&'a str>>) -> Option<String> {
    candidates
        .into_iter()
        .flatten()
        .map(sanitize)
        .find(|s| !s.is_empty())
}

/// Combine downloader metadata, downloader attributes and file-name defaults
///
/// Each field is evaluated independently: a title from the download result
/// does not stop the uploader from falling through to the attributes.
pub fn apply_metadata_fallbacks(
    last_metadata: Option<&DownloadMetadata>,
    attributes: &DownloaderAttributes,
    local_path: &Path,
) -> MixMetadata {
    let title = first_text([
        last_metadata.and_then(|m| m.title.as_deref()),
        attributes.title.as_deref(),
    ])
    .unwrap_or_else(|| file_stem_title(local_path));

    let uploader = first_text([
        last_metadata.and_then(|m| m.uploader.as_deref()),
        attributes.uploader.as_deref(),
    ])
    .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

    let duration = [last_metadata.and_then(|m| m.duration), attributes.duration]
        .into_iter()
        .flatten()
        .find(|d| d.is_finite() && *d > 0.0);

    MixMetadata::new(&title, &uploader, duration)
}

/// Resolves raw inputs into local audio files with metadata
pub struct InputResolver {
    downloader_factory: Arc<dyn DownloaderFactory>,
}

impl InputResolver {
    pub fn new(downloader_factory: Arc<dyn DownloaderFactory>) -> Self {
        Self { downloader_factory }
    }

    /// Resolve `input`, downloading remote media into `download_dir`
    pub async fn resolve(&self, input: &str, download_dir: &Path) -> ProcessingResult<ResolvedInput> {
        match classify_input(input)? {
            InputKind::Local(path) => Self::resolve_local(path),
            InputKind::Remote(url) => self.resolve_remote(url, download_dir).await,
        }
    }

    fn resolve_local(path: PathBuf) -> ProcessingResult<ResolvedInput> {
        if !path.exists() {
            return Err(ProcessingError::NotFound(path));
        }
        if !path.is_file() {
            return Err(ProcessingError::InvalidInput(format!(
                "{} is not a regular file",
                path.display()
            )));
        }

        let metadata = MixMetadata::new(&file_stem_title(&path), UNKNOWN_ARTIST, None);
        debug!(path = %path.display(), title = %metadata.title, "Resolved local input");

        Ok(ResolvedInput {
            source_label: path.display().to_string(),
            local_path: path,
            metadata,
            is_remote: false,
        })
    }

    async fn resolve_remote(&self, url: String, download_dir: &Path) -> ProcessingResult<ResolvedInput> {
        let acquisition_error = |message: String| ProcessingError::Acquisition {
            reference: url.clone(),
            message,
        };

        let downloader = self
            .downloader_factory
            .create_downloader(&url)
            .ok_or_else(|| acquisition_error("Failed to create downloader".to_string()))?;

        info!(url = %url, downloader = downloader.name(), "Downloading remote input");

        let local_path = downloader
            .download(&url, download_dir)
            .await
            .map_err(|e| acquisition_error(e.to_string()))?
            .ok_or_else(|| acquisition_error("Download produced no audio file".to_string()))?;

        let last_metadata = downloader.last_metadata();
        if last_metadata.is_none() {
            warn!(url = %url, "Downloader returned no metadata, using fallbacks");
        }
        let metadata =
            apply_metadata_fallbacks(last_metadata.as_ref(), &downloader.attributes(), &local_path);

        info!(
            url = %url,
            path = %local_path.display(),
            title = %metadata.title,
            uploader = %metadata.uploader,
            "Remote input downloaded"
        );

        Ok(ResolvedInput {
            local_path,
            source_label: url,
            metadata,
            is_remote: true,
        })
    }
}
