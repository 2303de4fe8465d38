//! Configuration loading and validation
//!
//! Settings are layered, lowest priority first:
//! 1. Built-in defaults (code constants)
//! 2. TOML configuration file
//! 3. Environment variables and command-line arguments (applied by the binary)
//!
//! A missing configuration file is not an error: the defaults are used and a
//! warning is logged. An explicitly requested file that is missing or malformed
//! is an error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Seconds of audio per analysis window
pub const DEFAULT_SEGMENT_LENGTH: u32 = 60;

/// Seconds shared by consecutive windows
pub const DEFAULT_OVERLAP_DURATION: u32 = 10;

/// Transcoded segments at or below this size are treated as corrupt
pub const DEFAULT_MIN_SEGMENT_BYTES: u64 = 1000;

/// Tracklist format written when none is requested
pub const DEFAULT_OUTPUT_FORMAT: &str = "json";

const CONFIG_DIR_NAME: &str = "mixid";
const CONFIG_FILE_NAME: &str = "mixid.toml";

/// Configuration file contents
///
/// Every field is optional so that a partial file only overrides what it names.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segment_length: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overlap_duration: Option<u32>,

    /// Parent directory for per-run working directories
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp_dir: Option<PathBuf>,

    /// Directory tracklist files are written to
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,

    /// Output format: json, markdown, m3u or all
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_format: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debug: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_segment_bytes: Option<u64>,

    /// Tracks recognized with a lower confidence are discarded (0.0 - 1.0)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_confidence: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ffmpeg_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fpcalc_path: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub yt_dlp_path: Option<String>,

    /// AcoustID application key (environment variable takes priority)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acoustid_api_key: Option<String>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Fully resolved runtime configuration
///
/// Built once at startup and handed to the orchestrator; nothing reads
/// configuration from process-wide state after that.
#[derive(Debug, Clone, PartialEq)]
pub struct MixidConfig {
    pub segment_length: u32,
    pub overlap_duration: u32,
    pub temp_dir: PathBuf,
    pub output_dir: PathBuf,
    pub output_format: String,
    pub debug: bool,
    pub min_segment_bytes: u64,
    pub min_confidence: f64,
    pub ffmpeg_path: String,
    pub fpcalc_path: String,
    pub yt_dlp_path: String,
    pub logging: LoggingConfig,
}

impl Default for MixidConfig {
    fn default() -> Self {
        Self {
            segment_length: DEFAULT_SEGMENT_LENGTH,
            overlap_duration: DEFAULT_OVERLAP_DURATION,
            temp_dir: std::env::temp_dir().join(CONFIG_DIR_NAME),
            output_dir: PathBuf::from("tracklists"),
            output_format: DEFAULT_OUTPUT_FORMAT.to_string(),
            debug: false,
            min_segment_bytes: DEFAULT_MIN_SEGMENT_BYTES,
            min_confidence: 0.0,
            ffmpeg_path: "ffmpeg".to_string(),
            fpcalc_path: "fpcalc".to_string(),
            yt_dlp_path: "yt-dlp".to_string(),
            logging: LoggingConfig::default(),
        }
    }
}

impl MixidConfig {
    /// Apply a configuration file on top of the built-in defaults
    pub fn from_toml(file: &TomlConfig) -> Self {
        let defaults = Self::default();
        Self {
            segment_length: file.segment_length.unwrap_or(defaults.segment_length),
            overlap_duration: file.overlap_duration.unwrap_or(defaults.overlap_duration),
            temp_dir: file.temp_dir.clone().unwrap_or(defaults.temp_dir),
            output_dir: file.output_dir.clone().unwrap_or(defaults.output_dir),
            output_format: file
                .output_format
                .clone()
                .unwrap_or(defaults.output_format),
            debug: file.debug.unwrap_or(defaults.debug),
            min_segment_bytes: file.min_segment_bytes.unwrap_or(defaults.min_segment_bytes),
            min_confidence: file.min_confidence.unwrap_or(defaults.min_confidence),
            ffmpeg_path: file.ffmpeg_path.clone().unwrap_or(defaults.ffmpeg_path),
            fpcalc_path: file.fpcalc_path.clone().unwrap_or(defaults.fpcalc_path),
            yt_dlp_path: file.yt_dlp_path.clone().unwrap_or(defaults.yt_dlp_path),
            logging: file.logging.clone(),
        }
    }

    /// Distance in seconds between the starts of consecutive windows
    pub fn step(&self) -> u32 {
        self.segment_length.saturating_sub(self.overlap_duration)
    }

    /// Check the invariants the segment planner relies on
    pub fn validate(&self) -> Result<()> {
        if self.segment_length == 0 {
            return Err(Error::Config(
                "segment_length must be greater than 0".to_string(),
            ));
        }

        if self.overlap_duration >= self.segment_length {
            return Err(Error::Config(format!(
                "overlap_duration ({}s) must be less than segment_length ({}s)",
                self.overlap_duration, self.segment_length
            )));
        }

        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(Error::Config(format!(
                "min_confidence must be between 0.0 and 1.0, got {}",
                self.min_confidence
            )));
        }

        if self.output_format.trim().is_empty() {
            return Err(Error::Config("output_format must not be empty".to_string()));
        }

        Ok(())
    }
}

/// Per-user configuration file location, whether or not it exists
pub fn default_user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Locate the configuration file when none was given on the command line
///
/// Linux checks `~/.config/mixid/mixid.toml` then `/etc/mixid/mixid.toml`;
/// other platforms only check the user configuration directory.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = default_user_config_path() {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc")
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME);
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Parse a TOML configuration file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load the configuration file, degrading to defaults when none exists
///
/// Returns the parsed file together with the path it came from.
pub fn load_config(explicit_path: Option<&Path>) -> Result<(TomlConfig, Option<PathBuf>)> {
    if let Some(path) = explicit_path {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = load_toml_config(path)?;
        debug!(path = %path.display(), "Loaded configuration file");
        return Ok((config, Some(path.to_path_buf())));
    }

    match default_config_path() {
        Some(path) => {
            let config = load_toml_config(&path)?;
            debug!(path = %path.display(), "Loaded configuration file");
            Ok((config, Some(path)))
        }
        None => {
            warn!("No configuration file found, using built-in defaults");
            Ok((TomlConfig::default(), None))
        }
    }
}

/// Write a configuration file atomically
///
/// Content goes to `<path>.tmp` first and is renamed over the target, so a
/// crash never leaves a half-written file. On Unix the file is made 0600
/// because it may hold an API key.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut temp_name = path.as_os_str().to_owned();
    temp_name.push(".tmp");
    let temp_path = PathBuf::from(temp_name);

    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    std::fs::rename(&temp_path, path)?;
    Ok(())
}
