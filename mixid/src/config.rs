//! Configuration resolution for the mixid binary
//!
//! Layers command-line and environment overrides on top of the TOML file
//! and resolves the AcoustID API key (environment → TOML).

use mixid_common::config::{write_toml_config, MixidConfig, TomlConfig};
use mixid_common::{Error, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable holding the AcoustID API key
pub const ACOUSTID_API_KEY_ENV: &str = "MIXID_ACOUSTID_API_KEY";

/// Where a resolved API key came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    Environment,
    Toml,
}

impl std::fmt::Display for KeySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            KeySource::Environment => f.write_str("environment"),
            KeySource::Toml => f.write_str("TOML"),
        }
    }
}

/// Settings given on the command line (or their `MIXID_*` variables)
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigOverrides {
    pub output_format: Option<String>,
    pub output_dir: Option<PathBuf>,
    pub temp_dir: Option<PathBuf>,
    pub segment_length: Option<u32>,
    pub overlap_duration: Option<u32>,
    pub min_confidence: Option<f64>,
    pub debug: bool,
}

/// Defaults → TOML file → overrides, then validation
pub fn resolve_config(file: &TomlConfig, overrides: &ConfigOverrides) -> Result<MixidConfig> {
    let mut config = MixidConfig::from_toml(file);

    if let Some(format) = &overrides.output_format {
        config.output_format = format.clone();
    }
    if let Some(dir) = &overrides.output_dir {
        config.output_dir = dir.clone();
    }
    if let Some(dir) = &overrides.temp_dir {
        config.temp_dir = dir.clone();
    }
    if let Some(length) = overrides.segment_length {
        config.segment_length = length;
    }
    if let Some(overlap) = overrides.overlap_duration {
        config.overlap_duration = overlap;
    }
    if let Some(confidence) = overrides.min_confidence {
        config.min_confidence = confidence;
    }
    if overrides.debug {
        config.debug = true;
    }

    config.validate()?;
    Ok(config)
}

/// Resolve AcoustID API key
///
/// **Priority:** ENV → TOML
pub fn resolve_acoustid_api_key(toml_config: &TomlConfig) -> Result<(String, KeySource)> {
    let env_key = std::env::var(ACOUSTID_API_KEY_ENV)
        .ok()
        .filter(|k| is_valid_key(k));
    let toml_key = toml_config
        .acoustid_api_key
        .as_ref()
        .filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!("AcoustID API key found in environment and TOML. Using environment (highest priority).");
    }

    if let Some(key) = env_key {
        info!("AcoustID API key loaded from environment variable");
        return Ok((key.trim().to_string(), KeySource::Environment));
    }

    if let Some(key) = toml_key {
        info!("AcoustID API key loaded from TOML config");
        return Ok((key.trim().to_string(), KeySource::Toml));
    }

    Err(Error::Config(format!(
        "AcoustID API key not configured. Please configure using one of:\n\
         1. Environment: {}=your-key-here\n\
         2. TOML config: ~/.config/mixid/mixid.toml (acoustid_api_key = \"your-key\")\n\
         \n\
         Obtain API key at: https://acoustid.org/new-application",
        ACOUSTID_API_KEY_ENV
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Store the API key in the TOML file, keeping every other setting
pub fn persist_acoustid_api_key(key: &str, toml_path: &Path) -> Result<()> {
    let mut config = if toml_path.exists() {
        mixid_common::config::load_toml_config(toml_path)?
    } else {
        TomlConfig::default()
    };

    config.acoustid_api_key = Some(key.to_string());
    write_toml_config(&config, toml_path)?;

    info!(path = %toml_path.display(), "AcoustID API key saved to TOML config");
    Ok(())
}
