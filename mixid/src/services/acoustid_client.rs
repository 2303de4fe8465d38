//! AcoustID recognition backend
//!
//! Fingerprints every segment with `fpcalc`, looks the fingerprint up on
//! the AcoustID web service (rate limited to 3 requests per second) and
//! turns the best scoring recording into a [`Track`].

use crate::models::{AudioSegment, Track, UNKNOWN_ARTIST};
use crate::services::recognition::RecognitionBackend;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

const ACOUSTID_BASE_URL: &str = "https://api.acoustid.org/v2/lookup";
const USER_AGENT: &str = concat!("mixid/", env!("CARGO_PKG_VERSION"));
const RATE_LIMIT_MS: u64 = 334; // 3 requests per second

/// Lookup results scoring below this are ignored
pub const MIN_LOOKUP_SCORE: f64 = 0.5;

/// Neighbouring tracks at least this similar are the same track
pub const DUPLICATE_SIMILARITY: f64 = 0.9;

/// AcoustID client errors
#[derive(Debug, Error)]
pub enum AcoustIdError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("No matches found for fingerprint")]
    NoMatches,

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("fpcalc binary not found: {0}")]
    BinaryNotFound(String),

    #[error("Fingerprinting failed: {0}")]
    FingerprintError(String),
}

/// AcoustID lookup response
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdResponse {
    pub status: String,
    #[serde(default)]
    pub results: Vec<AcoustIdResult>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdResult {
    pub id: String,
    pub score: f64,
    pub recordings: Option<Vec<AcoustIdRecording>>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdRecording {
    pub id: String,
    pub title: Option<String>,
    pub artists: Option<Vec<AcoustIdArtist>>,
    pub duration: Option<f64>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AcoustIdArtist {
    pub id: String,
    pub name: String,
}

/// Error body returned with non-success statuses
#[derive(Debug, Deserialize)]
struct AcoustIdErrorBody {
    error: AcoustIdErrorDetail,
}

#[derive(Debug, Deserialize)]
struct AcoustIdErrorDetail {
    code: u32,
    #[serde(default)]
    message: String,
}

/// AcoustID error code for a missing or invalid client key
const INVALID_API_KEY_CODE: u32 = 4;

/// Map a failed lookup response to an error
///
/// The service reports a bad key as HTTP 400 with error code 4, not 401.
pub fn error_from_response(status: u16, body: &str) -> AcoustIdError {
    if status == reqwest::StatusCode::UNAUTHORIZED.as_u16() {
        return AcoustIdError::InvalidApiKey;
    }

    match serde_json::from_str::<AcoustIdErrorBody>(body) {
        Ok(parsed) if parsed.error.code == INVALID_API_KEY_CODE => AcoustIdError::InvalidApiKey,
        Ok(parsed) => AcoustIdError::ApiError(status, parsed.error.message),
        Err(_) => AcoustIdError::ApiError(status, body.to_string()),
    }
}

/// Output of `fpcalc -json`
#[derive(Debug, Clone, Deserialize)]
pub struct Fingerprint {
    pub duration: f64,
    pub fingerprint: String,
}

/// Run `fpcalc` on one file (blocking)
pub fn fingerprint_file(fpcalc_path: &str, path: &Path) -> Result<Fingerprint, AcoustIdError> {
    let output = Command::new(fpcalc_path)
        .arg("-json")
        .arg(path)
        .output()
        .map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                AcoustIdError::BinaryNotFound(fpcalc_path.to_string())
            } else {
                AcoustIdError::FingerprintError(e.to_string())
            }
        })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(AcoustIdError::FingerprintError(stderr.trim().to_string()));
    }

    serde_json::from_slice(&output.stdout).map_err(|e| AcoustIdError::ParseError(e.to_string()))
}

/// Rate limiter for AcoustID (3 req/sec)
struct RateLimiter {
    last_request: Mutex<Option<Instant>>,
    min_interval: Duration,
}

impl RateLimiter {
    fn new(min_interval_ms: u64) -> Self {
        Self {
            last_request: Mutex::new(None),
            min_interval: Duration::from_millis(min_interval_ms),
        }
    }

    async fn wait(&self) {
        let mut last = self.last_request.lock().await;

        if let Some(last_time) = *last {
            let elapsed = last_time.elapsed();
            if elapsed < self.min_interval {
                let wait_time = self.min_interval - elapsed;
                debug!("AcoustID rate limiting: waiting {:?}", wait_time);
                tokio::time::sleep(wait_time).await;
            }
        }

        *last = Some(Instant::now());
    }
}

/// AcoustID web service client
pub struct AcoustIdClient {
    http_client: reqwest::Client,
    rate_limiter: Arc<RateLimiter>,
    api_key: String,
}

impl AcoustIdClient {
    pub fn new(api_key: String) -> Result<Self, AcoustIdError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| AcoustIdError::NetworkError(e.to_string()))?;

        Ok(Self {
            http_client,
            rate_limiter: Arc::new(RateLimiter::new(RATE_LIMIT_MS)),
            api_key,
        })
    }

    /// Look up recordings matching a Chromaprint fingerprint
    pub async fn lookup(
        &self,
        fingerprint: &str,
        duration_seconds: u64,
    ) -> Result<AcoustIdResponse, AcoustIdError> {
        self.rate_limiter.wait().await;

        let duration = duration_seconds.to_string();
        let params = [
            ("client", self.api_key.as_str()),
            ("meta", "recordings"),
            ("duration", duration.as_str()),
            ("fingerprint", fingerprint),
        ];

        debug!(duration_seconds, "Querying AcoustID API");

        let response = self
            .http_client
            .post(ACOUSTID_BASE_URL)
            .form(&params)
            .send()
            .await
            .map_err(|e| AcoustIdError::NetworkError(e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_from_response(status.as_u16(), &error_text));
        }

        let response: AcoustIdResponse = response
            .json()
            .await
            .map_err(|e| AcoustIdError::ParseError(e.to_string()))?;

        if response.results.is_empty() {
            return Err(AcoustIdError::NoMatches);
        }

        Ok(response)
    }
}

/// Best titled recording among results scoring at least `min_score`
pub fn best_track(response: &AcoustIdResponse, min_score: f64) -> Option<Track> {
    let mut results: Vec<&AcoustIdResult> = response
        .results
        .iter()
        .filter(|r| r.score >= min_score)
        .collect();
    results.sort_by(|a, b| b.score.total_cmp(&a.score));

    results.into_iter().find_map(|result| {
        let recording = result
            .recordings
            .as_ref()?
            .iter()
            .find(|r| r.title.as_deref().is_some_and(|t| !t.trim().is_empty()))?;

        let artist = recording
            .artists
            .as_ref()
            .map(|artists| {
                artists
                    .iter()
                    .map(|a| a.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            })
            .filter(|name| !name.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());

        let title = recording.title.as_deref().unwrap_or_default().trim();
        Some(Track::new(artist, title).with_confidence(result.score))
    })
}

fn similarity_key(track: &Track) -> String {
    format!("{} - {}", track.artist.trim(), track.song_name.trim()).to_lowercase()
}

/// Collapse runs of the same track heard in consecutive segments
///
/// Overlapping windows usually recognize a track more than once. The merged
/// entry keeps the earliest position and the highest confidence.
pub fn merge_consecutive_duplicates(tracks: Vec<Track>) -> Vec<Track> {
    let mut merged: Vec<Track> = Vec::with_capacity(tracks.len());

    for track in tracks {
        if let Some(last) = merged.last_mut() {
            let similarity =
                strsim::normalized_levenshtein(&similarity_key(last), &similarity_key(&track));
            if similarity >= DUPLICATE_SIMILARITY {
                last.time_in_mix = last.time_in_mix.min(track.time_in_mix);
                last.confidence = last.confidence.max(track.confidence);
                continue;
            }
        }
        merged.push(track);
    }

    merged
}

/// [`RecognitionBackend`] backed by fpcalc and the AcoustID web service
pub struct AcoustIdRecognizer {
    client: AcoustIdClient,
    fpcalc_path: String,
}

impl AcoustIdRecognizer {
    pub fn new(api_key: String, fpcalc_path: impl Into<String>) -> Result<Self, AcoustIdError> {
        Ok(Self {
            client: AcoustIdClient::new(api_key)?,
            fpcalc_path: fpcalc_path.into(),
        })
    }

    async fn identify_segment(&self, segment: &AudioSegment) -> Result<Option<Track>, AcoustIdError> {
        let fpcalc = self.fpcalc_path.clone();
        let path = segment.file_path().to_path_buf();
        let fingerprint = tokio::task::spawn_blocking(move || fingerprint_file(&fpcalc, &path))
            .await
            .map_err(|e| AcoustIdError::FingerprintError(e.to_string()))??;

        let duration = fingerprint.duration.max(0.0).round() as u64;
        match self.client.lookup(&fingerprint.fingerprint, duration).await {
            Ok(response) => Ok(best_track(&response, MIN_LOOKUP_SCORE)
                .map(|track| track.at(segment.start_time()))),
            Err(AcoustIdError::NoMatches) => Ok(None),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl RecognitionBackend for AcoustIdRecognizer {
    fn name(&self) -> &'static str {
        "acoustid"
    }

    async fn identify_tracks(&self, segments: &[AudioSegment]) -> anyhow::Result<Vec<Track>> {
        let mut tracks = Vec::new();

        for segment in segments {
            match self.identify_segment(segment).await {
                Ok(Some(track)) => {
                    debug!(
                        segment_start = segment.start_time(),
                        artist = %track.artist,
                        song = %track.song_name,
                        confidence = track.confidence,
                        "Segment recognized"
                    );
                    tracks.push(track);
                }
                Ok(None) => {
                    debug!(segment_start = segment.start_time(), "No match for segment");
                }
                // Every further segment would fail the same way
                Err(e @ (AcoustIdError::InvalidApiKey | AcoustIdError::BinaryNotFound(_))) => {
                    return Err(e.into());
                }
                Err(e) => {
                    warn!(
                        segment_start = segment.start_time(),
                        error = %e,
                        "Segment recognition failed"
                    );
                }
            }
        }

        let recognized = tracks.len();
        let merged = merge_consecutive_duplicates(tracks);
        info!(recognized, distinct = merged.len(), "AcoustID recognition finished");

        Ok(merged)
    }

    async fn close(&self) {
        debug!("AcoustID backend closed");
    }
}
