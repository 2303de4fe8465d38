//! Test helpers: fake backends and a throwaway run environment

#![allow(dead_code)]

use async_trait::async_trait;
use mixid::models::{AudioSegment, SegmentPlan, Track};
use mixid::services::downloader::{DownloadError, DownloadMetadata, Downloader, DownloaderFactory};
use mixid::services::duration_probe::{DurationProbe, ProbeError};
use mixid::services::recognition::RecognitionBackend;
use mixid::services::transcoder::{SegmentTranscoder, TranscodeError};
use mixid::services::{Backends, OutputWriter, WorkflowOrchestrator};
use mixid_common::config::MixidConfig;
use mixid_common::events::{EventBus, MixidEvent};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use tempfile::TempDir;
use tokio::sync::{broadcast, Notify};
use tokio_util::sync::CancellationToken;

/// Probe reporting a fixed duration; optionally cancels a token when called
pub struct FixedDurationProbe {
    pub seconds: f64,
    pub cancel_on_probe: OnceLock<CancellationToken>,
}

impl FixedDurationProbe {
    pub fn new(seconds: f64) -> Self {
        Self {
            seconds,
            cancel_on_probe: OnceLock::new(),
        }
    }
}

impl DurationProbe for FixedDurationProbe {
    fn probe(&self, _path: &Path) -> Result<f64, ProbeError> {
        if let Some(token) = self.cancel_on_probe.get() {
            token.cancel();
        }
        Ok(self.seconds)
    }
}

/// Writes a fixed-size file per plan and counts invocations
pub struct FakeTranscoder {
    pub calls: AtomicUsize,
    pub fail_starts: HashSet<u32>,
    pub fail_all: bool,
    pub output_bytes: usize,
}

impl FakeTranscoder {
    pub fn new() -> Self {
        Self {
            calls: AtomicUsize::new(0),
            fail_starts: HashSet::new(),
            fail_all: false,
            output_bytes: 2048,
        }
    }

    pub fn failing_all() -> Self {
        Self {
            fail_all: true,
            ..Self::new()
        }
    }

    pub fn failing_at(starts: &[u32]) -> Self {
        Self {
            fail_starts: starts.iter().copied().collect(),
            ..Self::new()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl SegmentTranscoder for FakeTranscoder {
    fn transcode(&self, _source: &Path, plan: &SegmentPlan) -> Result<(), TranscodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_all || self.fail_starts.contains(&(plan.start_time as u32)) {
            return Err(TranscodeError::Failed {
                status: Some(1),
                stderr: "simulated transcode failure".to_string(),
            });
        }
        std::fs::write(&plan.output_path, vec![0u8; self.output_bytes])
            .map_err(|e| TranscodeError::ExecutionError(e.to_string()))
    }
}

/// Returns canned tracks and records what it was asked
pub struct FakeRecognizer {
    pub tracks: Vec<Track>,
    pub fail: bool,
    pub calls: AtomicUsize,
    pub closed: AtomicBool,
    pub seen_starts: Mutex<Vec<u32>>,
}

impl FakeRecognizer {
    pub fn returning(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            fail: false,
            calls: AtomicUsize::new(0),
            closed: AtomicBool::new(false),
            seen_starts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::returning(Vec::new())
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn was_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn seen_starts(&self) -> Vec<u32> {
        self.seen_starts.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecognitionBackend for FakeRecognizer {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn identify_tracks(&self, segments: &[AudioSegment]) -> anyhow::Result<Vec<Track>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.seen_starts.lock().unwrap() = segments.iter().map(|s| s.start_time()).collect();
        if self.fail {
            anyhow::bail!("simulated backend outage");
        }
        Ok(self.tracks.clone())
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

/// Blocks inside recognition until released, then checks its segments
/// are still on disk
pub struct GatedRecognizer {
    pub tracks: Vec<Track>,
    pub entered: Notify,
    pub release: Notify,
    pub segments_intact: AtomicBool,
}

impl GatedRecognizer {
    pub fn new(tracks: Vec<Track>) -> Self {
        Self {
            tracks,
            entered: Notify::new(),
            release: Notify::new(),
            segments_intact: AtomicBool::new(false),
        }
    }

    pub fn segments_intact(&self) -> bool {
        self.segments_intact.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RecognitionBackend for GatedRecognizer {
    fn name(&self) -> &'static str {
        "gated"
    }

    async fn identify_tracks(&self, segments: &[AudioSegment]) -> anyhow::Result<Vec<Track>> {
        self.entered.notify_one();
        self.release.notified().await;

        let intact = segments.iter().all(|s| s.file_path().exists());
        self.segments_intact.store(intact, Ordering::SeqCst);
        Ok(self.tracks.clone())
    }
}

/// Factory that never supports a reference
pub struct NoDownloaders;

impl DownloaderFactory for NoDownloaders {
    fn create_downloader(&self, _reference: &str) -> Option<Box<dyn Downloader>> {
        None
    }
}

/// "Downloads" by copying a local fixture into the target directory
pub struct CopyDownloaderFactory {
    pub fixture: PathBuf,
    pub metadata: Option<DownloadMetadata>,
}

struct CopyDownloader {
    fixture: PathBuf,
    metadata: Option<DownloadMetadata>,
    downloaded: AtomicBool,
}

#[async_trait]
impl Downloader for CopyDownloader {
    fn name(&self) -> &'static str {
        "copy"
    }

    async fn download(
        &self,
        _reference: &str,
        target_dir: &Path,
    ) -> Result<Option<PathBuf>, DownloadError> {
        let target = target_dir.join("downloaded.mp3");
        std::fs::copy(&self.fixture, &target)?;
        self.downloaded.store(true, Ordering::SeqCst);
        Ok(Some(target))
    }

    fn last_metadata(&self) -> Option<DownloadMetadata> {
        if self.downloaded.load(Ordering::SeqCst) {
            self.metadata.clone()
        } else {
            None
        }
    }
}

impl DownloaderFactory for CopyDownloaderFactory {
    fn create_downloader(&self, _reference: &str) -> Option<Box<dyn Downloader>> {
        Some(Box::new(CopyDownloader {
            fixture: self.fixture.clone(),
            metadata: self.metadata.clone(),
            downloaded: AtomicBool::new(false),
        }))
    }
}

/// Temporary directories and an input file for one test
pub struct TestEnv {
    pub temp: TempDir,
    pub input_path: PathBuf,
    pub config: MixidConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let temp = TempDir::new().unwrap();
        let input_path = temp.path().join("Friday Night Mix.mp3");
        std::fs::write(&input_path, vec![0u8; 4096]).unwrap();

        let config = MixidConfig {
            temp_dir: temp.path().join("work"),
            output_dir: temp.path().join("tracklists"),
            ..MixidConfig::default()
        };

        Self {
            temp,
            input_path,
            config,
        }
    }

    pub fn input(&self) -> String {
        self.input_path.display().to_string()
    }

    pub fn output_dir(&self) -> PathBuf {
        self.config.output_dir.clone()
    }

    /// Backends for a local input of `seconds` length
    pub fn backends(
        &self,
        seconds: f64,
        transcoder: Arc<FakeTranscoder>,
        recognizer: Arc<FakeRecognizer>,
    ) -> Backends {
        Backends {
            downloader_factory: Arc::new(NoDownloaders),
            duration_probe: Arc::new(FixedDurationProbe::new(seconds)),
            transcoder,
            recognizer,
            output_writer: OutputWriter::new(self.output_dir()),
        }
    }

    pub fn orchestrator(&self, backends: Backends) -> WorkflowOrchestrator {
        WorkflowOrchestrator::new(self.config.clone(), backends, EventBus::new(256))
    }
}

/// Two tracks heard in the first two windows
pub fn sample_tracks() -> Vec<Track> {
    vec![
        Track::new("Artist A", "Song B").at(0).with_confidence(0.9),
        Track::new("Artist C", "Song D").at(50).with_confidence(0.8),
    ]
}

/// Everything currently queued on a receiver
pub fn drain_events(rx: &mut broadcast::Receiver<MixidEvent>) -> Vec<MixidEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}
