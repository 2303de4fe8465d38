//! Processing workflow orchestrator
//!
//! Drives one mix through the run state machine:
//!
//! IDLE → RESOLVING → SEGMENTING → RECOGNIZING → EXPORTING → CLEANING_UP → DONE
//!
//! Each active state is handled by a dedicated `phase_*` method. The
//! shutdown token is checked before every stage; once it fires no further
//! stage starts. Whatever happens, the run passes through CLEANING_UP before
//! it records its terminal state (DONE, FAILED or CANCELLED).

use crate::error::{ProcessingError, ProcessingResult};
use crate::models::{MixInfo, MixMetadata, RunState, RunStatus, Track};
use crate::services::downloader::DownloaderFactory;
use crate::services::duration_probe::DurationProbe;
use crate::services::input_resolver::InputResolver;
use crate::services::output_writer::OutputWriter;
use crate::services::recognition::{RecognitionBackend, RecognitionDispatcher};
use crate::services::segment_materializer::SegmentMaterializer;
use crate::services::transcoder::SegmentTranscoder;
use chrono::Utc;
use mixid_common::config::MixidConfig;
use mixid_common::events::{EventBus, MixidEvent};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

mod cleanup;
mod phase_exporting;
mod phase_recognizing;
mod phase_resolving;
mod phase_segmenting;
mod work_dir_lock;

pub use cleanup::remove_work_dir;
pub use work_dir_lock::WorkDirLock;

/// External collaborators of a run
pub struct Backends {
    pub downloader_factory: Arc<dyn DownloaderFactory>,
    pub duration_probe: Arc<dyn DurationProbe>,
    pub transcoder: Arc<dyn SegmentTranscoder>,
    pub recognizer: Arc<dyn RecognitionBackend>,
    pub output_writer: OutputWriter,
}

/// Summary of a successful run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    /// URL or local path the mix came from
    pub source: String,
    pub mix_info: MixInfo,
    pub tracks: Vec<Track>,
    /// Tracklist files written (may be empty if every export failed)
    pub written_files: Vec<PathBuf>,
    pub segments_created: usize,
    pub status: RunStatus,
}

/// Mutable state threaded through the phases of one run
struct RunContext {
    status: RunStatus,
    work_dir: PathBuf,
    source_label: String,
    metadata: MixMetadata,
    segments_created: usize,
    /// Set once RESOLVING owns the working directory
    work_dir_lock: Option<WorkDirLock>,
}

impl RunContext {
    fn new(input: &str, work_dir: PathBuf) -> Self {
        Self {
            status: RunStatus::new(input),
            work_dir,
            source_label: input.trim().to_string(),
            metadata: MixMetadata::default(),
            segments_created: 0,
            work_dir_lock: None,
        }
    }

    fn run_id(&self) -> Uuid {
        self.status.run_id
    }
}

/// What the stages produce on the success path
struct StageOutput {
    mix_info: MixInfo,
    tracks: Vec<Track>,
    written_files: Vec<PathBuf>,
}

/// Per-input working directory: `temp_dir/<first 16 hex chars of sha256(input)>`
///
/// Stable across runs of the same input, distinct between inputs. A run
/// only uses it while holding its [`WorkDirLock`].
pub fn work_dir_for(temp_dir: &Path, input: &str) -> PathBuf {
    let digest = Sha256::digest(input.trim().as_bytes());
    let name: String = digest
        .iter()
        .take(8)
        .map(|byte| format!("{:02x}", byte))
        .collect();
    temp_dir.join(name)
}

/// Workflow orchestrator service
pub struct WorkflowOrchestrator {
    config: Arc<MixidConfig>,
    event_bus: EventBus,
    resolver: InputResolver,
    duration_probe: Arc<dyn DurationProbe>,
    materializer: SegmentMaterializer,
    dispatcher: RecognitionDispatcher,
    output_writer: OutputWriter,
    shutdown: CancellationToken,
    last_status: Mutex<Option<RunStatus>>,
}

impl WorkflowOrchestrator {
    /// Create new workflow orchestrator
    ///
    /// `config` should already be validated.
    pub fn new(config: MixidConfig, backends: Backends, event_bus: EventBus) -> Self {
        let materializer =
            SegmentMaterializer::new(backends.transcoder, config.min_segment_bytes);
        let dispatcher = RecognitionDispatcher::new(backends.recognizer, config.min_confidence);

        Self {
            resolver: InputResolver::new(backends.downloader_factory),
            duration_probe: backends.duration_probe,
            materializer,
            dispatcher,
            output_writer: backends.output_writer,
            config: Arc::new(config),
            event_bus,
            shutdown: CancellationToken::new(),
            last_status: Mutex::new(None),
        }
    }

    pub fn config(&self) -> &MixidConfig {
        &self.config
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Token that stops the run before its next stage when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Request shutdown; the current stage finishes, cleanup still runs
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }

    /// Status of the most recent run, including failed ones
    pub fn last_status(&self) -> Option<RunStatus> {
        self.last_status.lock().ok().and_then(|s| s.clone())
    }

    /// Process one mix end to end
    pub async fn process_input(&self, input: &str) -> ProcessingResult<RunReport> {
        let mut run = RunContext::new(input, work_dir_for(&self.config.temp_dir, input));
        let run_id = run.run_id();

        tracing::info!(
            run_id = %run_id,
            input = %run.source_label,
            work_dir = %run.work_dir.display(),
            "Starting run"
        );

        self.event_bus.emit_lossy(MixidEvent::RunStarted {
            run_id,
            input: input.to_string(),
            timestamp: Utc::now(),
        });

        let outcome = self.run_stages(&mut run).await;

        if outcome.is_err() {
            run.status.exited_from = Some(run.status.state);
        }
        self.transition(&mut run, RunState::CleaningUp);
        self.cleanup(&mut run).await;

        let terminal = match &outcome {
            Ok(_) => RunState::Done,
            Err(e) if e.is_cancelled() => RunState::Cancelled,
            Err(_) => RunState::Failed,
        };
        self.transition(&mut run, terminal);

        match &outcome {
            Ok(output) => tracing::info!(
                run_id = %run_id,
                tracks = output.tracks.len(),
                files = output.written_files.len(),
                "Run completed"
            ),
            Err(e) if e.is_cancelled() => tracing::warn!(run_id = %run_id, error = %e, "Run cancelled"),
            Err(e) if self.config.debug => tracing::error!(
                run_id = %run_id,
                exited_from = ?run.status.exited_from,
                error = ?e,
                "Run failed"
            ),
            Err(e) => tracing::error!(run_id = %run_id, error = %e, "Run failed"),
        }

        self.event_bus.emit_lossy(MixidEvent::RunFinished {
            run_id,
            state: terminal.to_string(),
            track_count: outcome.as_ref().map(|o| o.tracks.len()).unwrap_or(0),
            written_files: outcome
                .as_ref()
                .map(|o| {
                    o.written_files
                        .iter()
                        .map(|p| p.display().to_string())
                        .collect()
                })
                .unwrap_or_default(),
            error: outcome.as_ref().err().map(|e| e.to_string()),
            timestamp: Utc::now(),
        });

        if let Ok(mut last) = self.last_status.lock() {
            *last = Some(run.status.clone());
        }

        outcome.map(|output| RunReport {
            run_id,
            source: run.source_label,
            mix_info: output.mix_info,
            tracks: output.tracks,
            written_files: output.written_files,
            segments_created: run.segments_created,
            status: run.status,
        })
    }

    async fn run_stages(&self, run: &mut RunContext) -> ProcessingResult<StageOutput> {
        self.enter_stage(run, RunState::Resolving)?;
        let resolved = self.phase_resolving(run).await?;

        self.enter_stage(run, RunState::Segmenting)?;
        let segments = self.phase_segmenting(run, &resolved.local_path).await?;

        self.enter_stage(run, RunState::Recognizing)?;
        let tracks = self.phase_recognizing(run, &segments).await?;

        self.enter_stage(run, RunState::Exporting)?;
        let (mix_info, written_files) = self.phase_exporting(run, &tracks).await;

        Ok(StageOutput {
            mix_info,
            tracks,
            written_files,
        })
    }

    fn enter_stage(&self, run: &mut RunContext, stage: RunState) -> ProcessingResult<()> {
        if self.shutdown.is_cancelled() {
            tracing::warn!(
                run_id = %run.run_id(),
                stage = %stage,
                "Shutdown requested, not starting stage"
            );
            return Err(ProcessingError::Cancelled { stage });
        }
        self.transition(run, stage);
        Ok(())
    }

    fn transition(&self, run: &mut RunContext, new_state: RunState) {
        let transition = run.status.transition_to(new_state);

        tracing::info!(
            run_id = %transition.run_id,
            from = %transition.old_state,
            to = %transition.new_state,
            "Run state changed"
        );

        self.event_bus.emit_lossy(MixidEvent::StateChanged {
            run_id: transition.run_id,
            old_state: transition.old_state.to_string(),
            new_state: transition.new_state.to_string(),
            timestamp: transition.transitioned_at,
        });
    }
}
