//! Services for mixid

pub mod acoustid_client;
pub mod downloader;
pub mod duration_probe;
pub mod exporters;
pub mod input_resolver;
pub mod mix_info_builder;
pub mod output_writer;
pub mod recognition;
pub mod segment_materializer;
pub mod segment_planner;
pub mod transcoder;
pub mod workflow_orchestrator;

pub use acoustid_client::{AcoustIdClient, AcoustIdError, AcoustIdRecognizer};
pub use downloader::{
    DownloadError, DownloadMetadata, Downloader, DownloaderAttributes, DownloaderFactory,
    YtDlpDownloaderFactory,
};
pub use duration_probe::{DurationProbe, LoftyDurationProbe, ProbeError};
pub use exporters::{ExportError, TracklistExporter, TracklistOutput};
pub use input_resolver::{InputResolver, ResolvedInput};
pub use output_writer::OutputWriter;
pub use recognition::{
    RecognitionBackend, RecognitionDispatcher, RecognitionError, RecognitionOutcome,
};
pub use segment_materializer::SegmentMaterializer;
pub use transcoder::{FfmpegTranscoder, SegmentTranscoder, TranscodeError};
pub use workflow_orchestrator::{Backends, RunReport, WorkflowOrchestrator};
