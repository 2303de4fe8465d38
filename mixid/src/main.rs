//! mixid command-line entry point

use anyhow::{Context, Result};
use clap::Parser;
use mixid::config::{persist_acoustid_api_key, resolve_acoustid_api_key, resolve_config, ConfigOverrides, KeySource};
use mixid::services::{
    AcoustIdRecognizer, Backends, FfmpegTranscoder, LoftyDurationProbe, OutputWriter,
    WorkflowOrchestrator, YtDlpDownloaderFactory,
};
use mixid_common::config::{default_user_config_path, load_config, MixidConfig};
use mixid_common::events::{EventBus, MixidEvent};
use mixid_common::human_time::format_timestamp;
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tokio::signal;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Command-line arguments for mixid
#[derive(Parser, Debug)]
#[command(name = "mixid", version, about = "Identify the tracks played in a DJ mix")]
struct Args {
    /// Local audio file or http(s) URL of the mix
    input: String,

    /// Configuration file (default: ~/.config/mixid/mixid.toml)
    #[arg(short, long, env = "MIXID_CONFIG")]
    config: Option<PathBuf>,

    /// Output format: json, markdown, m3u or all
    #[arg(short, long, env = "MIXID_OUTPUT_FORMAT")]
    format: Option<String>,

    /// Directory tracklist files are written to
    #[arg(short, long, env = "MIXID_OUTPUT_DIR")]
    output_dir: Option<PathBuf>,

    /// Parent directory for working files
    #[arg(long, env = "MIXID_TEMP_DIR")]
    temp_dir: Option<PathBuf>,

    /// Seconds of audio per analysis window
    #[arg(long, env = "MIXID_SEGMENT_LENGTH")]
    segment_length: Option<u32>,

    /// Seconds shared by consecutive windows
    #[arg(long, env = "MIXID_OVERLAP_DURATION")]
    overlap: Option<u32>,

    /// Discard tracks recognized with lower confidence (0.0 - 1.0)
    #[arg(long, env = "MIXID_MIN_CONFIDENCE")]
    min_confidence: Option<f64>,

    /// Verbose logging and full error detail
    #[arg(short, long)]
    debug: bool,

    /// Save an API key taken from the environment into the user config file
    #[arg(long)]
    save_api_key: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (file_config, config_path) =
        load_config(args.config.as_deref()).context("Failed to load configuration")?;

    let overrides = ConfigOverrides {
        output_format: args.format.clone(),
        output_dir: args.output_dir.clone(),
        temp_dir: args.temp_dir.clone(),
        segment_length: args.segment_length,
        overlap_duration: args.overlap,
        min_confidence: args.min_confidence,
        debug: args.debug,
    };
    let config = resolve_config(&file_config, &overrides).context("Invalid configuration")?;

    init_tracing(&config)?;

    match &config_path {
        Some(path) => info!(path = %path.display(), "Loaded configuration"),
        None => warn!("No configuration file found, using built-in defaults"),
    }

    let (api_key, key_source) = resolve_acoustid_api_key(&file_config)?;
    if args.save_api_key && key_source == KeySource::Environment {
        let target = config_path
            .clone()
            .or_else(default_user_config_path)
            .context("No location for the configuration file")?;
        if let Err(e) = persist_acoustid_api_key(&api_key, &target) {
            warn!(error = %e, "Failed to save AcoustID API key");
        }
    }

    let recognizer = AcoustIdRecognizer::new(api_key, config.fpcalc_path.clone())
        .context("Failed to initialize AcoustID client")?;

    let backends = Backends {
        downloader_factory: Arc::new(YtDlpDownloaderFactory::new(config.yt_dlp_path.clone())),
        duration_probe: Arc::new(LoftyDurationProbe),
        transcoder: Arc::new(FfmpegTranscoder::new(config.ffmpeg_path.clone())),
        recognizer: Arc::new(recognizer),
        output_writer: OutputWriter::new(config.output_dir.clone()),
    };

    let event_bus = EventBus::default();
    spawn_progress_logger(&event_bus);

    let orchestrator = WorkflowOrchestrator::new(config, backends, event_bus);

    let shutdown = orchestrator.shutdown_token();
    tokio::spawn(async move {
        shutdown_signal().await;
        shutdown.cancel();
    });

    match orchestrator.process_input(&args.input).await {
        Ok(report) => {
            println!("{} ({} tracks)", report.mix_info.title, report.tracks.len());
            for track in &report.tracks {
                println!(
                    "  [{}] {} - {}",
                    format_timestamp(u64::from(track.time_in_mix)),
                    track.artist,
                    track.song_name
                );
            }
            for path in &report.written_files {
                println!("Wrote {}", path.display());
            }
            Ok(())
        }
        Err(e) => {
            if let Some(context) = e.context() {
                error!(
                    segments_created = context.segments_created,
                    input_path = %context.input_path,
                    "No tracks identified"
                );
            }
            Err(e.into())
        }
    }
}

/// Initialize tracing (RUST_LOG wins over the configured level)
fn init_tracing(config: &MixidConfig) -> Result<()> {
    let level = if config.debug {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| format!("mixid={0},mixid_common={0}", level).into());

    let registry = tracing_subscriber::registry().with(filter);

    match &config.logging.file {
        Some(path) => {
            let file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            registry
                .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
                .init();
        }
        None => registry.with(fmt::layer().with_writer(std::io::stderr)).init(),
    }

    Ok(())
}

/// Log run events at debug level
fn spawn_progress_logger(event_bus: &EventBus) {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(MixidEvent::SegmentProgress {
                    completed, total, succeeded, ..
                }) => debug!(completed, succeeded, total, "Segment progress"),
                Ok(event) => debug!(event = event.event_type(), run_id = %event.run_id(), "Run event"),
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(skipped, "Progress logger lagged")
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, stopping after the current stage");
        },
        _ = terminate => {
            warn!("Received terminate signal, stopping after the current stage");
        },
    }
}
