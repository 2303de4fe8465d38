//! Segment transcoding via ffmpeg
//!
//! Cuts one padded window out of the source and re-encodes it to MP3.
//! Calls block; the materializer runs them on the blocking thread pool.

use crate::models::SegmentPlan;
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Transcoder errors
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// Transcoder binary not found in PATH
    #[error("Transcoder binary not found: {0}")]
    BinaryNotFound(String),

    /// Failed to execute the transcoder
    #[error("Failed to execute transcoder: {0}")]
    ExecutionError(String),

    /// Transcoder exited with a non-zero status
    #[error("Transcoder exited with status {status:?}: {stderr}")]
    Failed { status: Option<i32>, stderr: String },
}

/// Produces the output file of one segment plan
pub trait SegmentTranscoder: Send + Sync {
    fn transcode(&self, source: &Path, plan: &SegmentPlan) -> Result<(), TranscodeError>;
}

/// `ffmpeg` command-line transcoder
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    binary_path: String,
    threads: usize,
}

impl FfmpegTranscoder {
    /// Transcoder using one encoder thread per available CPU
    pub fn new(binary_path: impl Into<String>) -> Self {
        let threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            binary_path: binary_path.into(),
            threads,
        }
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    /// Full ffmpeg argument list for one plan
    ///
    /// Seeking happens after `-i` so the cut is sample accurate.
    pub fn build_args(&self, source: &Path, plan: &SegmentPlan) -> Vec<String> {
        let mut args: Vec<String> = [
            "-hide_banner",
            "-nostdin",
            "-loglevel",
            "error",
            "-i",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        args.push(source.to_string_lossy().into_owned());
        args.extend(
            [
                "-vn", "-ar", "44100", "-ac", "2", "-c:a", "libmp3lame", "-q:a", "5", "-map",
                "0:a", "-threads",
            ]
            .iter()
            .map(|s| s.to_string()),
        );
        args.push(self.threads.to_string());
        args.push("-ss".to_string());
        args.push(format!("{:.3}", plan.extract_start));
        args.push("-t".to_string());
        args.push(format!("{:.3}", plan.extract_length));
        args.push("-y".to_string());
        args.push(plan.output_path.to_string_lossy().into_owned());
        args
    }
}

impl SegmentTranscoder for FfmpegTranscoder {
    fn transcode(&self, source: &Path, plan: &SegmentPlan) -> Result<(), TranscodeError> {
        let output = Command::new(&self.binary_path)
            .args(self.build_args(source, plan))
            .output()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::BinaryNotFound(self.binary_path.clone())
                } else {
                    TranscodeError::ExecutionError(e.to_string())
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::Failed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn plan() -> SegmentPlan {
        SegmentPlan {
            start_time: 50.0,
            length: 60.0,
            output_path: PathBuf::from("/work/segment_50_60.mp3"),
            extract_start: 49.5,
            extract_length: 61.0,
        }
    }

    #[test]
    fn test_build_args_uses_padded_window() {
        let transcoder = FfmpegTranscoder::new("ffmpeg").with_threads(4);
        let args = transcoder.build_args(Path::new("/music/mix.mp3"), &plan());

        let expected: Vec<String> = [
            "-hide_banner", "-nostdin", "-loglevel", "error", "-i", "/music/mix.mp3", "-vn",
            "-ar", "44100", "-ac", "2", "-c:a", "libmp3lame", "-q:a", "5", "-map", "0:a",
            "-threads", "4", "-ss", "49.500", "-t", "61.000", "-y", "/work/segment_50_60.mp3",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(args, expected);
    }

    #[test]
    fn test_missing_binary_is_reported() {
        let transcoder = FfmpegTranscoder::new("/nonexistent/ffmpeg-binary");
        let result = transcoder.transcode(Path::new("/music/mix.mp3"), &plan());
        assert!(matches!(result, Err(TranscodeError::BinaryNotFound(_))));
    }
}
