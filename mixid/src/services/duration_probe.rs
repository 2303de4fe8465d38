//! Audio duration probing

use lofty::prelude::*;
use lofty::probe::Probe;
use std::path::Path;
use thiserror::Error;

/// Duration probe errors
#[derive(Debug, Error)]
pub enum ProbeError {
    /// File could not be opened or parsed
    #[error("Failed to read audio file {path}: {message}")]
    ReadError { path: String, message: String },

    /// File parsed but reports no playable duration
    #[error("Audio file {0} reports no duration")]
    NoDuration(String),
}

/// Reads the total playable duration of an audio file
pub trait DurationProbe: Send + Sync {
    /// Duration in seconds; always finite and positive on success
    fn probe(&self, path: &Path) -> Result<f64, ProbeError>;
}

/// Probe backed by `lofty` audio properties
#[derive(Debug, Clone, Copy, Default)]
pub struct LoftyDurationProbe;

impl DurationProbe for LoftyDurationProbe {
    fn probe(&self, path: &Path) -> Result<f64, ProbeError> {
        let read_error = |e: lofty::error::LoftyError| ProbeError::ReadError {
            path: path.display().to_string(),
            message: e.to_string(),
        };

        let tagged_file = Probe::open(path)
            .map_err(read_error)?
            .read()
            .map_err(read_error)?;

        let seconds = tagged_file.properties().duration().as_secs_f64();
        if seconds.is_finite() && seconds > 0.0 {
            Ok(seconds)
        } else {
            Err(ProbeError::NoDuration(path.display().to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_silence(path: &Path, seconds: u32) {
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate: 8000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for _ in 0..(spec.sample_rate * seconds) {
            writer.write_sample(0i16).unwrap();
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_probe_wav_duration() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("silence.wav");
        write_silence(&path, 3);

        let duration = LoftyDurationProbe.probe(&path).unwrap();
        assert!((duration - 3.0).abs() < 0.05, "duration was {}", duration);
    }

    #[test]
    fn test_probe_garbage_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("garbage.mp3");
        std::fs::write(&path, b"definitely not audio").unwrap();

        assert!(LoftyDurationProbe.probe(&path).is_err());
    }

    #[test]
    fn test_probe_missing_file_fails() {
        let result = LoftyDurationProbe.probe(Path::new("/nonexistent/mix.mp3"));
        assert!(matches!(result, Err(ProbeError::ReadError { .. })));
    }
}
