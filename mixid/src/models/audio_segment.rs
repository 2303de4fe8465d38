//! Analysis windows: planned and materialized

use serde::Serialize;
use std::path::{Path, PathBuf};

/// One planned analysis window
///
/// Pure planning record produced by the segment planner. `start_time` and
/// `length` are the nominal window; `extract_start` and `extract_length`
/// widen it by the boundary padding and are what the transcoder cuts.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentPlan {
    /// Nominal window start (seconds)
    pub start_time: f64,
    /// Nominal window length (seconds)
    pub length: f64,
    /// Transcoder output file; a deterministic function of start and length
    pub output_path: PathBuf,
    /// Padded extraction start (seconds)
    pub extract_start: f64,
    /// Padded extraction length (seconds)
    pub extract_length: f64,
}

impl SegmentPlan {
    /// Nominal window end (seconds, exclusive)
    pub fn end_time(&self) -> f64 {
        self.start_time + self.length
    }
}

/// One materialized analysis window
///
/// Only the segment materializer can construct these, and only after the
/// transcoder output has been checked against the minimum size threshold.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AudioSegment {
    file_path: PathBuf,
    start_time: u32,
    duration: u32,
}

impl AudioSegment {
    /// Build from a plan whose output file was verified
    ///
    /// Start and duration are the nominal (unpadded) window truncated to
    /// whole seconds.
    pub(crate) fn from_verified_plan(plan: &SegmentPlan) -> Self {
        Self {
            file_path: plan.output_path.clone(),
            start_time: plan.start_time as u32,
            duration: plan.length as u32,
        }
    }

    /// Transcoded segment file
    pub fn file_path(&self) -> &Path {
        &self.file_path
    }

    /// Window start within the mix (seconds)
    pub fn start_time(&self) -> u32 {
        self.start_time
    }

    /// Window length (seconds)
    pub fn duration(&self) -> u32 {
        self.duration
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_records_nominal_window() {
        let plan = SegmentPlan {
            start_time: 100.0,
            length: 25.7,
            output_path: PathBuf::from("/tmp/work/segment_100_25.mp3"),
            extract_start: 99.5,
            extract_length: 26.2,
        };

        let segment = AudioSegment::from_verified_plan(&plan);
        assert_eq!(segment.start_time(), 100);
        assert_eq!(segment.duration(), 25);
        assert_eq!(segment.file_path(), Path::new("/tmp/work/segment_100_25.mp3"));
        assert!((plan.end_time() - 125.7).abs() < 1e-9);
    }
}
