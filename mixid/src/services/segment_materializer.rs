//! Segment materialization
//!
//! Turns segment plans into verified segment files. Transcodes fan out to
//! the blocking thread pool through an ordered bounded stream, so results
//! come back in plan order however the jobs finish.

use crate::models::{AudioSegment, SegmentPlan};
use crate::services::transcoder::SegmentTranscoder;
use futures::stream::{self, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Progress snapshot reported after each finished job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MaterializeProgress {
    pub completed: usize,
    pub succeeded: usize,
    pub total: usize,
}

/// Whether `path` holds a segment file larger than `min_bytes`
pub fn is_valid_segment(path: &Path, min_bytes: u64) -> bool {
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.len() > min_bytes)
        .unwrap_or(false)
}

/// Materialize one plan, reusing a valid existing output
///
/// Every failure is logged and reported as `None`; one bad window never
/// stops the others.
pub fn materialize_one(
    transcoder: &dyn SegmentTranscoder,
    source: &Path,
    plan: &SegmentPlan,
    min_bytes: u64,
) -> Option<AudioSegment> {
    if is_valid_segment(&plan.output_path, min_bytes) {
        debug!(
            segment_start = plan.start_time,
            path = %plan.output_path.display(),
            "Reusing existing segment"
        );
        return Some(AudioSegment::from_verified_plan(plan));
    }

    if let Err(e) = transcoder.transcode(source, plan) {
        warn!(
            segment_start = plan.start_time,
            error = %e,
            "Segment transcode failed"
        );
        return None;
    }

    if !is_valid_segment(&plan.output_path, min_bytes) {
        warn!(
            segment_start = plan.start_time,
            path = %plan.output_path.display(),
            min_bytes,
            "Segment output missing or too small"
        );
        return None;
    }

    Some(AudioSegment::from_verified_plan(plan))
}

/// Number of concurrent transcodes for `plan_count` plans
pub fn worker_count(plan_count: usize) -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    (2 * cpus).min(plan_count).max(1)
}

/// Runs segment plans through a transcoder with bounded parallelism
pub struct SegmentMaterializer {
    transcoder: Arc<dyn SegmentTranscoder>,
    min_segment_bytes: u64,
}

impl SegmentMaterializer {
    pub fn new(transcoder: Arc<dyn SegmentTranscoder>, min_segment_bytes: u64) -> Self {
        Self {
            transcoder,
            min_segment_bytes,
        }
    }

    /// Materialize `plans` from `source`, returning segments in plan order
    ///
    /// `on_progress` runs on the calling task after each job finishes.
    pub async fn materialize<F>(
        &self,
        source: &Path,
        plans: Vec<SegmentPlan>,
        mut on_progress: F,
    ) -> Vec<AudioSegment>
    where
        F: FnMut(MaterializeProgress),
    {
        let total = plans.len();
        if total == 0 {
            return Vec::new();
        }

        let workers = worker_count(total);
        info!(total, workers, "Materializing segments");

        let source: PathBuf = source.to_path_buf();
        let min_bytes = self.min_segment_bytes;

        let mut jobs = stream::iter(plans.into_iter().map(|plan| {
            let transcoder = Arc::clone(&self.transcoder);
            let source = source.clone();
            async move {
                let segment_start = plan.start_time;
                match tokio::task::spawn_blocking(move || {
                    materialize_one(transcoder.as_ref(), &source, &plan, min_bytes)
                })
                .await
                {
                    Ok(segment) => segment,
                    Err(e) => {
                        error!(segment_start, error = %e, "Segment worker panicked");
                        None
                    }
                }
            }
        }))
        .buffered(workers);

        let mut segments = Vec::with_capacity(total);
        let mut completed = 0;

        while let Some(result) = jobs.next().await {
            completed += 1;
            if let Some(segment) = result {
                segments.push(segment);
            }
            on_progress(MaterializeProgress {
                completed,
                succeeded: segments.len(),
                total,
            });
        }

        info!(
            succeeded = segments.len(),
            failed = total - segments.len(),
            "Segment materialization finished"
        );

        segments
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::segment_planner::plan_segments;
    use crate::services::transcoder::TranscodeError;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Writes a fixed-size file for every plan except the configured failures
    struct FakeTranscoder {
        calls: AtomicUsize,
        fail_starts: HashSet<u32>,
        output_bytes: usize,
    }

    impl FakeTranscoder {
        fn new() -> Self {
            Self {
                calls: AtomicUsize::new(0),
                fail_starts: HashSet::new(),
                output_bytes: 4096,
            }
        }
    }

    impl SegmentTranscoder for FakeTranscoder {
        fn transcode(&self, _source: &Path, plan: &SegmentPlan) -> Result<(), TranscodeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_starts.contains(&(plan.start_time as u32)) {
                return Err(TranscodeError::Failed {
                    status: Some(1),
                    stderr: "simulated failure".to_string(),
                });
            }
            std::fs::write(&plan.output_path, vec![0u8; self.output_bytes])
                .map_err(|e| TranscodeError::ExecutionError(e.to_string()))
        }
    }

    #[tokio::test]
    async fn test_segments_returned_in_plan_order() {
        let dir = TempDir::new().unwrap();
        let transcoder = Arc::new(FakeTranscoder::new());
        let materializer = SegmentMaterializer::new(transcoder.clone(), 1000);

        let plans = plan_segments(600.0, 60, 10, dir.path());
        let expected = plans.len();
        let segments = materializer
            .materialize(Path::new("mix.mp3"), plans, |_| {})
            .await;

        assert_eq!(segments.len(), expected);
        let starts: Vec<u32> = segments.iter().map(|s| s.start_time()).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(transcoder.calls.load(Ordering::SeqCst), expected);
    }

    #[tokio::test]
    async fn test_existing_outputs_are_reused() {
        let dir = TempDir::new().unwrap();
        let transcoder = Arc::new(FakeTranscoder::new());
        let materializer = SegmentMaterializer::new(transcoder.clone(), 1000);

        let plans = plan_segments(125.0, 60, 10, dir.path());
        let first = materializer
            .materialize(Path::new("mix.mp3"), plans.clone(), |_| {})
            .await;
        assert_eq!(transcoder.calls.load(Ordering::SeqCst), 3);

        let second = materializer
            .materialize(Path::new("mix.mp3"), plans, |_| {})
            .await;
        assert_eq!(transcoder.calls.load(Ordering::SeqCst), 3);
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_small_existing_output_is_redone() {
        let dir = TempDir::new().unwrap();
        let transcoder = Arc::new(FakeTranscoder::new());
        let materializer = SegmentMaterializer::new(transcoder.clone(), 1000);

        let plans = plan_segments(50.0, 60, 10, dir.path());
        std::fs::write(&plans[0].output_path, b"tiny").unwrap();

        let segments = materializer
            .materialize(Path::new("mix.mp3"), plans, |_| {})
            .await;
        assert_eq!(segments.len(), 1);
        assert_eq!(transcoder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_windows_are_dropped() {
        let dir = TempDir::new().unwrap();
        let mut fake = FakeTranscoder::new();
        fake.fail_starts.insert(50);
        let materializer = SegmentMaterializer::new(Arc::new(fake), 1000);

        let plans = plan_segments(125.0, 60, 10, dir.path());
        let progress = Mutex::new(Vec::new());
        let segments = materializer
            .materialize(Path::new("mix.mp3"), plans, |p| progress.lock().unwrap().push(p))
            .await;

        let starts: Vec<u32> = segments.iter().map(|s| s.start_time()).collect();
        assert_eq!(starts, vec![0, 100]);

        let progress = progress.into_inner().unwrap();
        assert_eq!(progress.len(), 3);
        assert_eq!(
            progress.last(),
            Some(&MaterializeProgress {
                completed: 3,
                succeeded: 2,
                total: 3
            })
        );
    }

    #[tokio::test]
    async fn test_undersized_output_is_rejected() {
        let dir = TempDir::new().unwrap();
        let mut fake = FakeTranscoder::new();
        fake.output_bytes = 1000;
        let materializer = SegmentMaterializer::new(Arc::new(fake), 1000);

        let plans = plan_segments(125.0, 60, 10, dir.path());
        let segments = materializer
            .materialize(Path::new("mix.mp3"), plans, |_| {})
            .await;
        assert!(segments.is_empty());
    }

    #[test]
    fn test_worker_count_bounds() {
        assert_eq!(worker_count(0), 1);
        assert_eq!(worker_count(1), 1);
        assert!(worker_count(1000) >= 2);
    }
}
