//! Segment planning
//!
//! Pure function from (duration, window length, overlap) to the ordered list
//! of analysis windows. No I/O happens here.

use crate::models::SegmentPlan;
use std::path::Path;

/// Seconds added on both sides of a window before extraction
pub const BOUNDARY_PADDING_SECONDS: f64 = 0.5;

/// Deterministic segment file name for a nominal window
pub fn segment_file_name(start_time: f64, length: f64) -> String {
    format!("segment_{:.0}_{:.0}.mp3", start_time, length)
}

/// Plan overlapping windows covering `[0, total_duration)`
///
/// Windows start every `segment_length - overlap` seconds; the last one is
/// shortened to end at `total_duration`. A zero step, or a duration that is
/// not a finite positive number, yields an empty plan.
pub fn plan_segments(
    total_duration: f64,
    segment_length: u32,
    overlap: u32,
    work_dir: &Path,
) -> Vec<SegmentPlan> {
    let step = segment_length.saturating_sub(overlap);
    if step == 0 {
        tracing::warn!(segment_length, overlap, "Segment step is zero, nothing planned");
        return Vec::new();
    }
    if !total_duration.is_finite() || total_duration <= 0.0 {
        return Vec::new();
    }

    let step = f64::from(step);
    let segment_length = f64::from(segment_length);
    let mut plans = Vec::new();
    let mut current_time = 0.0_f64;

    while current_time < total_duration {
        let length = segment_length.min(total_duration - current_time);
        let extract_start = (current_time - BOUNDARY_PADDING_SECONDS).max(0.0);
        let extract_end = (current_time + length + BOUNDARY_PADDING_SECONDS).min(total_duration);

        plans.push(SegmentPlan {
            start_time: current_time,
            length,
            output_path: work_dir.join(segment_file_name(current_time, length)),
            extract_start,
            extract_length: extract_end - extract_start,
        });

        current_time += step;
    }

    tracing::debug!(
        total_duration,
        windows = plans.len(),
        "Planned analysis windows"
    );

    plans
}
