//! Data models for mixid
//!
//! - Planned and materialized analysis windows
//! - Recognized tracks and mix metadata
//! - Run workflow state machine

pub mod audio_segment;
pub mod mix_metadata;
pub mod run_state;
pub mod track;

pub use audio_segment::{AudioSegment, SegmentPlan};
pub use mix_metadata::{MixInfo, MixMetadata, UNKNOWN_ARTIST};
pub use run_state::{RunState, RunStatus, StateTransition};
pub use track::Track;
