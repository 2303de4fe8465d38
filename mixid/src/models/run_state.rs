//! Run workflow state machine
//!
//! IDLE → RESOLVING → SEGMENTING → RECOGNIZING → EXPORTING → CLEANING_UP → DONE
//!
//! Any active state may leave early for CLEANING_UP; the run then ends in
//! FAILED or CANCELLED instead of DONE. Cleanup is never skipped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Workflow state of one processing run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunState {
    /// Run created, nothing started
    Idle,
    /// Input classification, download, metadata normalization
    Resolving,
    /// Duration probe, planning, transcoding windows
    Segmenting,
    /// Recognition backend call and result policy
    Recognizing,
    /// Tracklist files being written
    Exporting,
    /// Working directory removal and backend shutdown
    CleaningUp,
    /// Run finished successfully
    Done,
    /// Run aborted by an error
    Failed,
    /// Run stopped by the shutdown signal
    Cancelled,
}

impl RunState {
    /// Terminal states end the run
    pub fn is_terminal(self) -> bool {
        matches!(self, RunState::Done | RunState::Failed | RunState::Cancelled)
    }

    /// States that do work and may therefore exit early
    pub fn is_active(self) -> bool {
        matches!(
            self,
            RunState::Resolving | RunState::Segmenting | RunState::Recognizing | RunState::Exporting
        )
    }

    /// Whether `next` is a legal successor of this state
    pub fn can_transition_to(self, next: RunState) -> bool {
        use RunState::*;
        match (self, next) {
            (Idle, Resolving)
            | (Resolving, Segmenting)
            | (Segmenting, Recognizing)
            | (Recognizing, Exporting)
            | (CleaningUp, Done) => true,
            (from, CleaningUp) => from == Idle || from.is_active(),
            (from, Failed) | (from, Cancelled) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunState::Idle => "Idle",
            RunState::Resolving => "Resolving",
            RunState::Segmenting => "Segmenting",
            RunState::Recognizing => "Recognizing",
            RunState::Exporting => "Exporting",
            RunState::CleaningUp => "CleaningUp",
            RunState::Done => "Done",
            RunState::Failed => "Failed",
            RunState::Cancelled => "Cancelled",
        };
        f.write_str(name)
    }
}

/// State transition record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateTransition {
    pub run_id: Uuid,
    pub old_state: RunState,
    pub new_state: RunState,
    pub transitioned_at: DateTime<Utc>,
}

/// In-memory status of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunStatus {
    pub run_id: Uuid,
    pub state: RunState,
    /// Raw input as given by the caller
    pub input: String,
    /// Last active state before the run left for cleanup on an error path
    pub exited_from: Option<RunState>,
    pub transitions: Vec<StateTransition>,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            state: RunState::Idle,
            input: input.into(),
            exited_from: None,
            transitions: Vec::new(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// Transition to new state
    ///
    /// Illegal transitions are applied anyway but logged; the orchestrator
    /// is the only caller and its sequencing is tested separately.
    pub fn transition_to(&mut self, new_state: RunState) -> StateTransition {
        if !self.state.can_transition_to(new_state) {
            tracing::warn!(
                run_id = %self.run_id,
                from = %self.state,
                to = %new_state,
                "Unexpected run state transition"
            );
        }

        let transition = StateTransition {
            run_id: self.run_id,
            old_state: self.state,
            new_state,
            transitioned_at: Utc::now(),
        };
        self.state = new_state;

        if new_state.is_terminal() {
            self.ended_at = Some(Utc::now());
        }

        self.transitions.push(transition.clone());
        transition
    }

    /// Check if run is terminal (finished)
    pub fn is_terminal(&self) -> bool {
        self.state.is_terminal()
    }

    /// Ordered list of states visited, starting with `Idle`
    pub fn visited_states(&self) -> Vec<RunState> {
        let mut states = vec![RunState::Idle];
        states.extend(self.transitions.iter().map(|t| t.new_state));
        states
    }
}
