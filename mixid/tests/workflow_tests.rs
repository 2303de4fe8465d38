//! Run state machine tests

use mixid::models::{RunState, RunStatus};

fn create_test_status() -> RunStatus {
    RunStatus::new("/music/mix.mp3")
}

/// IDLE → RESOLVING
#[test]
fn test_idle_to_resolving() {
    // Given: a new run
    let mut status = create_test_status();
    assert_eq!(status.state, RunState::Idle);

    // When: resolution starts
    let transition = status.transition_to(RunState::Resolving);

    // Then: the transition is recorded against the run
    assert_eq!(status.state, RunState::Resolving);
    assert_eq!(transition.run_id, status.run_id);
    assert_eq!(transition.old_state, RunState::Idle);
    assert!(status.ended_at.is_none());
}

/// Failure in RECOGNIZING goes through CLEANING_UP to FAILED
#[test]
fn test_recognizing_failure_path() {
    // Given: a run that reached RECOGNIZING
    let mut status = create_test_status();
    for state in [RunState::Resolving, RunState::Segmenting, RunState::Recognizing] {
        status.transition_to(state);
    }

    // When: recognition fails
    assert!(status.state.can_transition_to(RunState::CleaningUp));
    status.exited_from = Some(status.state);
    status.transition_to(RunState::CleaningUp);
    status.transition_to(RunState::Failed);

    // Then: the run is terminal and remembers where it stopped
    assert!(status.is_terminal());
    assert_eq!(status.exited_from, Some(RunState::Recognizing));
    assert!(status.ended_at.is_some());
    assert_eq!(status.transitions.len(), 5);
}

/// EXPORTING can only finish through CLEANING_UP
#[test]
fn test_exporting_requires_cleanup() {
    assert!(!RunState::Exporting.can_transition_to(RunState::Done));
    assert!(RunState::Exporting.can_transition_to(RunState::CleaningUp));
    assert!(RunState::CleaningUp.can_transition_to(RunState::Done));
    assert!(RunState::CleaningUp.can_transition_to(RunState::Cancelled));
}

/// Cancellation is terminal
#[test]
fn test_cancelled_is_terminal() {
    let mut status = create_test_status();
    status.transition_to(RunState::CleaningUp);
    status.transition_to(RunState::Cancelled);

    assert!(status.is_terminal());
    assert!(!RunState::Cancelled.is_active());
    assert!(!RunState::Cancelled.can_transition_to(RunState::Resolving));
}

/// Status serializes with upper-case state names
#[test]
fn test_status_serialization() {
    let mut status = create_test_status();
    status.transition_to(RunState::Resolving);

    let json = serde_json::to_value(&status).unwrap();
    assert_eq!(json["state"], "RESOLVING");
    assert_eq!(json["transitions"][0]["old_state"], "IDLE");
    assert_eq!(json["input"], "/music/mix.mp3");
}
