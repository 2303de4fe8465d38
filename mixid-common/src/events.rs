//! Run event types and the event bus that carries them
//!
//! The orchestrator emits one event per state transition plus segment
//! progress while transcodes complete. Emission never blocks and never fails
//! a run: events nobody listens to are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Events emitted while a mix is processed
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MixidEvent {
    /// A processing run was accepted
    RunStarted {
        run_id: Uuid,
        input: String,
        timestamp: DateTime<Utc>,
    },

    /// The run moved to a new workflow state
    StateChanged {
        run_id: Uuid,
        old_state: String,
        new_state: String,
        timestamp: DateTime<Utc>,
    },

    /// A segment transcode finished (successfully or not)
    SegmentProgress {
        run_id: Uuid,
        completed: usize,
        succeeded: usize,
        total: usize,
        timestamp: DateTime<Utc>,
    },

    /// The run reached a terminal state
    RunFinished {
        run_id: Uuid,
        state: String,
        track_count: usize,
        written_files: Vec<String>,
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },
}

impl MixidEvent {
    /// Event type name, matching the serialized `type` tag
    pub fn event_type(&self) -> &str {
        match self {
            MixidEvent::RunStarted { .. } => "RunStarted",
            MixidEvent::StateChanged { .. } => "StateChanged",
            MixidEvent::SegmentProgress { .. } => "SegmentProgress",
            MixidEvent::RunFinished { .. } => "RunFinished",
        }
    }

    /// Run the event belongs to
    pub fn run_id(&self) -> Uuid {
        match self {
            MixidEvent::RunStarted { run_id, .. }
            | MixidEvent::StateChanged { run_id, .. }
            | MixidEvent::SegmentProgress { run_id, .. }
            | MixidEvent::RunFinished { run_id, .. } => *run_id,
        }
    }
}

/// Broadcast channel for run events
///
/// Cloning is cheap; all clones share one channel.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<MixidEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// Slow subscribers lose the oldest events once `capacity` is exceeded.
    ///
    /// ```
    /// use mixid_common::events::EventBus;
    ///
    /// let event_bus = EventBus::new(100);
    /// assert_eq!(event_bus.capacity(), 100);
    /// ```
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MixidEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: MixidEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(256)
    }
}
