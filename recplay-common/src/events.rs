//! Event types for the recplay event system
//!
//! Provides the LoaderEvent definitions and the EventBus observers
//! subscribe to while a load attempt runs.

use crate::LoadErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Loader event types
///
/// State transitions (`LoadStarted`, `CompletionReached`, `LoadReady`,
/// `LoadFailed`) are always published. Per-resource progress
/// (`ResourceLoaded`, `MediaProbed`) is published only when loading
/// feedback is enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum LoaderEvent {
    /// Attempt left INIT and issued its requests
    LoadStarted {
        attempt_id: Uuid,
        record_id: String,
        /// Ticks required before completion fires
        required: usize,
        timestamp: DateTime<Utc>,
    },

    /// A declared resource was fetched, built and stored
    ResourceLoaded {
        attempt_id: Uuid,
        resource: String,
        /// False when the builder produced no value
        built: bool,
        /// Counter value after this tick
        loaded: usize,
        timestamp: DateTime<Utc>,
    },

    /// A declared resource answered with a non-success status
    ///
    /// The resource never ticks the counter, so the attempt cannot complete.
    ResourceSkipped {
        attempt_id: Uuid,
        resource: String,
        status: u16,
        timestamp: DateTime<Utc>,
    },

    /// Media probe batch accepted
    MediaProbed {
        attempt_id: Uuid,
        tags: Vec<String>,
        loaded: usize,
        timestamp: DateTime<Utc>,
    },

    /// Every expected unit ticked; the feedback timer is armed
    CompletionReached {
        attempt_id: Uuid,
        loaded: usize,
        feedback_ms: u64,
        timestamp: DateTime<Utc>,
    },

    /// Attempt reached READY
    LoadReady {
        attempt_id: Uuid,
        timestamp: DateTime<Utc>,
    },

    /// Attempt reached ERROR
    LoadFailed {
        attempt_id: Uuid,
        kind: LoadErrorKind,
        timestamp: DateTime<Utc>,
    },
}

impl LoaderEvent {
    /// Attempt the event belongs to
    pub fn attempt_id(&self) -> Uuid {
        match self {
            LoaderEvent::LoadStarted { attempt_id, .. }
            | LoaderEvent::ResourceLoaded { attempt_id, .. }
            | LoaderEvent::ResourceSkipped { attempt_id, .. }
            | LoaderEvent::MediaProbed { attempt_id, .. }
            | LoaderEvent::CompletionReached { attempt_id, .. }
            | LoaderEvent::LoadReady { attempt_id, .. }
            | LoaderEvent::LoadFailed { attempt_id, .. } => *attempt_id,
        }
    }

    /// Short event name for logs
    pub fn name(&self) -> &'static str {
        match self {
            LoaderEvent::LoadStarted { .. } => "LoadStarted",
            LoaderEvent::ResourceLoaded { .. } => "ResourceLoaded",
            LoaderEvent::ResourceSkipped { .. } => "ResourceSkipped",
            LoaderEvent::MediaProbed { .. } => "MediaProbed",
            LoaderEvent::CompletionReached { .. } => "CompletionReached",
            LoaderEvent::LoadReady { .. } => "LoadReady",
            LoaderEvent::LoadFailed { .. } => "LoadFailed",
        }
    }
}

/// Broadcast bus for loader events
///
/// Cloning the bus shares the same channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<LoaderEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before dropping old events
    ///
    /// # Examples
    ///
    /// ```
    /// use recplay_common::events::EventBus;
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
    pub fn subscribe(&self) -> broadcast::Receiver<LoaderEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: LoaderEvent,
    ) -> Result<usize, broadcast::error::SendError<LoaderEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: LoaderEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
