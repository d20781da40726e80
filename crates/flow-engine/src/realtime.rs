//! Realtime fan-out of engine events
//!
//! A thin projection that republishes every engine event over a
//! `tokio::sync::broadcast` channel so any number of observers (UI
//! sessions, log tailers) can follow an execution as it runs. Purely a
//! fan-out; it adds no semantics of its own.

use tokio::sync::broadcast;

use crate::events::{EngineEvent, EventError, EventSink};

/// Default capacity of the broadcast channel
const DEFAULT_CAPACITY: usize = 256;

/// Event sink that fans events out to broadcast subscribers
///
/// Slow subscribers that fall more than the channel capacity behind
/// observe a `Lagged` error from their receiver; the engine itself is
/// never blocked by them.
pub struct BroadcastProjection {
    sender: broadcast::Sender<EngineEvent>,
}

impl BroadcastProjection {
    /// Create a projection with the default channel capacity
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    /// Create a projection with an explicit channel capacity
    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Subscribe to the event stream
    ///
    /// Each subscriber receives every event sent after it subscribed.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.sender.subscribe()
    }

    /// Number of live subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for BroadcastProjection {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for BroadcastProjection {
    fn send(&self, event: EngineEvent) -> Result<(), EventError> {
        // A send with no subscribers is fine; events are best-effort
        let _ = self.sender.send(event);
        Ok(())
    }
}
