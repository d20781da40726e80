//! Event types for streaming execution progress
//!
//! Events are sent from the engine to any consumer (the realtime
//! projection, a UI channel, a test collector) to report execution and
//! node lifecycle transitions.

use serde::{Deserialize, Serialize};

/// Trait for sending engine events
///
/// This abstracts over the transport mechanism (broadcast channel,
/// mpsc, etc.) allowing the engine to be used in different contexts.
pub trait EventSink: Send + Sync {
    /// Send an event
    ///
    /// Returns an error if the event could not be sent (e.g., channel closed)
    fn send(&self, event: EngineEvent) -> Result<(), EventError>;
}

/// Error when sending events fails
#[derive(Debug, Clone)]
pub struct EventError {
    pub message: String,
}

impl std::fmt::Display for EventError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Event error: {}", self.message)
    }
}

impl std::error::Error for EventError {}

impl EventError {
    pub fn channel_closed() -> Self {
        Self {
            message: "Channel closed".to_string(),
        }
    }
}

/// Events emitted during workflow execution
///
/// Exactly one terminal event (`ExecutionCompleted`, `ExecutionFailed`
/// or `ExecutionCancelled`) is emitted per execution, and nothing after
/// it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EngineEvent {
    /// Execution started
    #[serde(rename_all = "camelCase")]
    ExecutionStarted {
        workflow_id: String,
        execution_id: String,
    },

    /// A node began one invocation
    ///
    /// Re-entrant nodes emit this once per iteration with an increasing
    /// `iteration` counter.
    #[serde(rename_all = "camelCase")]
    NodeStarted {
        node_id: String,
        execution_id: String,
        iteration: u32,
    },

    /// A node invocation completed
    #[serde(rename_all = "camelCase")]
    NodeCompleted {
        node_id: String,
        execution_id: String,
        iteration: u32,
        /// Item count per declared output branch
        branch_lengths: std::collections::BTreeMap<String, usize>,
    },

    /// A node invocation failed
    #[serde(rename_all = "camelCase")]
    NodeFailed {
        node_id: String,
        execution_id: String,
        error: String,
    },

    /// Execution completed successfully
    #[serde(rename_all = "camelCase")]
    ExecutionCompleted {
        workflow_id: String,
        execution_id: String,
    },

    /// Execution failed
    #[serde(rename_all = "camelCase")]
    ExecutionFailed {
        workflow_id: String,
        execution_id: String,
        error: String,
    },

    /// Execution was cancelled before reaching quiescence
    #[serde(rename_all = "camelCase")]
    ExecutionCancelled {
        workflow_id: String,
        execution_id: String,
    },
}

impl EngineEvent {
    /// The execution this event belongs to
    pub fn execution_id(&self) -> &str {
        match self {
            Self::ExecutionStarted { execution_id, .. }
            | Self::NodeStarted { execution_id, .. }
            | Self::NodeCompleted { execution_id, .. }
            | Self::NodeFailed { execution_id, .. }
            | Self::ExecutionCompleted { execution_id, .. }
            | Self::ExecutionFailed { execution_id, .. }
            | Self::ExecutionCancelled { execution_id, .. } => execution_id,
        }
    }

    /// Whether this event ends its execution's event stream
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::ExecutionCompleted { .. }
                | Self::ExecutionFailed { .. }
                | Self::ExecutionCancelled { .. }
        )
    }
}

/// A no-op event sink that discards all events
///
/// Useful for testing or when events aren't needed.
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn send(&self, _event: EngineEvent) -> Result<(), EventError> {
        Ok(())
    }
}

/// A vector-based event sink that collects events
///
/// Useful for testing to verify events were emitted correctly.
#[derive(Default)]
pub struct VecEventSink {
    events: parking_lot::Mutex<Vec<EngineEvent>>,
}

impl VecEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all collected events
    pub fn events(&self) -> Vec<EngineEvent> {
        self.events.lock().clone()
    }

    /// Clear all collected events
    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for VecEventSink {
    fn send(&self, event: EngineEvent) -> Result<(), EventError> {
        self.events.lock().push(event);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vec_event_sink() {
        let sink = VecEventSink::new();

        sink.send(EngineEvent::NodeStarted {
            node_id: "node1".to_string(),
            execution_id: "exec1".to_string(),
            iteration: 0,
        })
        .unwrap();

        let events = sink.events();
        assert_eq!(events.len(), 1);

        match &events[0] {
            EngineEvent::NodeStarted { node_id, iteration, .. } => {
                assert_eq!(node_id, "node1");
                assert_eq!(*iteration, 0);
            }
            _ => panic!("Expected NodeStarted event"),
        }
    }

    #[test]
    fn test_null_event_sink() {
        let sink = NullEventSink;
        // Should not panic
        sink.send(EngineEvent::ExecutionCancelled {
            workflow_id: "wf".to_string(),
            execution_id: "exec1".to_string(),
        })
        .unwrap();
    }

    #[test]
    fn test_terminal_classification() {
        let started = EngineEvent::ExecutionStarted {
            workflow_id: "wf".to_string(),
            execution_id: "e".to_string(),
        };
        let done = EngineEvent::ExecutionCompleted {
            workflow_id: "wf".to_string(),
            execution_id: "e".to_string(),
        };
        assert!(!started.is_terminal());
        assert!(done.is_terminal());
        assert_eq!(done.execution_id(), "e");
    }

    #[test]
    fn test_event_serialization_shape() {
        let mut lengths = std::collections::BTreeMap::new();
        lengths.insert("true".to_string(), 1);
        lengths.insert("false".to_string(), 0);
        let event = EngineEvent::NodeCompleted {
            node_id: "n1".to_string(),
            execution_id: "e1".to_string(),
            iteration: 2,
            branch_lengths: lengths,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "node-completed");
        assert_eq!(json["nodeId"], "n1");
        assert_eq!(json["branchLengths"]["true"], 1);
        assert_eq!(json["branchLengths"]["false"], 0);
    }
}
