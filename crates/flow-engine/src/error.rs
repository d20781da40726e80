//! Error types for the execution engine

use thiserror::Error;

use crate::types::NodeId;

/// Result type alias using EngineError
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors that can occur in the execution engine
#[derive(Debug, Error)]
pub enum EngineError {
    /// Workflow is structurally invalid; surfaced before any node runs
    #[error("Graph validation failed: {0}")]
    GraphValidation(String),

    /// Iteration count parameter is zero or negative
    #[error("Invalid iteration count: {0}")]
    InvalidIterationCount(i64),

    /// Iteration count exceeds the configured safety limit
    #[error("Safety limit exceeded: {requested} iterations (limit {limit})")]
    SafetyLimitExceeded { requested: i64, limit: i64 },

    /// Field-name parameter is missing or empty
    #[error("Field name parameter is missing or empty")]
    MissingFieldName,

    /// No input items available to resolve a field against
    #[error("No input items available")]
    NoInputItems,

    /// A field path did not resolve to an array
    #[error("Field '{0}' did not resolve to an array")]
    FieldNotArray(String),

    /// A node returned the single-output shape while declaring several outputs
    #[error("Node returned a bare item set but declares {declared} outputs")]
    OutputArity { declared: usize },

    /// A node's execute raised an error
    #[error("Node '{node_id}' failed: {message}")]
    NodeExecution { node_id: NodeId, message: String },

    /// Cancellation was requested for an execution that is not running
    #[error("Execution is not running and cannot be cancelled")]
    NotCancellable,

    /// Execution was cancelled; used to unwind the scheduler
    #[error("Execution cancelled")]
    Cancelled,

    /// Engine-level cap on node invocations was reached
    #[error("Invocation limit reached ({0} node invocations)")]
    InvocationLimit(u32),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EngineError {
    /// Create a graph validation error with a message
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::GraphValidation(msg.into())
    }

    /// Create a node execution error with a message
    pub fn node(node_id: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::NodeExecution {
            node_id: node_id.into(),
            message: msg.into(),
        }
    }
}
