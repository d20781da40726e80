//! Flow Engine - Branch-aware workflow execution
//!
//! This crate is the execution core of a visual workflow-automation
//! platform. It turns a declarative node graph with named, positional
//! output branches into a deterministic sequence of node invocations:
//!
//! - Depth-first, left-to-right, branch-by-branch scheduling
//! - Loop re-entrancy through persisted per-node state, without
//!   structural graph cycles
//! - Fan-in barriers with empty-branch deactivation
//! - Output standardization (declared names zipped against positional
//!   results)
//! - Cancellation, invocation safety limits, progress events, and
//!   append-only execution records
//!
//! # Example
//!
//! ```ignore
//! use flow_engine::{ExecutionEngine, ExecutionHandle, WorkflowBuilder};
//! use serde_json::json;
//!
//! let workflow = WorkflowBuilder::new("wf1", "My Workflow")
//!     .add_node("start", "manual-trigger")
//!     .add_node("loop1", "loop")
//!     .with_parameters(json!({"loopOver": "repeat", "repeatTimes": 3}))
//!     .connect("start", "main", "loop1", "main")
//!     .trigger("start")
//!     .build();
//!
//! let engine = ExecutionEngine::new(registry);
//! let instance = engine
//!     .execute(&workflow, json!(null), &credentials, ExecutionHandle::new())
//!     .await?;
//! ```

pub mod builder;
pub mod contract;
pub mod error;
pub mod events;
pub mod graph;
pub mod path;
pub mod realtime;
pub mod records;
pub mod registry;
pub mod scheduler;
pub mod standardize;
pub mod state;
pub mod types;

// Re-export key types
pub use builder::WorkflowBuilder;
pub use contract::{NodeContext, NodeContract, NodeOutput, ResolvedCredentials};
pub use error::{EngineError, Result};
pub use events::{EngineEvent, EventSink, NullEventSink, VecEventSink};
pub use graph::{build_graph, ExecutionGraph};
pub use realtime::BroadcastProjection;
pub use records::{
    ExecutionInstance, ExecutionStatus, MemoryRecordSink, NodeExecutionRecord, NullRecordSink,
    RecordSink,
};
pub use registry::NodeRegistry;
pub use scheduler::{ExecutionEngine, ExecutionHandle, DEFAULT_MAX_INVOCATIONS};
pub use standardize::{standardize_outputs, BranchOutputs};
pub use state::NodeStateStore;
pub use types::{normalize_items, Connection, Item, ItemSet, NodeDef, Workflow, WorkflowSettings};
