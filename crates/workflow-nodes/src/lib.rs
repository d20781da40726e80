//! Built-in node implementations for the Filament flow engine
//!
//! Each node implements `flow_engine::NodeContract`. The loop node is
//! the canonical re-entrant node: it carries its iteration domain in
//! per-execution node state and is re-invoked through loop-back wiring
//! until the domain is exhausted.
//!
//! # Example
//!
//! ```ignore
//! let mut registry = flow_engine::NodeRegistry::new();
//! workflow_nodes::register_builtin_nodes(&mut registry);
//! let engine = flow_engine::ExecutionEngine::new(registry);
//! ```

pub mod control;
pub mod input;
pub mod transform;

mod setup;

pub use setup::register_builtin_nodes;
