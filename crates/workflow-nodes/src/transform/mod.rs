//! Transform nodes
//!
//! Nodes that reshape items as they flow through a workflow.

mod no_op;
mod set_field;

pub use no_op::NoOpNode;
pub use set_field::SetFieldNode;
