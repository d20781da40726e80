//! Control nodes
//!
//! Nodes for branching, merging, and loop iteration.

mod if_node;
mod loop_node;
mod merge;

pub use if_node::IfNode;
pub use loop_node::LoopNode;
pub use merge::MergeNode;
