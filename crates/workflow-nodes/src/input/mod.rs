//! Input nodes
//!
//! Nodes that start an execution or bring external data into it.

mod manual_trigger;

pub use manual_trigger::ManualTrigger;
