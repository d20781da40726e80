//! Registry setup for host applications
//!
//! Hosts call [`register_builtin_nodes`] at startup to make the
//! built-in node types available to the execution engine.

use std::sync::Arc;

use flow_engine::NodeRegistry;

use crate::control::{IfNode, LoopNode, MergeNode};
use crate::input::ManualTrigger;
use crate::transform::{NoOpNode, SetFieldNode};

/// Register every built-in node type
///
/// Type strings: `manual-trigger`, `loop`, `if`, `merge`, `set-field`,
/// `no-op`.
pub fn register_builtin_nodes(registry: &mut NodeRegistry) {
    registry.register("manual-trigger", Arc::new(ManualTrigger));
    registry.register("loop", Arc::new(LoopNode));
    registry.register("if", Arc::new(IfNode));
    registry.register("merge", Arc::new(MergeNode));
    registry.register("set-field", Arc::new(SetFieldNode));
    registry.register("no-op", Arc::new(NoOpNode));
    log::debug!("Registered {} built-in node types", registry.len());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_builtins_registered() {
        let mut registry = NodeRegistry::new();
        register_builtin_nodes(&mut registry);

        for node_type in ["manual-trigger", "loop", "if", "merge", "set-field", "no-op"] {
            assert!(registry.contains(node_type), "missing {node_type}");
        }
    }
}
