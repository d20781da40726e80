//! Node type registry
//!
//! Maps node type strings to contract implementations. The registry is
//! cheap to clone and share; implementations are held behind `Arc`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::contract::NodeContract;

/// Registry of node contract implementations keyed by type string
#[derive(Clone, Default)]
pub struct NodeRegistry {
    nodes: HashMap<String, Arc<dyn NodeContract>>,
}

impl NodeRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a node implementation under a type string
    ///
    /// Re-registering a type replaces the previous implementation.
    pub fn register(&mut self, node_type: impl Into<String>, node: Arc<dyn NodeContract>) {
        self.nodes.insert(node_type.into(), node);
    }

    /// Look up a node implementation by type string
    pub fn get(&self, node_type: &str) -> Option<Arc<dyn NodeContract>> {
        self.nodes.get(node_type).cloned()
    }

    /// Whether a type string is registered
    pub fn contains(&self, node_type: &str) -> bool {
        self.nodes.contains_key(node_type)
    }

    /// Registered type strings, unordered
    pub fn node_types(&self) -> impl Iterator<Item = &str> {
        self.nodes.keys().map(|k| k.as_str())
    }

    /// Number of registered types
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether the registry is empty
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl std::fmt::Debug for NodeRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<&str> = self.node_types().collect();
        types.sort_unstable();
        f.debug_struct("NodeRegistry").field("types", &types).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{NodeContext, NodeOutput};
    use crate::error::Result;
    use async_trait::async_trait;

    struct Dummy;

    #[async_trait]
    impl NodeContract for Dummy {
        fn outputs(&self) -> &[&str] {
            &["main"]
        }

        async fn execute(&self, _ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
            Ok(NodeOutput::Single(Vec::new()))
        }
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = NodeRegistry::new();
        assert!(registry.is_empty());

        registry.register("no-op", Arc::new(Dummy));
        assert!(registry.contains("no-op"));
        assert!(registry.get("no-op").is_some());
        assert!(registry.get("unknown").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_reregister_replaces() {
        let mut registry = NodeRegistry::new();
        registry.register("no-op", Arc::new(Dummy));
        registry.register("no-op", Arc::new(Dummy));
        assert_eq!(registry.len(), 1);
    }
}
