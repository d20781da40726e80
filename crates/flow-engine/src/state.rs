//! Per-(execution, node) state storage
//!
//! Carries arbitrary JSON across re-entrant invocations of the same node
//! within one execution. Entries are created lazily on first write,
//! cleared explicitly by the node (loop completion), and reclaimed as a
//! whole when the execution reaches a terminal status.
//!
//! The store is an explicit value owned by the scheduler for one run,
//! never a singleton, so concurrent executions stay isolated.

use std::collections::HashMap;

use serde_json::Value;

use crate::types::NodeId;

/// Keyed store mapping `(executionId, nodeId)` to arbitrary JSON
#[derive(Debug, Default)]
pub struct NodeStateStore {
    entries: HashMap<(String, NodeId), Value>,
}

impl NodeStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the state for a node, if any
    pub fn get(&self, execution_id: &str, node_id: &str) -> Option<&Value> {
        self.entries
            .get(&(execution_id.to_string(), node_id.to_string()))
    }

    /// Set the state for a node, creating the entry if needed
    pub fn set(&mut self, execution_id: &str, node_id: &str, state: Value) {
        self.entries
            .insert((execution_id.to_string(), node_id.to_string()), state);
    }

    /// Clear the state for a node, returning the previous value
    pub fn clear(&mut self, execution_id: &str, node_id: &str) -> Option<Value> {
        self.entries
            .remove(&(execution_id.to_string(), node_id.to_string()))
    }

    /// Reclaim every entry belonging to an execution
    pub fn clear_execution(&mut self, execution_id: &str) {
        self.entries.retain(|(exec, _), _| exec != execution_id);
    }

    /// Number of live entries across all executions
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_lazy_creation_and_get() {
        let mut store = NodeStateStore::new();
        assert!(store.get("exec1", "node1").is_none());

        store.set("exec1", "node1", json!({"currentIndex": 3}));
        assert_eq!(
            store.get("exec1", "node1"),
            Some(&json!({"currentIndex": 3}))
        );
    }

    #[test]
    fn test_isolation_between_nodes_and_executions() {
        let mut store = NodeStateStore::new();
        store.set("exec1", "node1", json!(1));
        store.set("exec1", "node2", json!(2));
        store.set("exec2", "node1", json!(3));

        assert_eq!(store.get("exec1", "node1"), Some(&json!(1)));
        assert_eq!(store.get("exec1", "node2"), Some(&json!(2)));
        assert_eq!(store.get("exec2", "node1"), Some(&json!(3)));
    }

    #[test]
    fn test_clear_single_node() {
        let mut store = NodeStateStore::new();
        store.set("exec1", "node1", json!(1));
        assert_eq!(store.clear("exec1", "node1"), Some(json!(1)));
        assert!(store.get("exec1", "node1").is_none());
        // Clearing again is a no-op
        assert_eq!(store.clear("exec1", "node1"), None);
    }

    #[test]
    fn test_clear_execution_reclaims_all() {
        let mut store = NodeStateStore::new();
        store.set("exec1", "node1", json!(1));
        store.set("exec1", "node2", json!(2));
        store.set("exec2", "node1", json!(3));

        store.clear_execution("exec1");
        assert!(store.get("exec1", "node1").is_none());
        assert!(store.get("exec1", "node2").is_none());
        assert_eq!(store.get("exec2", "node1"), Some(&json!(3)));
        assert_eq!(store.len(), 1);
    }
}
