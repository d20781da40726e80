//! The contract every node implementation satisfies
//!
//! A node declares its ordered output-branch names and implements one
//! async `execute` operation. The engine binds state accessors to the
//! current `(executionId, nodeId)` pair before each invocation, so node
//! implementations stay stateless and reusable across executions.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::state::NodeStateStore;
use crate::types::{BranchName, ItemSet};

/// Credential material resolved by the platform for one node
///
/// The engine receives credentials already decrypted; it performs no
/// lookup itself.
pub type ResolvedCredentials = HashMap<String, Value>;

/// The positional result of one node invocation
#[derive(Debug, Clone)]
pub enum NodeOutput {
    /// One item set per declared output branch, in declaration order
    Branches(Vec<ItemSet>),
    /// Backward-compatible shape for nodes declaring exactly one output
    Single(ItemSet),
}

impl NodeOutput {
    /// An output with every branch empty
    pub fn empty(branch_count: usize) -> Self {
        Self::Branches(vec![Vec::new(); branch_count])
    }
}

static EMPTY_ITEMS: &[crate::types::Item] = &[];

/// Invocation context handed to a node's `execute`
///
/// Built by the scheduler for each invocation; public so node unit
/// tests and embedders can construct one directly.
pub struct NodeContext<'a> {
    execution_id: &'a str,
    node_id: &'a str,
    inputs: HashMap<BranchName, ItemSet>,
    parameters: &'a Value,
    credentials: &'a ResolvedCredentials,
    state: &'a mut NodeStateStore,
}

impl<'a> NodeContext<'a> {
    /// Create a context bound to one `(executionId, nodeId)` pair
    pub fn new(
        execution_id: &'a str,
        node_id: &'a str,
        inputs: HashMap<BranchName, ItemSet>,
        parameters: &'a Value,
        credentials: &'a ResolvedCredentials,
        state: &'a mut NodeStateStore,
    ) -> Self {
        Self {
            execution_id,
            node_id,
            inputs,
            parameters,
            credentials,
            state,
        }
    }

    /// The current execution ID
    pub fn execution_id(&self) -> &str {
        self.execution_id
    }

    /// The ID of the node being invoked
    pub fn node_id(&self) -> &str {
        self.node_id
    }

    /// Items delivered on a named input branch (empty if none)
    pub fn input(&self, branch: &str) -> &[crate::types::Item] {
        self.inputs
            .get(branch)
            .map(|items| items.as_slice())
            .unwrap_or(EMPTY_ITEMS)
    }

    /// Items delivered on the `main` input branch
    pub fn main_input(&self) -> &[crate::types::Item] {
        self.input("main")
    }

    /// All delivered input branches
    pub fn inputs(&self) -> &HashMap<BranchName, ItemSet> {
        &self.inputs
    }

    /// The node's raw parameters
    pub fn parameters(&self) -> &Value {
        self.parameters
    }

    /// A parameter by key
    pub fn param(&self, key: &str) -> Option<&Value> {
        self.parameters.get(key)
    }

    /// A string parameter by key
    pub fn param_str(&self, key: &str) -> Option<&str> {
        self.param(key).and_then(|v| v.as_str())
    }

    /// An integer parameter by key
    pub fn param_i64(&self, key: &str) -> Option<i64> {
        self.param(key).and_then(|v| v.as_i64())
    }

    /// A boolean parameter by key
    pub fn param_bool(&self, key: &str) -> Option<bool> {
        self.param(key).and_then(|v| v.as_bool())
    }

    /// Resolved credential material for this node
    pub fn credentials(&self) -> &ResolvedCredentials {
        self.credentials
    }

    /// Persisted state for this `(executionId, nodeId)`, if any
    pub fn get_state(&self) -> Option<&Value> {
        self.state.get(self.execution_id, self.node_id)
    }

    /// Persist state for this `(executionId, nodeId)`
    pub fn set_state(&mut self, state: Value) {
        self.state.set(self.execution_id, self.node_id, state);
    }

    /// Clear persisted state for this `(executionId, nodeId)`
    pub fn clear_state(&mut self) {
        self.state.clear(self.execution_id, self.node_id);
    }
}

/// Interface implemented by every node type
#[async_trait]
pub trait NodeContract: Send + Sync {
    /// Ordered list of declared output-branch names
    fn outputs(&self) -> &[&str];

    /// Whether this node implements the iteration protocol
    ///
    /// Re-entrant nodes may be invoked many times within one execution,
    /// resuming from persisted state; connections wired back into them
    /// from their own downstream subgraph are treated as re-entry edges
    /// rather than structural cycles.
    fn reentrant(&self) -> bool {
        false
    }

    /// Run one invocation of this node
    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<NodeOutput>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Item;
    use serde_json::json;

    #[test]
    fn test_context_params_and_inputs() {
        let params = json!({"name": "test", "count": 5, "flag": true});
        let creds = ResolvedCredentials::new();
        let mut store = NodeStateStore::new();
        let mut inputs = HashMap::new();
        inputs.insert("main".to_string(), vec![Item::new(json!({"a": 1}))]);

        let ctx = NodeContext::new("exec1", "node1", inputs, &params, &creds, &mut store);
        assert_eq!(ctx.param_str("name"), Some("test"));
        assert_eq!(ctx.param_i64("count"), Some(5));
        assert_eq!(ctx.param_bool("flag"), Some(true));
        assert_eq!(ctx.main_input().len(), 1);
        assert!(ctx.input("other").is_empty());
    }

    #[test]
    fn test_context_state_accessors_are_scoped() {
        let params = Value::Null;
        let creds = ResolvedCredentials::new();
        let mut store = NodeStateStore::new();
        store.set("exec1", "other", json!("not mine"));

        let mut ctx =
            NodeContext::new("exec1", "node1", HashMap::new(), &params, &creds, &mut store);
        assert!(ctx.get_state().is_none());

        ctx.set_state(json!({"index": 2}));
        assert_eq!(ctx.get_state(), Some(&json!({"index": 2})));

        ctx.clear_state();
        assert!(ctx.get_state().is_none());
        // Other nodes' state is untouched
        assert_eq!(store.get("exec1", "other"), Some(&json!("not mine")));
    }
}
