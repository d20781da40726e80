//! Manual trigger node
//!
//! Entry point for user-initiated runs. The engine normalizes the
//! trigger payload into items and delivers them on `main`; this node
//! just forwards them into the graph.

use async_trait::async_trait;
use flow_engine::{NodeContext, NodeContract, NodeOutput, Result};

/// Starts an execution with the data the run was triggered with
pub struct ManualTrigger;

#[async_trait]
impl NodeContract for ManualTrigger {
    fn outputs(&self) -> &[&str] {
        &["main"]
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
        log::debug!(
            "Manual trigger '{}' emitting {} items",
            ctx.node_id(),
            ctx.main_input().len()
        );
        Ok(NodeOutput::Single(ctx.main_input().to_vec()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_engine::{Item, NodeStateStore, ResolvedCredentials};
    use serde_json::{json, Value};
    use std::collections::HashMap;

    #[tokio::test]
    async fn test_forwards_trigger_items() {
        let params = Value::Null;
        let creds = ResolvedCredentials::new();
        let mut store = NodeStateStore::new();
        let mut inputs = HashMap::new();
        inputs.insert(
            "main".to_string(),
            vec![Item::new(json!({"a": 1})), Item::new(json!({"b": 2}))],
        );
        let mut ctx = NodeContext::new("e1", "start", inputs, &params, &creds, &mut store);

        let output = ManualTrigger.execute(&mut ctx).await.unwrap();
        match output {
            NodeOutput::Single(items) => assert_eq!(items.len(), 2),
            _ => panic!("expected single output"),
        }
    }
}
