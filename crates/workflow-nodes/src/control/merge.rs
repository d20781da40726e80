//! Merge node

use async_trait::async_trait;
use flow_engine::{NodeContext, NodeContract, NodeOutput, Result};

/// Concatenates its aggregated input onto one output
///
/// The engine delivers fan-in payloads concatenated in
/// connection-declaration order, so forwarding `main` preserves that
/// order.
pub struct MergeNode;

#[async_trait]
impl NodeContract for MergeNode {
    fn outputs(&self) -> &[&str] {
        &["main"]
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
        log::debug!(
            "Merge '{}' forwarding {} items",
            ctx.node_id(),
            ctx.main_input().len()
        );
        Ok(NodeOutput::Single(ctx.main_input().to_vec()))
    }
}
