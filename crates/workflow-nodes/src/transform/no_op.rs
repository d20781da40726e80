//! No-op node

use async_trait::async_trait;
use flow_engine::{NodeContext, NodeContract, NodeOutput, Result};

/// Passes its input through unchanged
///
/// Useful as a named junction point in a graph and in tests.
pub struct NoOpNode;

#[async_trait]
impl NodeContract for NoOpNode {
    fn outputs(&self) -> &[&str] {
        &["main"]
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
        Ok(NodeOutput::Single(ctx.main_input().to_vec()))
    }
}
