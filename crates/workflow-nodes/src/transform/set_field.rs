//! Set-field node
//!
//! Writes a literal value at a field path on every input item.

use async_trait::async_trait;
use flow_engine::path::set_path;
use flow_engine::{EngineError, Item, NodeContext, NodeContract, NodeOutput, Result};
use serde_json::Value;

/// Writes `value` at `fieldName` on every item
///
/// Parameters:
/// - `fieldName`: dotted/bracketed path to write (required)
/// - `value`: the literal JSON value to store
pub struct SetFieldNode;

#[async_trait]
impl NodeContract for SetFieldNode {
    fn outputs(&self) -> &[&str] {
        &["main"]
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
        let field = match ctx.param_str("fieldName") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(EngineError::MissingFieldName),
        };
        let value = ctx.param("value").cloned().unwrap_or(Value::Null);

        let mut items = Vec::with_capacity(ctx.main_input().len());
        for item in ctx.main_input() {
            let mut json = item.json.clone();
            if !set_path(&mut json, &field, value.clone()) {
                return Err(EngineError::node(
                    ctx.node_id(),
                    format!("Cannot write field '{field}'"),
                ));
            }
            items.push(Item::new(json));
        }
        Ok(NodeOutput::Single(items))
    }
}
