//! If node
//!
//! Routes each input item to `true` or `false` by comparing a field
//! path against a configured value.

use async_trait::async_trait;
use flow_engine::path::resolve_path;
use flow_engine::{EngineError, NodeContext, NodeContract, NodeOutput, Result};
use serde_json::Value;

/// Per-item conditional routing
///
/// Parameters:
/// - `fieldName`: dotted/bracketed path evaluated against each item
/// - `operator`: `equals` (default), `notEquals`, `greaterThan`,
///   `lessThan`, `contains`, `exists`
/// - `value`: the comparison operand (ignored by `exists`)
pub struct IfNode;

#[async_trait]
impl NodeContract for IfNode {
    fn outputs(&self) -> &[&str] {
        &["true", "false"]
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
        let field = match ctx.param_str("fieldName") {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => return Err(EngineError::MissingFieldName),
        };
        let operator = ctx.param_str("operator").unwrap_or("equals").to_string();
        let operand = ctx.param("value").cloned().unwrap_or(Value::Null);

        let mut matched = Vec::new();
        let mut unmatched = Vec::new();
        for item in ctx.main_input() {
            let resolved = resolve_path(&item.json, &field);
            if evaluate(&operator, resolved, &operand)
                .ok_or_else(|| {
                    EngineError::node(ctx.node_id(), format!("Unknown operator '{operator}'"))
                })?
            {
                matched.push(item.clone());
            } else {
                unmatched.push(item.clone());
            }
        }

        log::debug!(
            "If '{}': {} matched, {} unmatched",
            ctx.node_id(),
            matched.len(),
            unmatched.len()
        );
        Ok(NodeOutput::Branches(vec![matched, unmatched]))
    }
}

/// Apply one comparison; `None` for an unknown operator
fn evaluate(operator: &str, resolved: Option<&Value>, operand: &Value) -> Option<bool> {
    let result = match operator {
        "exists" => resolved.is_some() && resolved != Some(&Value::Null),
        "equals" => resolved == Some(operand),
        "notEquals" => resolved != Some(operand),
        "greaterThan" => compare(resolved, operand).map(|o| o.is_gt()).unwrap_or(false),
        "lessThan" => compare(resolved, operand).map(|o| o.is_lt()).unwrap_or(false),
        "contains" => contains(resolved, operand),
        _ => return None,
    };
    Some(result)
}

/// Numeric or lexicographic ordering when both sides support it
fn compare(resolved: Option<&Value>, operand: &Value) -> Option<std::cmp::Ordering> {
    let resolved = resolved?;
    if let (Some(a), Some(b)) = (resolved.as_f64(), operand.as_f64()) {
        return a.partial_cmp(&b);
    }
    if let (Some(a), Some(b)) = (resolved.as_str(), operand.as_str()) {
        return Some(a.cmp(b));
    }
    None
}

fn contains(resolved: Option<&Value>, operand: &Value) -> bool {
    match resolved {
        Some(Value::String(s)) => operand.as_str().map(|needle| s.contains(needle)).unwrap_or(false),
        Some(Value::Array(elements)) => elements.contains(operand),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flow_engine::{Item, NodeStateStore, ResolvedCredentials};
    use serde_json::json;
    use std::collections::HashMap;

    async fn run(params: Value, items: Vec<Item>) -> Result<(Vec<Item>, Vec<Item>)> {
        let creds = ResolvedCredentials::new();
        let mut store = NodeStateStore::new();
        let mut inputs = HashMap::new();
        inputs.insert("main".to_string(), items);
        let mut ctx = NodeContext::new("e1", "if1", inputs, &params, &creds, &mut store);
        match IfNode.execute(&mut ctx).await? {
            NodeOutput::Branches(mut sets) => {
                let f = sets.pop().unwrap_or_default();
                let t = sets.pop().unwrap_or_default();
                Ok((t, f))
            }
            _ => panic!("expected branches"),
        }
    }

    #[tokio::test]
    async fn test_equals_routes_per_item() {
        let (t, f) = run(
            json!({"fieldName": "status", "operator": "equals", "value": "active"}),
            vec![
                Item::new(json!({"status": "active"})),
                Item::new(json!({"status": "archived"})),
                Item::new(json!({"status": "active"})),
            ],
        )
        .await
        .unwrap();
        assert_eq!(t.len(), 2);
        assert_eq!(f.len(), 1);
        assert_eq!(f[0].json["status"], json!("archived"));
    }

    #[tokio::test]
    async fn test_greater_than_on_nested_path() {
        let (t, f) = run(
            json!({"fieldName": "stats.count", "operator": "greaterThan", "value": 10}),
            vec![
                Item::new(json!({"stats": {"count": 5}})),
                Item::new(json!({"stats": {"count": 15}})),
            ],
        )
        .await
        .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t[0].json["stats"]["count"], json!(15));
        assert_eq!(f.len(), 1);
    }

    #[tokio::test]
    async fn test_exists_treats_missing_and_null_as_false() {
        let (t, f) = run(
            json!({"fieldName": "email", "operator": "exists"}),
            vec![
                Item::new(json!({"email": "a@b.c"})),
                Item::new(json!({"email": null})),
                Item::new(json!({})),
            ],
        )
        .await
        .unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(f.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_operator_is_an_error() {
        let err = run(
            json!({"fieldName": "a", "operator": "like", "value": 1}),
            vec![Item::new(json!({"a": 1}))],
        )
        .await;
        assert!(matches!(err, Err(EngineError::NodeExecution { .. })));
    }
}
