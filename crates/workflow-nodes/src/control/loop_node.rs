//! Loop node
//!
//! The canonical re-entrant node. The first invocation resolves the
//! full iteration domain from its parameters, persists it in node
//! state, and then behaves like every later invocation: emit the next
//! batch on `loop`, advance the index, re-persist. The workflow author
//! wires the loop body's tail back into this node, so the engine's
//! execute-downstream-to-quiescence rule re-enters it until the domain
//! is exhausted, at which point state is cleared and `done` fires once.

use async_trait::async_trait;
use flow_engine::path::resolve_path;
use flow_engine::{EngineError, Item, ItemSet, NodeContext, NodeContract, NodeOutput, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Hard cap on the size of a `repeat` domain
const MAX_REPEAT_ITERATIONS: i64 = 100_000;

/// Iterates over a domain of values, one batch per invocation
///
/// Parameters:
/// - `loopOver`: `repeat`, `items` (default), or `field`
/// - `repeatTimes`: domain size for `repeat` mode
/// - `fieldName`: path to an array on the first input item for `field`
///   mode
/// - `batchSize`: items emitted per invocation (default 1)
///
/// Each emitted item carries `$index`, `$iteration`, `$total`,
/// `$isFirst`, `$isLast`, `$batchIndex` and `$batchSize`. When the
/// domain is exhausted, `done` emits `{completed: true,
/// totalIterations}` and node state is cleared.
pub struct LoopNode;

/// Iteration progress persisted across invocations
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LoopState {
    items_to_loop: Vec<Value>,
    current_index: usize,
    total_items: usize,
}

#[async_trait]
impl NodeContract for LoopNode {
    fn outputs(&self) -> &[&str] {
        &["loop", "done"]
    }

    fn reentrant(&self) -> bool {
        true
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
        let mut state = match ctx.get_state() {
            Some(value) => serde_json::from_value(value.clone())?,
            None => {
                let items = resolve_domain(ctx)?;
                LoopState {
                    total_items: items.len(),
                    items_to_loop: items,
                    current_index: 0,
                }
            }
        };

        if state.current_index >= state.total_items {
            ctx.clear_state();
            log::debug!(
                "Loop '{}' completed after {} items",
                ctx.node_id(),
                state.total_items
            );
            return Ok(NodeOutput::Branches(vec![
                Vec::new(),
                vec![Item::new(json!({
                    "completed": true,
                    "totalIterations": state.total_items,
                }))],
            ]));
        }

        let batch_size = ctx
            .param_i64("batchSize")
            .filter(|&size| size > 0)
            .unwrap_or(1) as usize;
        let start = state.current_index;
        let end = (start + batch_size).min(state.total_items);
        let batch_index = start / batch_size;

        let batch: ItemSet = state.items_to_loop[start..end]
            .iter()
            .enumerate()
            .map(|(offset, value)| {
                annotate(
                    value.clone(),
                    Metadata {
                        index: start + offset,
                        iteration: batch_index + 1,
                        total: state.total_items,
                        is_first: start == 0,
                        is_last: end >= state.total_items,
                        batch_index,
                        batch_size: end - start,
                    },
                )
            })
            .collect();

        state.current_index = end;
        ctx.set_state(serde_json::to_value(&state)?);

        Ok(NodeOutput::Branches(vec![batch, Vec::new()]))
    }
}

struct Metadata {
    index: usize,
    iteration: usize,
    total: usize,
    is_first: bool,
    is_last: bool,
    batch_index: usize,
    batch_size: usize,
}

/// Wrap non-objects as `{value}` and inject the `$`-prefixed metadata
fn annotate(value: Value, meta: Metadata) -> Item {
    let mut map = match value {
        Value::Object(map) => map,
        other => {
            let mut map = serde_json::Map::new();
            map.insert("value".to_string(), other);
            map
        }
    };
    map.insert("$index".to_string(), json!(meta.index));
    map.insert("$iteration".to_string(), json!(meta.iteration));
    map.insert("$total".to_string(), json!(meta.total));
    map.insert("$isFirst".to_string(), json!(meta.is_first));
    map.insert("$isLast".to_string(), json!(meta.is_last));
    map.insert("$batchIndex".to_string(), json!(meta.batch_index));
    map.insert("$batchSize".to_string(), json!(meta.batch_size));
    Item::new(Value::Object(map))
}

/// Compute the full iteration domain from the node's parameters
fn resolve_domain(ctx: &NodeContext<'_>) -> Result<Vec<Value>> {
    match ctx.param_str("loopOver").unwrap_or("items") {
        "repeat" => {
            let times = ctx.param_i64("repeatTimes").unwrap_or(0);
            if times <= 0 {
                return Err(EngineError::InvalidIterationCount(times));
            }
            if times > MAX_REPEAT_ITERATIONS {
                return Err(EngineError::SafetyLimitExceeded {
                    requested: times,
                    limit: MAX_REPEAT_ITERATIONS,
                });
            }
            Ok((1..=times).map(|i| json!(i)).collect())
        }
        "field" => {
            let field = match ctx.param_str("fieldName") {
                Some(name) if !name.is_empty() => name,
                _ => return Err(EngineError::MissingFieldName),
            };
            let first = ctx.main_input().first().ok_or(EngineError::NoInputItems)?;
            match resolve_path(&first.json, field) {
                Some(Value::Array(elements)) => Ok(elements.clone()),
                _ => Err(EngineError::FieldNotArray(field.to_string())),
            }
        }
        // Default: iterate the aggregated input itself
        _ => Ok(ctx.main_input().iter().map(|item| item.json.clone()).collect()),
    }
}
