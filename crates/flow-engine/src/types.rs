//! Core types for workflow definitions and branch payloads
//!
//! These types define the engine-facing view of a workflow: nodes,
//! connections with named output branches, and the item envelopes that
//! flow along branches.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Unique identifier for a node within a workflow
pub type NodeId = String;

/// Name of an output (or input) branch on a node
pub type BranchName = String;

/// A single unit of data flowing along a branch
///
/// Every value on a branch is wrapped in a `{ json: ... }` envelope so
/// that branch payloads are uniform regardless of what a node emits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub json: Value,
}

impl Item {
    /// Wrap a JSON value in an item envelope
    pub fn new(json: Value) -> Self {
        Self { json }
    }
}

/// An ordered sequence of items flowing along one branch
///
/// A branch payload is always an item set (possibly empty), never a
/// bare scalar.
pub type ItemSet = Vec<Item>;

/// Normalize an arbitrary JSON value into an item set
///
/// Rules:
/// - `null` becomes an empty set
/// - an array becomes one item per element
/// - an item set wrapped once as `[ItemSet]` is flattened (a common
///   shape producers emit when they forget to unwrap `items[0]`)
/// - elements already carrying a `json` key pass through unchanged;
///   anything else is wrapped as `{ json: value }`
pub fn normalize_items(value: Value) -> ItemSet {
    match value {
        Value::Null => Vec::new(),
        Value::Array(mut elements) => {
            // Defensive unwrap of a single-wrapped item set
            if elements.len() == 1 && elements[0].is_array() {
                if let Value::Array(inner) = elements.remove(0) {
                    elements = inner;
                }
            }
            elements.into_iter().map(normalize_item).collect()
        }
        other => vec![normalize_item(other)],
    }
}

fn normalize_item(value: Value) -> Item {
    if let Value::Object(mut map) = value {
        if let Some(json) = map.remove("json") {
            return Item::new(json);
        }
        return Item::new(Value::Object(map));
    }
    Item::new(value)
}

/// A node instance in a workflow
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeDef {
    /// Unique identifier within the workflow
    pub id: NodeId,
    /// Node type (selects a contract implementation in the registry)
    pub node_type: String,
    /// Arbitrary configuration consumed by the node implementation
    #[serde(default)]
    pub parameters: Value,
    /// Disabled nodes are never scheduled
    #[serde(default)]
    pub disabled: bool,
    /// When set, a failing invocation passes its input through instead
    /// of failing the execution
    #[serde(default)]
    pub continue_on_error: bool,
    /// Names of credentials the platform resolves for this node
    #[serde(default)]
    pub credential_refs: Vec<String>,
}

impl NodeDef {
    /// Create a node definition with empty parameters
    pub fn new(id: impl Into<String>, node_type: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            node_type: node_type.into(),
            parameters: Value::Null,
            disabled: false,
            continue_on_error: false,
            credential_refs: Vec::new(),
        }
    }
}

/// A directed connection from a named output branch to a named input
///
/// Declaration order is significant: fan-in payloads concatenate in the
/// order their connections were declared.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection {
    /// Source node ID
    pub source: NodeId,
    /// Output branch name on the source node
    pub source_output: BranchName,
    /// Target node ID
    pub target: NodeId,
    /// Input branch name on the target node
    pub target_input: BranchName,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        source: impl Into<String>,
        source_output: impl Into<String>,
        target: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        Self {
            source: source.into(),
            source_output: source_output.into(),
            target: target.into(),
            target_input: target_input.into(),
        }
    }
}

/// Per-workflow execution settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowSettings {
    /// Override for the engine-level cap on node invocations per run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_node_invocations: Option<u32>,
}

/// A complete workflow definition
///
/// Immutable for the duration of a run; the engine only reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    /// Unique identifier for this workflow
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Nodes in the workflow
    pub nodes: Vec<NodeDef>,
    /// Connections between node branches
    pub connections: Vec<Connection>,
    /// IDs of the nodes that start an execution
    #[serde(default)]
    pub triggers: Vec<NodeId>,
    /// Execution settings
    #[serde(default)]
    pub settings: WorkflowSettings,
    /// Whether the workflow is active in the platform
    #[serde(default)]
    pub active: bool,
}

impl Workflow {
    /// Create a new empty workflow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            nodes: Vec::new(),
            connections: Vec::new(),
            triggers: Vec::new(),
            settings: WorkflowSettings::default(),
            active: false,
        }
    }

    /// Find a node by ID
    pub fn find_node(&self, id: &str) -> Option<&NodeDef> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Connections leaving a given node, in declaration order
    pub fn outgoing<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.source == node_id)
    }

    /// Connections entering a given node, in declaration order
    pub fn incoming<'a>(&'a self, node_id: &'a str) -> impl Iterator<Item = &'a Connection> + 'a {
        self.connections.iter().filter(move |c| c.target == node_id)
    }
}
