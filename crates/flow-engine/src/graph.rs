//! Execution graph builder
//!
//! Compiles a `Workflow` into the adjacency structure the scheduler
//! walks: per-(node, output) outgoing connection lists and per-node
//! incoming barrier slots, both in declaration order.
//!
//! Loop wiring is handled here structurally: a connection into a
//! re-entrant node whose target can already reach the source is
//! classified as a loop-back edge. Loop-back edges are excluded from
//! the DAG check and from barrier slots, so the structural graph stays
//! acyclic while the scheduler re-enters loop nodes through them.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::{EngineError, Result};
use crate::registry::NodeRegistry;
use crate::types::{BranchName, Connection, NodeId, Workflow};

/// Index of a connection within the compiled graph
pub type ConnIndex = usize;

/// Compiled adjacency structure for one workflow
#[derive(Debug)]
pub struct ExecutionGraph {
    connections: Vec<Connection>,
    loop_back: Vec<bool>,
    outgoing: HashMap<(NodeId, BranchName), Vec<ConnIndex>>,
    incoming: HashMap<NodeId, Vec<ConnIndex>>,
    reachable: HashSet<NodeId>,
}

impl ExecutionGraph {
    /// The connection at a given index
    pub fn connection(&self, index: ConnIndex) -> &Connection {
        &self.connections[index]
    }

    /// Whether a connection re-enters a loop node
    pub fn is_loop_back(&self, index: ConnIndex) -> bool {
        self.loop_back[index]
    }

    /// Connections leaving `(node, output)`, in declaration order
    pub fn next(&self, node_id: &str, output: &str) -> &[ConnIndex] {
        self.outgoing
            .get(&(node_id.to_string(), output.to_string()))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Barrier slots for a node: its incoming connections excluding
    /// loop-back edges, in declaration order
    pub fn barrier_slots(&self, node_id: &str) -> &[ConnIndex] {
        self.incoming
            .get(node_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// Whether a node is reachable from any trigger
    pub fn is_reachable(&self, node_id: &str) -> bool {
        self.reachable.contains(node_id)
    }

    /// Number of compiled connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

/// Compile and validate a workflow against a registry
///
/// Validation errors surface before any node runs. Connections touching
/// disabled nodes are dropped; nodes unreachable from any trigger stay
/// in the graph but are never scheduled.
pub fn build_graph(workflow: &Workflow, registry: &NodeRegistry) -> Result<ExecutionGraph> {
    let enabled: HashMap<&str, &crate::types::NodeDef> = workflow
        .nodes
        .iter()
        .filter(|n| !n.disabled)
        .map(|n| (n.id.as_str(), n))
        .collect();

    for node in workflow.nodes.iter().filter(|n| !n.disabled) {
        if !registry.contains(&node.node_type) {
            return Err(EngineError::validation(format!(
                "Unknown node type '{}' for node '{}'",
                node.node_type, node.id
            )));
        }
    }

    if workflow.triggers.is_empty() {
        return Err(EngineError::validation("Workflow has no trigger nodes"));
    }
    for trigger in &workflow.triggers {
        if workflow.find_node(trigger).is_none() {
            return Err(EngineError::validation(format!(
                "Trigger references unknown node '{trigger}'"
            )));
        }
        if !enabled.contains_key(trigger.as_str()) {
            return Err(EngineError::validation(format!(
                "Trigger node '{trigger}' is disabled"
            )));
        }
    }

    let mut connections = Vec::new();
    for conn in &workflow.connections {
        if workflow.find_node(&conn.source).is_none() {
            return Err(EngineError::validation(format!(
                "Connection references unknown node '{}'",
                conn.source
            )));
        }
        if workflow.find_node(&conn.target).is_none() {
            return Err(EngineError::validation(format!(
                "Connection references unknown node '{}'",
                conn.target
            )));
        }

        let (Some(source), Some(_)) = (
            enabled.get(conn.source.as_str()),
            enabled.get(conn.target.as_str()),
        ) else {
            log::debug!(
                "Dropping connection {} -> {} (disabled endpoint)",
                conn.source,
                conn.target
            );
            continue;
        };

        let contract = registry
            .get(&source.node_type)
            .ok_or_else(|| EngineError::validation("node type disappeared from registry"))?;
        if !contract.outputs().contains(&conn.source_output.as_str()) {
            return Err(EngineError::validation(format!(
                "Node '{}' ({}) does not declare output '{}'",
                conn.source, source.node_type, conn.source_output
            )));
        }

        connections.push(conn.clone());
    }

    let loop_back = classify_loop_back(&connections, &enabled, registry);

    detect_cycles(&enabled, &connections, &loop_back)?;

    let reachable = reachable_from_triggers(&workflow.triggers, &connections);
    for id in enabled.keys() {
        if !reachable.contains(*id) {
            log::debug!("Node '{id}' is unreachable from any trigger; it will never run");
        }
    }

    let mut outgoing: HashMap<(NodeId, BranchName), Vec<ConnIndex>> = HashMap::new();
    let mut incoming: HashMap<NodeId, Vec<ConnIndex>> = HashMap::new();
    for (index, conn) in connections.iter().enumerate() {
        outgoing
            .entry((conn.source.clone(), conn.source_output.clone()))
            .or_default()
            .push(index);
        if loop_back[index] {
            continue;
        }
        // A slot whose source can never run would hold the target's
        // barrier pending forever; only reachable sources get slots
        if !reachable.contains(&conn.source) {
            log::debug!(
                "Connection {} -> {} carries no barrier slot (source unreachable)",
                conn.source,
                conn.target
            );
            continue;
        }
        incoming.entry(conn.target.clone()).or_default().push(index);
    }

    Ok(ExecutionGraph {
        connections,
        loop_back,
        outgoing,
        incoming,
        reachable,
    })
}

/// Classify connections that re-enter a loop node
///
/// A connection `s -> t` is loop-back when `t` is re-entrant and `t`
/// can reach `s` through the other connections (a self-connection
/// qualifies trivially).
fn classify_loop_back(
    connections: &[Connection],
    enabled: &HashMap<&str, &crate::types::NodeDef>,
    registry: &NodeRegistry,
) -> Vec<bool> {
    connections
        .iter()
        .enumerate()
        .map(|(index, conn)| {
            let Some(target) = enabled.get(conn.target.as_str()) else {
                return false;
            };
            let reentrant = registry
                .get(&target.node_type)
                .map(|c| c.reentrant())
                .unwrap_or(false);
            if !reentrant {
                return false;
            }
            conn.target == conn.source
                || reaches(&conn.target, &conn.source, connections, index)
        })
        .collect()
}

/// Whether `from` reaches `to` through connections other than `skip`
fn reaches(from: &str, to: &str, connections: &[Connection], skip: ConnIndex) -> bool {
    let mut queue = VecDeque::from([from]);
    let mut seen = HashSet::from([from]);
    while let Some(current) = queue.pop_front() {
        for (index, conn) in connections.iter().enumerate() {
            if index == skip || conn.source != current {
                continue;
            }
            if conn.target == to {
                return true;
            }
            if seen.insert(conn.target.as_str()) {
                queue.push_back(&conn.target);
            }
        }
    }
    false
}

/// Detect cycles in the structural graph using Kahn's algorithm
///
/// Loop-back edges are excluded; everything else must form a DAG.
fn detect_cycles(
    enabled: &HashMap<&str, &crate::types::NodeDef>,
    connections: &[Connection],
    loop_back: &[bool],
) -> Result<()> {
    let mut in_degree: HashMap<&str, usize> = enabled.keys().map(|&id| (id, 0)).collect();
    for (index, conn) in connections.iter().enumerate() {
        if loop_back[index] {
            continue;
        }
        if let Some(deg) = in_degree.get_mut(conn.target.as_str()) {
            *deg += 1;
        }
    }

    let mut queue: VecDeque<&str> = in_degree
        .iter()
        .filter(|(_, &deg)| deg == 0)
        .map(|(&id, _)| id)
        .collect();

    let mut visited = 0;
    while let Some(node_id) = queue.pop_front() {
        visited += 1;
        for (index, conn) in connections.iter().enumerate() {
            if loop_back[index] || conn.source != node_id {
                continue;
            }
            if let Some(deg) = in_degree.get_mut(conn.target.as_str()) {
                *deg -= 1;
                if *deg == 0 {
                    queue.push_back(&conn.target);
                }
            }
        }
    }

    if visited < enabled.len() {
        return Err(EngineError::validation("Cycle detected in workflow graph"));
    }
    Ok(())
}

/// Nodes reachable from the trigger set, loop-back edges included
fn reachable_from_triggers(triggers: &[NodeId], connections: &[Connection]) -> HashSet<NodeId> {
    let mut seen: HashSet<NodeId> = triggers.iter().cloned().collect();
    let mut queue: VecDeque<&str> = triggers.iter().map(|t| t.as_str()).collect();
    while let Some(current) = queue.pop_front() {
        for conn in connections.iter().filter(|c| c.source == current) {
            if seen.insert(conn.target.clone()) {
                queue.push_back(&conn.target);
            }
        }
    }
    seen
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contract::{NodeContext, NodeContract, NodeOutput};
    use crate::types::NodeDef;
    use async_trait::async_trait;
    use std::sync::Arc;

    struct Plain(&'static [&'static str]);

    #[async_trait]
    impl NodeContract for Plain {
        fn outputs(&self) -> &[&str] {
            self.0
        }

        async fn execute(&self, _ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
            Ok(NodeOutput::Single(Vec::new()))
        }
    }

    struct Looping;

    #[async_trait]
    impl NodeContract for Looping {
        fn outputs(&self) -> &[&str] {
            &["loop", "done"]
        }

        fn reentrant(&self) -> bool {
            true
        }

        async fn execute(&self, _ctx: &mut NodeContext<'_>) -> Result<NodeOutput> {
            Ok(NodeOutput::empty(2))
        }
    }

    fn registry() -> NodeRegistry {
        let mut registry = NodeRegistry::new();
        registry.register("trigger", Arc::new(Plain(&["main"])));
        registry.register("no-op", Arc::new(Plain(&["main"])));
        registry.register("if", Arc::new(Plain(&["true", "false"])));
        registry.register("loop", Arc::new(Looping));
        registry
    }

    fn workflow(nodes: &[(&str, &str)], conns: &[(&str, &str, &str, &str)]) -> Workflow {
        let mut wf = Workflow::new("wf", "Test");
        for (id, node_type) in nodes {
            wf.nodes.push(NodeDef::new(*id, *node_type));
        }
        for (s, so, t, ti) in conns {
            wf.connections
                .push(Connection::new(*s, *so, *t, *ti));
        }
        wf.triggers.push("start".to_string());
        wf
    }

    #[test]
    fn test_linear_graph_builds() {
        let wf = workflow(
            &[("start", "trigger"), ("a", "no-op"), ("b", "no-op")],
            &[
                ("start", "main", "a", "main"),
                ("a", "main", "b", "main"),
            ],
        );
        let graph = build_graph(&wf, &registry()).unwrap();
        assert_eq!(graph.next("start", "main").len(), 1);
        assert_eq!(graph.barrier_slots("b").len(), 1);
        assert!(graph.is_reachable("b"));
    }

    #[test]
    fn test_undeclared_output_rejected() {
        let wf = workflow(
            &[("start", "trigger"), ("a", "no-op")],
            &[("start", "bogus", "a", "main")],
        );
        let err = build_graph(&wf, &registry());
        assert!(matches!(err, Err(EngineError::GraphValidation(_))));
    }

    #[test]
    fn test_unknown_node_type_rejected() {
        let mut wf = workflow(&[("start", "trigger")], &[]);
        wf.nodes.push(NodeDef::new("x", "missing-type"));
        let err = build_graph(&wf, &registry());
        assert!(matches!(err, Err(EngineError::GraphValidation(_))));
    }

    #[test]
    fn test_connection_to_unknown_node_rejected() {
        let wf = workflow(
            &[("start", "trigger")],
            &[("start", "main", "ghost", "main")],
        );
        let err = build_graph(&wf, &registry());
        assert!(matches!(err, Err(EngineError::GraphValidation(_))));
    }

    #[test]
    fn test_cycle_between_plain_nodes_rejected() {
        let wf = workflow(
            &[("start", "trigger"), ("a", "no-op"), ("b", "no-op")],
            &[
                ("start", "main", "a", "main"),
                ("a", "main", "b", "main"),
                ("b", "main", "a", "main"),
            ],
        );
        let err = build_graph(&wf, &registry());
        assert!(matches!(err, Err(EngineError::GraphValidation(_))));
    }

    #[test]
    fn test_loop_wiring_is_not_a_cycle() {
        // start -> loop -> body -> loop (tail), loop.done -> end
        let wf = workflow(
            &[
                ("start", "trigger"),
                ("l", "loop"),
                ("body", "no-op"),
                ("end", "no-op"),
            ],
            &[
                ("start", "main", "l", "main"),
                ("l", "loop", "body", "main"),
                ("body", "main", "l", "main"),
                ("l", "done", "end", "main"),
            ],
        );
        let graph = build_graph(&wf, &registry()).unwrap();
        // The tail edge body -> l is loop-back and not a barrier slot
        let tail = graph
            .next("body", "main")
            .iter()
            .copied()
            .find(|&i| graph.connection(i).target == "l")
            .unwrap();
        assert!(graph.is_loop_back(tail));
        assert_eq!(graph.barrier_slots("l").len(), 1);
    }

    #[test]
    fn test_disabled_node_connections_dropped() {
        let mut wf = workflow(
            &[("start", "trigger"), ("a", "no-op"), ("b", "no-op")],
            &[
                ("start", "main", "a", "main"),
                ("a", "main", "b", "main"),
            ],
        );
        wf.nodes[1].disabled = true;
        let graph = build_graph(&wf, &registry()).unwrap();
        assert_eq!(graph.connection_count(), 0);
        assert!(graph.barrier_slots("b").is_empty());
    }

    #[test]
    fn test_missing_trigger_rejected() {
        let mut wf = workflow(&[("start", "trigger")], &[]);
        wf.triggers.clear();
        let err = build_graph(&wf, &registry());
        assert!(matches!(err, Err(EngineError::GraphValidation(_))));
    }

    #[test]
    fn test_unreachable_source_gets_no_barrier_slot() {
        // orphan is enabled and wired into the merge, but no trigger
        // reaches it; the merge must not wait on that slot
        let wf = workflow(
            &[
                ("start", "trigger"),
                ("a", "no-op"),
                ("orphan", "no-op"),
                ("m", "no-op"),
            ],
            &[
                ("start", "main", "a", "main"),
                ("a", "main", "m", "main"),
                ("orphan", "main", "m", "main"),
            ],
        );
        let graph = build_graph(&wf, &registry()).unwrap();
        assert!(!graph.is_reachable("orphan"));
        let slots = graph.barrier_slots("m");
        assert_eq!(slots.len(), 1);
        assert_eq!(graph.connection(slots[0]).source, "a");
    }

    #[test]
    fn test_fan_in_preserves_declaration_order() {
        let wf = workflow(
            &[
                ("start", "trigger"),
                ("f", "if"),
                ("m", "no-op"),
            ],
            &[
                ("start", "main", "f", "main"),
                ("f", "true", "m", "main"),
                ("f", "false", "m", "main"),
            ],
        );
        let graph = build_graph(&wf, &registry()).unwrap();
        let slots = graph.barrier_slots("m");
        assert_eq!(slots.len(), 2);
        assert_eq!(graph.connection(slots[0]).source_output, "true");
        assert_eq!(graph.connection(slots[1]).source_output, "false");
    }
}
