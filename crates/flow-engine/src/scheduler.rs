//! Scheduler / execution engine
//!
//! Walks the compiled graph depth-first, left to right, branch by
//! branch: every non-empty output branch has its entire downstream
//! subgraph executed to quiescence before the next branch is
//! considered. Loop re-entrancy is not a scheduler special case; a
//! loop-back connection simply re-invokes its target, which resumes
//! from persisted node state.
//!
//! The walk runs on an explicit LIFO work stack inside one async task.
//! Work items are pushed in reverse declaration order so that popping
//! preserves the left-to-right guarantee, and a freshly pushed subtree
//! is always drained before older items underneath it.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use serde_json::Value;

use crate::contract::{NodeContext, NodeOutput, ResolvedCredentials};
use crate::error::{EngineError, Result};
use crate::events::{EngineEvent, EventSink, NullEventSink};
use crate::graph::{build_graph, ConnIndex, ExecutionGraph};
use crate::records::{
    ExecutionInstance, ExecutionStatus, NodeExecutionRecord, NullRecordSink, RecordSink,
};
use crate::registry::NodeRegistry;
use crate::standardize::{standardize_outputs, BranchOutputs};
use crate::state::NodeStateStore;
use crate::types::{normalize_items, BranchName, ItemSet, NodeDef, NodeId, Workflow};

/// Default cap on node invocations per execution
pub const DEFAULT_MAX_INVOCATIONS: u32 = 10_000;

/// Shared handle for observing and cancelling a running execution
#[derive(Clone)]
pub struct ExecutionHandle {
    execution_id: String,
    status: Arc<parking_lot::Mutex<ExecutionStatus>>,
}

impl ExecutionHandle {
    /// Create a handle for a new execution in the PENDING state
    pub fn new() -> Self {
        Self {
            execution_id: uuid::Uuid::new_v4().to_string(),
            status: Arc::new(parking_lot::Mutex::new(ExecutionStatus::Pending)),
        }
    }

    /// The execution ID this handle observes
    pub fn execution_id(&self) -> &str {
        &self.execution_id
    }

    /// Current status of the execution
    pub fn status(&self) -> ExecutionStatus {
        *self.status.lock()
    }

    /// Request cancellation
    ///
    /// Only a RUNNING execution may be cancelled; anything else is an
    /// error to the caller and leaves the status unchanged. The
    /// scheduler observes the transition between node invocations.
    pub fn cancel(&self) -> Result<()> {
        let mut status = self.status.lock();
        if *status != ExecutionStatus::Running {
            return Err(EngineError::NotCancellable);
        }
        *status = ExecutionStatus::Cancelled;
        Ok(())
    }

    fn set_status(&self, to: ExecutionStatus) {
        *self.status.lock() = to;
    }

    /// Transition to a terminal status unless cancellation won the race
    fn finish(&self, to: ExecutionStatus) -> ExecutionStatus {
        let mut status = self.status.lock();
        if *status == ExecutionStatus::Running {
            *status = to;
        }
        *status
    }
}

impl Default for ExecutionHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Delivery state of one barrier slot
#[derive(Debug)]
enum SlotState {
    /// Nothing has arrived yet
    Pending,
    /// Fresh data waiting to be consumed
    Delivered(ItemSet),
    /// Data was consumed by an invocation
    Consumed,
    /// The upstream branch completed empty; nothing will arrive
    Inactive,
}

/// Unit of work on the scheduler's LIFO stack
enum WorkItem {
    Invoke {
        node_id: NodeId,
        inputs: Vec<(BranchName, ItemSet)>,
    },
    Deliver {
        conn: ConnIndex,
        items: ItemSet,
    },
    Deactivate {
        conn: ConnIndex,
    },
}

enum Readiness {
    Waiting,
    Ready(Vec<(BranchName, ItemSet)>),
    Dead,
}

/// The execution engine
///
/// Holds the node registry and the sinks shared by every run. Each
/// `execute` call schedules one independent execution; concurrent
/// executions share nothing but the registry.
pub struct ExecutionEngine {
    registry: NodeRegistry,
    event_sink: Arc<dyn EventSink>,
    record_sink: Arc<dyn RecordSink>,
    max_invocations: u32,
}

impl ExecutionEngine {
    /// Create an engine with no event or record sinks attached
    pub fn new(registry: NodeRegistry) -> Self {
        Self {
            registry,
            event_sink: Arc::new(NullEventSink),
            record_sink: Arc::new(NullRecordSink),
            max_invocations: DEFAULT_MAX_INVOCATIONS,
        }
    }

    /// Attach an event sink
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Attach a record sink
    pub fn with_record_sink(mut self, sink: Arc<dyn RecordSink>) -> Self {
        self.record_sink = sink;
        self
    }

    /// Override the default cap on node invocations per execution
    pub fn with_max_invocations(mut self, max: u32) -> Self {
        self.max_invocations = max;
        self
    }

    /// The registry this engine dispatches against
    pub fn registry(&self) -> &NodeRegistry {
        &self.registry
    }

    /// Run a workflow to quiescence
    ///
    /// Returns `Err` only for pre-start validation failures; once the
    /// run starts, node failures and cancellation are reported through
    /// the returned instance's terminal status.
    pub async fn execute(
        &self,
        workflow: &Workflow,
        trigger_data: Value,
        credentials: &HashMap<NodeId, ResolvedCredentials>,
        handle: ExecutionHandle,
    ) -> Result<ExecutionInstance> {
        let graph = build_graph(workflow, &self.registry)?;

        let execution_id = handle.execution_id().to_string();
        let mut instance =
            ExecutionInstance::new(execution_id.clone(), workflow.id.clone(), trigger_data.clone());
        instance.status = ExecutionStatus::Running;
        handle.set_status(ExecutionStatus::Running);
        self.record_sink.upsert_instance(&instance);

        log::info!("Execution {execution_id} started for workflow {}", workflow.id);
        self.emit(EngineEvent::ExecutionStarted {
            workflow_id: workflow.id.clone(),
            execution_id: execution_id.clone(),
        });

        let mut run = Run {
            engine: self,
            workflow,
            graph: &graph,
            handle: &handle,
            execution_id: &execution_id,
            credentials,
            state: NodeStateStore::new(),
            slots: HashMap::new(),
            deactivated: HashSet::new(),
            invoked: HashSet::new(),
            iteration_counters: HashMap::new(),
            invocations: 0,
            max_invocations: workflow
                .settings
                .max_node_invocations
                .unwrap_or(self.max_invocations),
        };

        let outcome = run.run(trigger_data).await;

        instance.finished_at = Some(chrono::Utc::now());
        match outcome {
            Ok(()) => {
                let status = handle.finish(ExecutionStatus::Success);
                instance.status = status;
                if status == ExecutionStatus::Success {
                    log::info!("Execution {execution_id} completed");
                    self.emit(EngineEvent::ExecutionCompleted {
                        workflow_id: workflow.id.clone(),
                        execution_id: execution_id.clone(),
                    });
                } else {
                    self.emit(EngineEvent::ExecutionCancelled {
                        workflow_id: workflow.id.clone(),
                        execution_id: execution_id.clone(),
                    });
                }
            }
            Err(EngineError::Cancelled) => {
                instance.status = ExecutionStatus::Cancelled;
                log::info!("Execution {execution_id} cancelled");
                self.emit(EngineEvent::ExecutionCancelled {
                    workflow_id: workflow.id.clone(),
                    execution_id: execution_id.clone(),
                });
            }
            Err(error) => {
                handle.set_status(ExecutionStatus::Failed);
                instance.status = ExecutionStatus::Failed;
                instance.error = Some(error.to_string());
                log::warn!("Execution {execution_id} failed: {error}");
                self.emit(EngineEvent::ExecutionFailed {
                    workflow_id: workflow.id.clone(),
                    execution_id: execution_id.clone(),
                    error: error.to_string(),
                });
            }
        }
        self.record_sink.upsert_instance(&instance);

        Ok(instance)
    }

    fn emit(&self, event: EngineEvent) {
        if let Err(error) = self.event_sink.send(event) {
            log::warn!("Dropping engine event: {error}");
        }
    }
}

/// Mutable state of one run
struct Run<'a> {
    engine: &'a ExecutionEngine,
    workflow: &'a Workflow,
    graph: &'a ExecutionGraph,
    handle: &'a ExecutionHandle,
    execution_id: &'a str,
    credentials: &'a HashMap<NodeId, ResolvedCredentials>,
    state: NodeStateStore,
    slots: HashMap<ConnIndex, SlotState>,
    deactivated: HashSet<ConnIndex>,
    invoked: HashSet<NodeId>,
    iteration_counters: HashMap<NodeId, u32>,
    invocations: u32,
    max_invocations: u32,
}

impl Run<'_> {
    async fn run(&mut self, trigger_data: Value) -> Result<()> {
        let mut stack: Vec<WorkItem> = Vec::new();

        // Triggers start in declaration order, so push them reversed
        let trigger_items = normalize_items(trigger_data);
        for trigger in self.workflow.triggers.iter().rev() {
            stack.push(WorkItem::Invoke {
                node_id: trigger.clone(),
                inputs: vec![("main".to_string(), trigger_items.clone())],
            });
        }

        while let Some(item) = stack.pop() {
            match item {
                WorkItem::Invoke { node_id, inputs } => {
                    self.invoke(&node_id, inputs, &mut stack).await?;
                }
                WorkItem::Deliver { conn, items } => {
                    self.deliver(conn, items, &mut stack);
                }
                WorkItem::Deactivate { conn } => {
                    self.deactivate(conn, &mut stack);
                }
            }
        }
        Ok(())
    }

    /// Run one node invocation and push its downstream work
    async fn invoke(
        &mut self,
        node_id: &str,
        inputs: Vec<(BranchName, ItemSet)>,
        stack: &mut Vec<WorkItem>,
    ) -> Result<()> {
        // Cancellation is observed between invocations, never mid-node
        if self.handle.status() == ExecutionStatus::Cancelled {
            return Err(EngineError::Cancelled);
        }

        self.invocations += 1;
        if self.invocations > self.max_invocations {
            return Err(EngineError::InvocationLimit(self.max_invocations));
        }

        let node = self
            .workflow
            .find_node(node_id)
            .ok_or_else(|| EngineError::validation(format!("Unknown node '{node_id}'")))?;
        let contract = self.engine.registry.get(&node.node_type).ok_or_else(|| {
            EngineError::validation(format!("Unknown node type '{}'", node.node_type))
        })?;

        let counter = self
            .iteration_counters
            .entry(node_id.to_string())
            .or_insert(0);
        let iteration = *counter;
        *counter += 1;

        log::debug!("Invoking node '{node_id}' (iteration {iteration})");
        self.invoked.insert(node_id.to_string());
        self.engine.emit(EngineEvent::NodeStarted {
            node_id: node_id.to_string(),
            execution_id: self.execution_id.to_string(),
            iteration,
        });

        let started_at = chrono::Utc::now();
        let input_snapshot = inputs.clone();
        let mut input_map: HashMap<BranchName, ItemSet> = HashMap::new();
        for (branch, items) in inputs {
            input_map.entry(branch).or_default().extend(items);
        }

        let no_credentials = ResolvedCredentials::new();
        let credentials = self.credentials.get(node_id).unwrap_or(&no_credentials);
        let mut ctx = NodeContext::new(
            self.execution_id,
            node_id,
            input_map,
            &node.parameters,
            credentials,
            &mut self.state,
        );

        let declared = contract.outputs();
        let result = contract
            .execute(&mut ctx)
            .await
            .and_then(|output| standardize_outputs(declared, output));

        let branches = match result {
            Ok(branches) => {
                self.engine.emit(EngineEvent::NodeCompleted {
                    node_id: node_id.to_string(),
                    execution_id: self.execution_id.to_string(),
                    iteration,
                    branch_lengths: branches.length_map(),
                });
                self.append_record(node, iteration, input_snapshot, &branches, started_at, None);
                branches
            }
            Err(error) => {
                self.engine.emit(EngineEvent::NodeFailed {
                    node_id: node_id.to_string(),
                    execution_id: self.execution_id.to_string(),
                    error: error.to_string(),
                });
                if !node.continue_on_error {
                    self.append_record(
                        node,
                        iteration,
                        input_snapshot,
                        &BranchOutputs::default(),
                        started_at,
                        Some(error.to_string()),
                    );
                    return Err(EngineError::node(node_id, error.to_string()));
                }

                log::warn!("Node '{node_id}' failed but continues on error: {error}");
                let passthrough = self.passthrough(declared, &input_snapshot)?;
                self.append_record(
                    node,
                    iteration,
                    input_snapshot,
                    &passthrough,
                    started_at,
                    Some(error.to_string()),
                );
                passthrough
            }
        };

        // Push in reverse so the first declared branch's first
        // connection is processed first, and each non-empty branch's
        // subtree drains before its right siblings
        let mut pending: Vec<WorkItem> = Vec::new();
        for (branch, items) in branches.iter() {
            for &conn in self.graph.next(node_id, branch) {
                if items.is_empty() {
                    if !self.graph.is_loop_back(conn) {
                        pending.push(WorkItem::Deactivate { conn });
                    }
                } else {
                    pending.push(WorkItem::Deliver {
                        conn,
                        items: items.clone(),
                    });
                }
            }
        }
        stack.extend(pending.into_iter().rev());

        Ok(())
    }

    /// Failing input passes through on the first declared branch
    fn passthrough(
        &self,
        declared: &[&str],
        inputs: &[(BranchName, ItemSet)],
    ) -> Result<BranchOutputs> {
        let combined: ItemSet = inputs
            .iter()
            .flat_map(|(_, items)| items.iter().cloned())
            .collect();
        if declared.is_empty() {
            return standardize_outputs(declared, NodeOutput::Branches(Vec::new()));
        }
        standardize_outputs(declared, NodeOutput::Branches(vec![combined]))
    }

    fn deliver(&mut self, conn: ConnIndex, items: ItemSet, stack: &mut Vec<WorkItem>) {
        let connection = self.graph.connection(conn);

        // A loop-back delivery re-invokes its target directly; barrier
        // slots only govern the structural graph
        if self.graph.is_loop_back(conn) {
            stack.push(WorkItem::Invoke {
                node_id: connection.target.clone(),
                inputs: vec![(connection.target_input.clone(), items)],
            });
            return;
        }

        // Fresh data overrides an earlier deactivation
        self.slots.insert(conn, SlotState::Delivered(items));
        self.settle(&connection.target.clone(), stack);
    }

    fn deactivate(&mut self, conn: ConnIndex, stack: &mut Vec<WorkItem>) {
        if !self.deactivated.insert(conn) {
            return;
        }
        let target = self.graph.connection(conn).target.clone();
        // Delivered or consumed data is never clobbered
        if matches!(self.slots.get(&conn), None | Some(SlotState::Pending)) {
            self.slots.insert(conn, SlotState::Inactive);
        }
        self.settle(&target, stack);
    }

    /// Re-check a node's barrier after a slot change
    fn settle(&mut self, node_id: &str, stack: &mut Vec<WorkItem>) {
        match self.readiness(node_id) {
            Readiness::Waiting => {}
            Readiness::Ready(inputs) => {
                stack.push(WorkItem::Invoke {
                    node_id: node_id.to_string(),
                    inputs,
                });
            }
            Readiness::Dead => {
                // Every slot went inactive before the node ever ran;
                // the whole subtree under it can never receive data
                log::debug!("Node '{node_id}' deactivated (all inputs inactive)");
                let mut pending: Vec<WorkItem> = Vec::new();
                if let Some(node) = self.workflow.find_node(node_id) {
                    if let Some(contract) = self.engine.registry.get(&node.node_type) {
                        for &branch in contract.outputs() {
                            for &downstream in self.graph.next(node_id, branch) {
                                if !self.graph.is_loop_back(downstream) {
                                    pending.push(WorkItem::Deactivate { conn: downstream });
                                }
                            }
                        }
                    }
                }
                stack.extend(pending.into_iter().rev());
            }
        }
    }

    fn readiness(&mut self, node_id: &str) -> Readiness {
        let slot_indices = self.graph.barrier_slots(node_id);
        if slot_indices.is_empty() {
            return Readiness::Waiting;
        }

        let mut any_delivered = false;
        let mut all_inactive = true;
        for &index in slot_indices {
            match self.slots.get(&index) {
                None | Some(SlotState::Pending) => return Readiness::Waiting,
                Some(SlotState::Delivered(_)) => {
                    any_delivered = true;
                    all_inactive = false;
                }
                Some(SlotState::Consumed) => all_inactive = false,
                Some(SlotState::Inactive) => {}
            }
        }

        if any_delivered {
            // Consume delivered slots in declaration order so fan-in
            // concatenation is deterministic
            let mut inputs: Vec<(BranchName, ItemSet)> = Vec::new();
            for &index in slot_indices {
                if matches!(self.slots.get(&index), Some(SlotState::Delivered(_))) {
                    if let Some(SlotState::Delivered(items)) =
                        self.slots.insert(index, SlotState::Consumed)
                    {
                        let connection = self.graph.connection(index);
                        inputs.push((connection.target_input.clone(), items));
                    }
                }
            }
            return Readiness::Ready(inputs);
        }

        if all_inactive && !self.invoked.contains(node_id) {
            return Readiness::Dead;
        }
        Readiness::Waiting
    }

    fn append_record(
        &self,
        node: &NodeDef,
        iteration: u32,
        inputs: Vec<(BranchName, ItemSet)>,
        outputs: &BranchOutputs,
        started_at: chrono::DateTime<chrono::Utc>,
        error: Option<String>,
    ) {
        self.engine.record_sink.append_node_record(NodeExecutionRecord {
            execution_id: self.execution_id.to_string(),
            node_id: node.id.clone(),
            iteration,
            inputs,
            outputs: outputs
                .iter()
                .map(|(name, items)| (name.to_string(), items.clone()))
                .collect(),
            started_at,
            finished_at: chrono::Utc::now(),
            error,
        });
    }
}
