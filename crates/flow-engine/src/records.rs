//! Execution records
//!
//! The engine writes two kinds of records to a persistence collaborator:
//! `ExecutionInstance` snapshots at status transitions and one
//! `NodeExecutionRecord` per node invocation attempt. Records are
//! write-only from the engine's perspective; scheduling never reads
//! them back.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::types::{BranchName, ItemSet, NodeId};

/// Lifecycle status of one execution
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Success,
    Failed,
    Cancelled,
}

impl ExecutionStatus {
    /// Terminal statuses are immutable once set
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Success | Self::Failed | Self::Cancelled)
    }
}

/// One run of a workflow
///
/// Created when a run starts and mutated only by the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionInstance {
    /// Unique identifier for this run
    pub execution_id: String,
    /// The workflow being executed
    pub workflow_id: String,
    pub status: ExecutionStatus,
    pub started_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    /// Data the trigger was invoked with
    pub trigger_data: Value,
    /// Error message when status is FAILED
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionInstance {
    /// Create a new instance in the PENDING state
    pub fn new(
        execution_id: impl Into<String>,
        workflow_id: impl Into<String>,
        trigger_data: Value,
    ) -> Self {
        Self {
            execution_id: execution_id.into(),
            workflow_id: workflow_id.into(),
            status: ExecutionStatus::Pending,
            started_at: Utc::now(),
            finished_at: None,
            trigger_data,
            error: None,
        }
    }
}

/// One node invocation attempt
///
/// A re-entrant node produces many of these within one execution.
/// Append-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeExecutionRecord {
    pub execution_id: String,
    pub node_id: NodeId,
    /// Zero-based invocation counter for this node within the execution
    pub iteration: u32,
    /// Snapshot of the input branches this attempt consumed
    pub inputs: Vec<(BranchName, ItemSet)>,
    /// Output branches produced, empty on failure
    pub outputs: Vec<(BranchName, ItemSet)>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Write-only sink for execution records
pub trait RecordSink: Send + Sync {
    /// Insert or update an execution instance snapshot
    fn upsert_instance(&self, instance: &ExecutionInstance);

    /// Append one node invocation attempt
    fn append_node_record(&self, record: NodeExecutionRecord);
}

/// A no-op record sink that discards all records
pub struct NullRecordSink;

impl RecordSink for NullRecordSink {
    fn upsert_instance(&self, _instance: &ExecutionInstance) {}

    fn append_node_record(&self, _record: NodeExecutionRecord) {}
}

/// In-memory record sink for tests and embedders without a database
#[derive(Default)]
pub struct MemoryRecordSink {
    instances: parking_lot::Mutex<Vec<ExecutionInstance>>,
    node_records: parking_lot::Mutex<Vec<NodeExecutionRecord>>,
}

impl MemoryRecordSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The latest snapshot of an execution instance, if any
    pub fn instance(&self, execution_id: &str) -> Option<ExecutionInstance> {
        self.instances
            .lock()
            .iter()
            .find(|i| i.execution_id == execution_id)
            .cloned()
    }

    /// All node records for an execution, in append order
    pub fn node_records(&self, execution_id: &str) -> Vec<NodeExecutionRecord> {
        self.node_records
            .lock()
            .iter()
            .filter(|r| r.execution_id == execution_id)
            .cloned()
            .collect()
    }

    /// All node records for one node within an execution
    pub fn records_for_node(&self, execution_id: &str, node_id: &str) -> Vec<NodeExecutionRecord> {
        self.node_records
            .lock()
            .iter()
            .filter(|r| r.execution_id == execution_id && r.node_id == node_id)
            .cloned()
            .collect()
    }
}

impl RecordSink for MemoryRecordSink {
    fn upsert_instance(&self, instance: &ExecutionInstance) {
        let mut instances = self.instances.lock();
        if let Some(existing) = instances
            .iter_mut()
            .find(|i| i.execution_id == instance.execution_id)
        {
            *existing = instance.clone();
        } else {
            instances.push(instance.clone());
        }
    }

    fn append_node_record(&self, record: NodeExecutionRecord) {
        self.node_records.lock().push(record);
    }
}
