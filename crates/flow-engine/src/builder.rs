//! Fluent builder for constructing workflows programmatically
//!
//! Mirrors how the platform composes workflows in tests and embedders.

use serde_json::Value;

use crate::types::{Connection, NodeDef, Workflow, WorkflowSettings};

/// Builder for workflow definitions
///
/// # Example
///
/// ```
/// use flow_engine::WorkflowBuilder;
/// use serde_json::json;
///
/// let workflow = WorkflowBuilder::new("wf1", "My Workflow")
///     .add_node("start", "manual-trigger")
///     .add_node("loop1", "loop")
///     .with_parameters(json!({"loopOver": "repeat", "repeatTimes": 3}))
///     .connect("start", "main", "loop1", "main")
///     .trigger("start")
///     .build();
/// ```
#[derive(Debug)]
pub struct WorkflowBuilder {
    workflow: Workflow,
}

impl WorkflowBuilder {
    /// Start a new workflow
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            workflow: Workflow::new(id, name),
        }
    }

    /// Add a node with empty parameters
    pub fn add_node(mut self, id: impl Into<String>, node_type: impl Into<String>) -> Self {
        self.workflow.nodes.push(NodeDef::new(id, node_type));
        self
    }

    /// Set parameters on the most recently added node
    pub fn with_parameters(mut self, parameters: Value) -> Self {
        if let Some(node) = self.workflow.nodes.last_mut() {
            node.parameters = parameters;
        }
        self
    }

    /// Disable the most recently added node
    pub fn disabled(mut self) -> Self {
        if let Some(node) = self.workflow.nodes.last_mut() {
            node.disabled = true;
        }
        self
    }

    /// Mark the most recently added node continue-on-error
    pub fn continue_on_error(mut self) -> Self {
        if let Some(node) = self.workflow.nodes.last_mut() {
            node.continue_on_error = true;
        }
        self
    }

    /// Connect a source output branch to a target input branch
    pub fn connect(
        mut self,
        source: impl Into<String>,
        source_output: impl Into<String>,
        target: impl Into<String>,
        target_input: impl Into<String>,
    ) -> Self {
        self.workflow
            .connections
            .push(Connection::new(source, source_output, target, target_input));
        self
    }

    /// Register a node as an execution trigger
    pub fn trigger(mut self, node_id: impl Into<String>) -> Self {
        self.workflow.triggers.push(node_id.into());
        self
    }

    /// Set execution settings
    pub fn settings(mut self, settings: WorkflowSettings) -> Self {
        self.workflow.settings = settings;
        self
    }

    /// Finish and return the workflow
    pub fn build(self) -> Workflow {
        self.workflow
    }
}
