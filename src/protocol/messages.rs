//! Pipeline message types
//!
//! Defines the task definitions, agent instructions, and agent responses that
//! flow through the orchestrator, plus the context-reference parameter syntax
//! (`{"$from_context": "a.b.0.c"}`) which is the only textual protocol owned
//! by this crate.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

/// Commands understood by the specialist agents.
///
/// Serialized with the upper-snake wire names used in stored task definitions
/// (e.g. `RETRIEVE_DICOM_STUDY`). Dispatch is typed; agents match on the enum
/// rather than on raw strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AgentCommand {
    RetrieveDicomStudy,
    ExtractOhifImages,
    PerformBasicSegmentation,
    PerformDlSegmentation,
    RunTotalsegmentator,
    AnalyzeWithLlm,
    IndexDocument,
    QueryIndex,
    GenerateDiagnosticReport,
}

impl AgentCommand {
    /// Wire name as it appears in serialized definitions and logs.
    pub fn wire_name(&self) -> &'static str {
        match self {
            AgentCommand::RetrieveDicomStudy => "RETRIEVE_DICOM_STUDY",
            AgentCommand::ExtractOhifImages => "EXTRACT_OHIF_IMAGES",
            AgentCommand::PerformBasicSegmentation => "PERFORM_BASIC_SEGMENTATION",
            AgentCommand::PerformDlSegmentation => "PERFORM_DL_SEGMENTATION",
            AgentCommand::RunTotalsegmentator => "RUN_TOTALSEGMENTATOR",
            AgentCommand::AnalyzeWithLlm => "ANALYZE_WITH_LLM",
            AgentCommand::IndexDocument => "INDEX_DOCUMENT",
            AgentCommand::QueryIndex => "QUERY_INDEX",
            AgentCommand::GenerateDiagnosticReport => "GENERATE_DIAGNOSTIC_REPORT",
        }
    }
}

impl fmt::Display for AgentCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

/// Key marking a parameter value as a context reference.
pub const CONTEXT_REF_KEY: &str = "$from_context";

/// A single instruction parameter: either a literal value passed through
/// unchanged, or a reference into the pipeline context resolved before
/// dispatch.
///
/// The wire format is preserved from stored definitions: an object carrying a
/// `$from_context` key deserializes as a reference, everything else as a
/// literal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    ContextRef {
        #[serde(rename = "$from_context")]
        path: String,
    },
    Literal(Value),
}

impl ParamValue {
    /// Literal parameter value.
    pub fn literal(value: impl Into<Value>) -> Self {
        ParamValue::Literal(value.into())
    }

    /// Reference into the pipeline context by dotted/indexed path.
    pub fn from_context(path: impl Into<String>) -> Self {
        ParamValue::ContextRef { path: path.into() }
    }

    pub fn is_reference(&self) -> bool {
        matches!(self, ParamValue::ContextRef { .. })
    }

    /// The unresolved reference marker for `path`, as substituted when
    /// permissive resolution cannot resolve a component.
    pub fn marker(path: &str) -> Value {
        json!({ CONTEXT_REF_KEY: path })
    }

    /// Whether a resolved value is still an unresolved reference marker.
    pub fn is_marker(value: &Value) -> bool {
        value
            .as_object()
            .is_some_and(|map| map.contains_key(CONTEXT_REF_KEY))
    }
}

/// A command/parameters/target-agent triple inside a [`TaskDefinition`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInstruction {
    pub instruction_id: Uuid,
    pub command: AgentCommand,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParamValue>,
    pub target_agent: String,
    /// Reserved for future scheduling; execution order is declaration order.
    #[serde(default)]
    pub priority: u32,
}

impl AgentInstruction {
    pub fn new(command: AgentCommand, target_agent: impl Into<String>) -> Self {
        Self {
            instruction_id: Uuid::new_v4(),
            command,
            parameters: BTreeMap::new(),
            target_agent: target_agent.into(),
            priority: 0,
        }
    }

    /// Builder-style parameter attachment.
    pub fn with_parameter(mut self, key: impl Into<String>, value: ParamValue) -> Self {
        self.parameters.insert(key.into(), value);
        self
    }
}

/// An ordered sequence of agent instructions making up one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub task_id: Uuid,
    pub task_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub required_inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_type: Option<String>,
    #[serde(default)]
    pub instructions: Vec<AgentInstruction>,
    /// Reserved; not consulted by execution.
    #[serde(default)]
    pub dependencies: Vec<String>,
}

impl TaskDefinition {
    pub fn new(task_name: impl Into<String>) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            task_name: task_name.into(),
            description: None,
            required_inputs: Vec::new(),
            output_type: None,
            instructions: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    pub fn with_instruction(mut self, instruction: AgentInstruction) -> Self {
        self.instructions.push(instruction);
        self
    }

    /// Pre-run validation. This is the only failure surfaced to the caller
    /// before the instruction loop starts; everything later is captured in
    /// the returned [`PipelineStatus`](crate::protocol::PipelineStatus).
    pub fn validate(&self) -> Result<(), DefinitionError> {
        if self.task_name.trim().is_empty() {
            return Err(DefinitionError::EmptyTaskName);
        }
        let mut seen = std::collections::HashSet::new();
        for instruction in &self.instructions {
            if !seen.insert(instruction.instruction_id) {
                return Err(DefinitionError::DuplicateInstructionId(
                    instruction.instruction_id,
                ));
            }
            if instruction.target_agent.trim().is_empty() {
                return Err(DefinitionError::EmptyTargetAgent(
                    instruction.instruction_id,
                ));
            }
        }
        Ok(())
    }
}

/// Errors in a task definition detected before execution starts.
#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("task definition has an empty task name")]
    EmptyTaskName,

    #[error("duplicate instruction id {0}")]
    DuplicateInstructionId(Uuid),

    #[error("instruction {0} has an empty target agent")]
    EmptyTargetAgent(Uuid),
}

/// Per-instruction execution outcome reported by an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResponseStatus {
    Success,
    Failed,
}

/// The response from an agent after executing one instruction.
///
/// On success the named outputs are merged into the pipeline context; on
/// failure the error message is preserved for diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentResponse {
    pub response_id: Uuid,
    pub instruction_id: Uuid,
    pub agent_name: String,
    pub status: ResponseStatus,
    #[serde(default)]
    pub outputs: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AgentResponse {
    pub fn success(
        instruction_id: Uuid,
        agent_name: impl Into<String>,
        outputs: Map<String, Value>,
    ) -> Self {
        Self {
            response_id: Uuid::new_v4(),
            instruction_id,
            agent_name: agent_name.into(),
            status: ResponseStatus::Success,
            outputs,
            error_message: None,
            timestamp: Utc::now(),
        }
    }

    pub fn failed(
        instruction_id: Uuid,
        agent_name: impl Into<String>,
        error_kind: &str,
        error_message: impl Into<String>,
    ) -> Self {
        let mut outputs = Map::new();
        outputs.insert("error_kind".to_string(), Value::String(error_kind.into()));
        Self {
            response_id: Uuid::new_v4(),
            instruction_id,
            agent_name: agent_name.into(),
            status: ResponseStatus::Failed,
            outputs,
            error_message: Some(error_message.into()),
            timestamp: Utc::now(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Success
    }
}
