//! Agent contract and registry
//!
//! An agent is a named specialist handler executing one instruction's command
//! against an already-resolved parameter mapping. Agents convert their own
//! domain failures into [`AgentError`] values; the orchestrator wraps the
//! outcome into an `AgentResponse`. A panic escaping an agent call is treated
//! as a critical orchestration failure, never as a reported domain failure.

pub mod builtin;

use crate::config::OrchestratorConfig;
use crate::protocol::AgentCommand;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::info;

/// Parameter mapping after context-reference resolution.
pub type ResolvedParameters = BTreeMap<String, Value>;

/// Named-output mapping produced by a successful command.
pub type AgentOutputs = Map<String, Value>;

/// Domain failures reported by agents.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("missing required parameter '{0}'")]
    MissingParameter(String),

    #[error("parameter '{name}' is invalid: {reason}")]
    InvalidParameter { name: String, reason: String },

    #[error("command {command} is not supported by agent '{agent}'")]
    UnsupportedCommand {
        agent: String,
        command: AgentCommand,
    },

    #[error("retrieval failed: {0}")]
    Retrieval(String),

    #[error("inference failed: {0}")]
    Inference(String),

    #[error("indexing failed: {0}")]
    Indexing(String),

    #[error("report generation failed: {0}")]
    Reporting(String),

    #[error("i/o failure: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("{0}")]
    Other(String),
}

impl AgentError {
    pub fn missing_parameter(name: impl Into<String>) -> Self {
        Self::MissingParameter(name.into())
    }

    pub fn invalid_parameter(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported_command(agent: impl Into<String>, command: AgentCommand) -> Self {
        Self::UnsupportedCommand {
            agent: agent.into(),
            command,
        }
    }

    /// Short classification tag recorded in failed responses.
    pub fn kind(&self) -> &'static str {
        match self {
            AgentError::MissingParameter(_) => "MissingParameter",
            AgentError::InvalidParameter { .. } => "InvalidParameter",
            AgentError::UnsupportedCommand { .. } => "UnsupportedCommand",
            AgentError::Retrieval(_) => "Retrieval",
            AgentError::Inference(_) => "Inference",
            AgentError::Indexing(_) => "Indexing",
            AgentError::Reporting(_) => "Reporting",
            AgentError::Io(_) => "Io",
            AgentError::Serialization(_) => "Serialization",
            AgentError::Other(_) => "Other",
        }
    }
}

/// A named external capability handler.
///
/// Calls may be long-running; execution is awaited by the orchestrator.
/// Implementations must not panic: a panic is escalated to a pipeline-level
/// failure rather than a per-instruction one.
#[async_trait]
pub trait Agent: Send + Sync {
    fn name(&self) -> &str;

    async fn execute(
        &self,
        command: AgentCommand,
        parameters: ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError>;
}

/// Standard agent names used by stored task definitions.
pub mod names {
    pub const RETRIEVAL: &str = "retrieval";
    pub const IMAGE_PROCESSING: &str = "image_processing";
    pub const LLM_INFERENCE: &str = "llm_inference";
    pub const SEMANTIC_INDEXING: &str = "semantic_indexing";
    pub const REPORTING: &str = "reporting";
}

/// Read-only name → agent map, constructed once and shareable across
/// concurrent runs.
#[derive(Default)]
pub struct AgentRegistry {
    agents: std::collections::HashMap<String, Arc<dyn Agent>>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the five standard specialist agents.
    pub fn builtin(config: &OrchestratorConfig) -> Self {
        let mut registry = Self::new();
        registry.register(names::RETRIEVAL, Arc::new(builtin::RetrievalAgent::new()));
        registry.register(
            names::IMAGE_PROCESSING,
            Arc::new(builtin::ImagingAgent::new()),
        );
        registry.register(
            names::LLM_INFERENCE,
            Arc::new(builtin::InferenceAgent::new(config.llm.clone())),
        );
        registry.register(
            names::SEMANTIC_INDEXING,
            Arc::new(builtin::IndexingAgent::new()),
        );
        registry.register(
            names::REPORTING,
            Arc::new(builtin::ReportingAgent::new(
                config.llm.model.clone(),
                config.storage.output_directory.clone(),
            )),
        );
        info!(
            agents = ?registry.agent_names(),
            "agent registry initialized"
        );
        registry
    }

    /// Register an agent under a name. Construction-time only; the registry
    /// is immutable once behind an `Arc`.
    pub fn register(&mut self, name: impl Into<String>, agent: Arc<dyn Agent>) {
        self.agents.insert(name.into(), agent);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Agent>> {
        self.agents.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.agents.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }

    /// Registered names, sorted for stable logging.
    pub fn agent_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.agents.keys().cloned().collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for AgentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentRegistry")
            .field("agents", &self.agent_names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OrchestratorConfig;

    #[test]
    fn builtin_registry_contains_the_five_standard_agents() {
        let registry = AgentRegistry::builtin(&OrchestratorConfig::default());
        assert_eq!(registry.len(), 5);
        for name in [
            names::RETRIEVAL,
            names::IMAGE_PROCESSING,
            names::LLM_INFERENCE,
            names::SEMANTIC_INDEXING,
            names::REPORTING,
        ] {
            assert!(registry.contains(name), "missing agent {name}");
        }
        assert!(registry.get("nonexistent").is_none());
    }

    #[test]
    fn agent_error_kinds_are_stable() {
        assert_eq!(
            AgentError::missing_parameter("patient_id").kind(),
            "MissingParameter"
        );
        assert_eq!(
            AgentError::unsupported_command("retrieval", AgentCommand::IndexDocument).kind(),
            "UnsupportedCommand"
        );
    }
}
