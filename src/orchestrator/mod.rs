//! Pipeline orchestrator
//!
//! Drives a task definition instruction by instruction: look up the target
//! agent, resolve parameters against the accumulated context, dispatch, then
//! merge outputs or halt. The first failure of any kind stops the run; no
//! later instruction executes.
//!
//! Outcome mapping:
//! - unknown agent, escaped panic, strict-mode resolution miss, or malformed
//!   well-known output → `Failed`
//! - an agent-reported domain failure → `CompletedWithErrors`
//! - everything completed → `CompletedSuccess`

use crate::agents::{Agent, AgentRegistry, ResolvedParameters};
use crate::context::{keys, PathResolver, PipelineContext, ResolutionMode};
use crate::error::sanitize_error_message;
use crate::protocol::{
    AgentInstruction, AgentResponse, DefinitionError, ErrorDetail, PipelineState, PipelineStatus,
    TaskDefinition,
};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Orchestrates one or more pipeline runs against a fixed agent registry.
///
/// The registry is read-only and may be shared across concurrent runs; each
/// run owns its own context and status.
pub struct Orchestrator {
    registry: Arc<AgentRegistry>,
    resolver: PathResolver,
}

impl Orchestrator {
    pub fn new(registry: Arc<AgentRegistry>) -> Self {
        Self::with_resolution_mode(registry, ResolutionMode::Permissive)
    }

    pub fn with_resolution_mode(registry: Arc<AgentRegistry>, mode: ResolutionMode) -> Self {
        Self {
            registry,
            resolver: PathResolver::new(mode),
        }
    }

    pub fn registry(&self) -> &Arc<AgentRegistry> {
        &self.registry
    }

    /// Execute a task definition to completion or first failure.
    ///
    /// The `Err` arm covers only pre-loop definition validation; every
    /// per-instruction failure is captured in the returned status.
    pub async fn run(&self, definition: &TaskDefinition) -> Result<PipelineStatus, DefinitionError> {
        definition.validate()?;

        let mut status = PipelineStatus::running(
            definition.task_id,
            format!("Starting pipeline for task: {}", definition.task_name),
        );
        let mut context = PipelineContext::new();

        info!(
            pipeline_id = %definition.task_id,
            task_name = %definition.task_name,
            instructions = definition.instructions.len(),
            "starting pipeline"
        );

        for instruction in &definition.instructions {
            status.begin_task(
                instruction.instruction_id,
                format!("{} by {}", instruction.command, instruction.target_agent),
            );
            info!(
                command = %instruction.command,
                agent = %instruction.target_agent,
                "executing instruction"
            );

            let Some(agent) = self.registry.get(&instruction.target_agent) else {
                let message = format!(
                    "target agent '{}' not found in registry",
                    instruction.target_agent
                );
                error!(agent = %instruction.target_agent, "unknown target agent");
                let detail = ErrorDetail::new("OrchestrationError", &message);
                status.fail_current(&message, detail.clone());
                status.finalize(
                    PipelineState::Failed,
                    format!(
                        "Pipeline failed during '{}': {message}",
                        instruction.command
                    ),
                    Some(detail),
                );
                return Ok(status);
            };

            let resolved = match self.resolver.resolve_all(&instruction.parameters, &context) {
                Ok(resolved) => resolved,
                Err(err) => {
                    // only reachable in strict resolution mode
                    let message = sanitize_error_message(&err.to_string());
                    error!(command = %instruction.command, error = %err, "parameter resolution failed");
                    let detail = ErrorDetail::new("PathResolution", &message);
                    status.fail_current(&message, detail.clone());
                    status.finalize(
                        PipelineState::Failed,
                        format!(
                            "Pipeline failed during '{}': {message}",
                            instruction.command
                        ),
                        Some(detail),
                    );
                    return Ok(status);
                }
            };

            let response = match dispatch(agent, instruction, resolved).await {
                Ok(response) => response,
                Err(panic_message) => {
                    let message = sanitize_error_message(&panic_message);
                    error!(
                        command = %instruction.command,
                        agent = %instruction.target_agent,
                        "agent call aborted"
                    );
                    let detail = ErrorDetail::new("UnexpectedPanic", &message);
                    status.fail_current(&message, detail.clone());
                    status.finalize(
                        PipelineState::Failed,
                        format!(
                            "Pipeline failed critically during '{}': {message}",
                            instruction.command
                        ),
                        Some(detail),
                    );
                    return Ok(status);
                }
            };

            if response.is_success() {
                if let Err(err) = context.merge_outputs(&response.outputs) {
                    let message = sanitize_error_message(&err.to_string());
                    error!(command = %instruction.command, error = %err, "output merge failed");
                    let detail = ErrorDetail::new("OrchestrationError", &message);
                    status.fail_current(&message, detail.clone());
                    status.finalize(
                        PipelineState::Failed,
                        format!(
                            "Pipeline failed during '{}': {message}",
                            instruction.command
                        ),
                        Some(detail),
                    );
                    return Ok(status);
                }
                if let Some(path) = response.outputs.get(keys::REPORT_PATH).and_then(|v| v.as_str())
                {
                    status.report_path = Some(PathBuf::from(path));
                }
                status.complete_current("instruction completed successfully");
                info!(command = %instruction.command, "instruction completed");
            } else {
                let message = sanitize_error_message(
                    response
                        .error_message
                        .as_deref()
                        .unwrap_or("agent reported failure without a message"),
                );
                warn!(
                    command = %instruction.command,
                    agent = %response.agent_name,
                    error = %message,
                    "instruction failed"
                );
                let detail = ErrorDetail::new("AgentReportedFailure", &message)
                    .with_data(serde_json::to_value(&response).unwrap_or_default());
                status.fail_current(&message, detail.clone());
                status.finalize(
                    PipelineState::CompletedWithErrors,
                    format!(
                        "Pipeline completed with errors. '{}' failed: {message}",
                        instruction.command
                    ),
                    Some(detail),
                );
                return Ok(status);
            }
        }

        status.finalize(
            PipelineState::CompletedSuccess,
            "All pipeline instructions completed successfully",
            None,
        );
        info!(
            pipeline_id = %definition.task_id,
            context_keys = context.len(),
            "pipeline completed successfully"
        );
        Ok(status)
    }
}

/// Invoke an agent on its own task so an escaping panic is contained and
/// reported instead of unwinding through the run loop.
async fn dispatch(
    agent: Arc<dyn Agent>,
    instruction: &AgentInstruction,
    parameters: ResolvedParameters,
) -> Result<AgentResponse, String> {
    let agent_name = agent.name().to_string();
    let command = instruction.command;
    let instruction_id = instruction.instruction_id;

    let handle = tokio::spawn(async move { agent.execute(command, parameters).await });
    match handle.await {
        Ok(Ok(outputs)) => Ok(AgentResponse::success(instruction_id, agent_name, outputs)),
        Ok(Err(err)) => Ok(AgentResponse::failed(
            instruction_id,
            agent_name,
            err.kind(),
            err.to_string(),
        )),
        Err(join_error) => Err(format!(
            "agent '{agent_name}' aborted while executing {command}: {join_error}"
        )),
    }
}
