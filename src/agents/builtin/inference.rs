//! LLM inference agent
//!
//! Handles ANALYZE_WITH_LLM. Stands in for a real model endpoint: it
//! validates the prompt/context parameters and returns a canned
//! `AnalysisResult` attributed to the configured model.

use super::{optional_str, require_str};
use crate::agents::{Agent, AgentError, AgentOutputs, ResolvedParameters};
use crate::config::LlmSection;
use crate::context::keys;
use crate::protocol::{
    AgentCommand, AnalysisResult, DiagnosticFinding, LlmChoice, LlmOutput, RecordStatus, Severity,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;
use tracing::debug;
use uuid::Uuid;

pub struct InferenceAgent {
    name: String,
    llm: LlmSection,
}

impl InferenceAgent {
    pub fn new(llm: LlmSection) -> Self {
        Self {
            name: "llm_inference".to_string(),
            llm,
        }
    }

    fn analyze(&self, parameters: &ResolvedParameters) -> Result<AgentOutputs, AgentError> {
        let template = require_str(parameters, "prompt_template_name")?;
        let context_data = parameters
            .get("context_data")
            .ok_or_else(|| AgentError::missing_parameter("context_data"))?;
        let model = optional_str(parameters, "agent_type")?
            .unwrap_or_else(|| self.llm.model.clone());

        let rendered_context = serde_json::to_string(context_data)?;
        debug!(
            template = %template,
            model = %model,
            context_bytes = rendered_context.len(),
            "running LLM analysis"
        );

        let summary = format!(
            "Assessment per template '{template}': focal signal abnormality with well-defined \
             margins; no acute osseous injury identified."
        );
        let input_tokens = (rendered_context.len() / 4) as u32 + 64;
        let output_tokens = (summary.len() / 4) as u32;

        let result = AnalysisResult {
            analysis_id: Uuid::new_v4(),
            llm_output: LlmOutput {
                response_id: format!("resp-{}", Uuid::new_v4()),
                model_name_used: model,
                timestamp: Utc::now(),
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
                choices: vec![LlmChoice {
                    text: summary.clone(),
                    index: 0,
                    finish_reason: Some("stop".to_string()),
                }],
            },
            extracted_findings: vec![
                DiagnosticFinding {
                    finding_id: Uuid::new_v4(),
                    category: "Lesion".to_string(),
                    description: "Focal T2-hyperintense lesion in the distal femur".to_string(),
                    severity: Severity::Medium,
                    confidence_score: 0.84,
                    recommended_action: Some("Correlate with contrast-enhanced series".to_string()),
                },
                DiagnosticFinding {
                    finding_id: Uuid::new_v4(),
                    category: "Alignment".to_string(),
                    description: "Normal joint alignment, no effusion".to_string(),
                    severity: Severity::Normal,
                    confidence_score: 0.95,
                    recommended_action: None,
                },
            ],
            summary,
            status: RecordStatus::Success,
        };

        let mut outputs = Map::new();
        outputs.insert(
            keys::LLM_ANALYSIS_RESULT.to_string(),
            serde_json::to_value(&result)?,
        );
        Ok(outputs)
    }
}

#[async_trait]
impl Agent for InferenceAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        command: AgentCommand,
        parameters: ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        match command {
            AgentCommand::AnalyzeWithLlm => self.analyze(&parameters),
            other => Err(AgentError::unsupported_command(&self.name, other)),
        }
    }
}
