//! Standard pipeline assembly
//!
//! Builds the five-instruction diagnostic task definition: retrieve a study,
//! segment the first series volume, analyze with an LLM, index the analysis
//! summary, and generate the final report. Later instructions reference the
//! outputs of earlier ones through context paths.

use crate::agents::{names, AgentRegistry};
use crate::config::OrchestratorConfig;
use crate::context::ResolutionMode;
use crate::error::PipelineResult;
use crate::orchestrator::Orchestrator;
use crate::protocol::{
    AgentCommand, AgentInstruction, ParamValue, PipelineStatus, TaskDefinition,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;

/// Where the DICOM data for a run comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineInput {
    LocalFile(PathBuf),
    RemoteUrl(String),
}

impl PipelineInput {
    /// Short display name used in task names and index metadata.
    pub fn display_name(&self) -> String {
        match self {
            PipelineInput::LocalFile(path) => path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            PipelineInput::RemoteUrl(url) => url
                .split('?')
                .next()
                .and_then(|base| base.rsplit('/').next())
                .filter(|name| !name.is_empty())
                .unwrap_or(url.as_str())
                .to_string(),
        }
    }
}

/// Assemble the standard full diagnostic task definition for one input.
pub fn diagnostic_task_definition(
    input: &PipelineInput,
    patient_id: Option<&str>,
    config: &OrchestratorConfig,
) -> TaskDefinition {
    let display = input.display_name();
    let effective_patient_id = patient_id.unwrap_or("ANONYMOUS_PATIENT");

    let mut retrieve = AgentInstruction::new(AgentCommand::RetrieveDicomStudy, names::RETRIEVAL)
        .with_parameter("patient_id", ParamValue::literal(effective_patient_id));
    match input {
        PipelineInput::LocalFile(path) => {
            retrieve = retrieve.with_parameter(
                "local_dicom_path",
                ParamValue::literal(path.display().to_string()),
            );
        }
        PipelineInput::RemoteUrl(url) => {
            retrieve = retrieve.with_parameter("remote_dicom_url", ParamValue::literal(url.clone()));
        }
    }

    let segment = AgentInstruction::new(
        AgentCommand::PerformDlSegmentation,
        names::IMAGE_PROCESSING,
    )
    .with_parameter(
        "dicom_volume",
        ParamValue::from_context("retrieval_info.series_volumes.0"),
    );

    let analyze = AgentInstruction::new(AgentCommand::AnalyzeWithLlm, names::LLM_INFERENCE)
        .with_parameter("agent_type", ParamValue::literal(config.llm.model.clone()))
        .with_parameter(
            "prompt_template_name",
            ParamValue::literal("DiagnosticAssessment"),
        )
        .with_parameter(
            "context_data",
            ParamValue::literal(json!({
                "patient_info_summary": { "$from_context": "retrieval_info.patient_info" },
                "image_analysis_summary": { "$from_context": "segmentation_result.regions_of_interest" },
                "clinical_context": "No specific clinical notes available.",
            })),
        );

    let index = AgentInstruction::new(AgentCommand::IndexDocument, names::SEMANTIC_INDEXING)
        .with_parameter(
            "doc_id",
            ParamValue::from_context("llm_analysis_result.analysis_id"),
        )
        .with_parameter(
            "text_content",
            ParamValue::from_context("llm_analysis_result.summary"),
        )
        .with_parameter(
            "metadata",
            ParamValue::literal(json!({ "source_file": display })),
        );

    let report = AgentInstruction::new(AgentCommand::GenerateDiagnosticReport, names::REPORTING)
        .with_parameter(
            "patient_info",
            ParamValue::from_context("retrieval_info.patient_info"),
        )
        .with_parameter(
            "study_info",
            ParamValue::from_context("retrieval_info.studies.0"),
        )
        .with_parameter(
            "diagnostic_findings",
            ParamValue::from_context("llm_analysis_result.extracted_findings"),
        )
        .with_parameter(
            "image_summary",
            ParamValue::from_context("segmentation_result"),
        )
        .with_parameter(
            "analysis_summary",
            ParamValue::from_context("llm_analysis_result"),
        );

    let mut definition = TaskDefinition::new(format!("Full_Diagnostic_Pipeline_{display}"));
    definition.description = Some(format!("Process {display} for diagnostic assessment."));
    definition.required_inputs = vec!["DICOM_FILE".to_string()];
    definition.output_type = Some("DiagnosticReport".to_string());
    definition.instructions = vec![retrieve, segment, analyze, index, report];
    definition
}

/// Assemble and execute the standard diagnostic pipeline for one input
/// against the builtin agents. Convenience entry point for embedding callers;
/// the CLI goes through this as well.
pub async fn run_diagnostic_pipeline(
    config: &OrchestratorConfig,
    input: &PipelineInput,
    patient_id: Option<&str>,
    mode: ResolutionMode,
) -> PipelineResult<PipelineStatus> {
    let registry = Arc::new(AgentRegistry::builtin(config));
    let orchestrator = Orchestrator::with_resolution_mode(registry, mode);
    let definition = diagnostic_task_definition(input, patient_id, config);
    let status = orchestrator.run(&definition).await?;
    Ok(status)
}
