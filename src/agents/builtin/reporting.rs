//! Reporting agent
//!
//! Handles GENERATE_DIAGNOSTIC_REPORT: assembles the final `ReportSummary`
//! from upstream results and writes it to the configured output directory.
//! The written path becomes the pipeline's final-artifact reference.

use super::{optional_typed, require_typed};
use crate::agents::{Agent, AgentError, AgentOutputs, ResolvedParameters};
use crate::context::keys;
use crate::protocol::{
    AgentCommand, AnalysisResult, DiagnosticFinding, DicomPatientInfo, DicomStudyInfo,
    ReportState, ReportSummary, SegmentationResult, Severity,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;
use std::path::PathBuf;
use tracing::{debug, info};
use uuid::Uuid;

pub struct ReportingAgent {
    name: String,
    model: String,
    output_directory: PathBuf,
}

impl ReportingAgent {
    pub fn new(model: String, output_directory: PathBuf) -> Self {
        Self {
            name: "reporting".to_string(),
            model,
            output_directory,
        }
    }

    async fn generate_report(
        &self,
        parameters: &ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        let patient_info: DicomPatientInfo = require_typed(parameters, "patient_info")?;
        let study_info: DicomStudyInfo = require_typed(parameters, "study_info")?;
        let diagnostic_findings: Vec<DiagnosticFinding> =
            require_typed(parameters, "diagnostic_findings")?;
        let analysis: Option<AnalysisResult> = optional_typed(parameters, "analysis_summary")?;
        let segmentation: Option<SegmentationResult> =
            optional_typed(parameters, "image_summary")?;

        let overall_conclusion = match &analysis {
            Some(analysis) => analysis.summary.clone(),
            None => conclusion_from_findings(&diagnostic_findings),
        };
        let recommendations = diagnostic_findings
            .iter()
            .filter_map(|f| f.recommended_action.clone())
            .collect();

        let mut report = ReportSummary {
            report_id: Uuid::new_v4(),
            patient_info,
            study_info,
            overall_conclusion,
            diagnostic_findings,
            recommendations,
            status: ReportState::Preliminary,
            generated_at: Utc::now(),
            reviewer_notes: Some(format!("Generated by LLM agent: {}", self.model)),
        };
        if let Some(segmentation) = &segmentation {
            debug!(
                segmentation_id = %segmentation.segmentation_id,
                regions = segmentation.regions_of_interest.len(),
                "report includes segmentation summary"
            );
        }

        let file_name = format!(
            "report_{}_{}.json",
            report.patient_info.patient_id, report.study_info.study_instance_uid
        );
        let report_path = self.output_directory.join(file_name);

        tokio::fs::create_dir_all(&self.output_directory).await?;
        report.status = ReportState::Final;
        let payload = serde_json::to_vec_pretty(&report)?;
        tokio::fs::write(&report_path, payload).await?;
        info!(path = %report_path.display(), "diagnostic report written");

        let mut outputs = Map::new();
        outputs.insert(
            keys::REPORT_PATH.to_string(),
            serde_json::Value::String(report_path.display().to_string()),
        );
        outputs.insert(
            keys::REPORT_SUMMARY.to_string(),
            serde_json::to_value(&report)?,
        );
        Ok(outputs)
    }
}

#[async_trait]
impl Agent for ReportingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        command: AgentCommand,
        parameters: ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        match command {
            AgentCommand::GenerateDiagnosticReport => self.generate_report(&parameters).await,
            other => Err(AgentError::unsupported_command(&self.name, other)),
        }
    }
}

fn conclusion_from_findings(findings: &[DiagnosticFinding]) -> String {
    let notable = findings
        .iter()
        .filter(|f| f.severity != Severity::Normal)
        .count();
    if notable == 0 {
        "No abnormal findings identified.".to_string()
    } else {
        format!("{notable} notable finding(s) identified; see details.")
    }
}
