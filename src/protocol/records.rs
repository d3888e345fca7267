//! Canonical structured records for the well-known context keys
//!
//! Values merged into the pipeline context under `retrieval_info`,
//! `segmentation_result`, `llm_analysis_result`, and `report_summary` are
//! reconstructed into these types before insertion, so later instructions can
//! address their fields by name through context references.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Outcome classification shared by retrieval and analysis records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordStatus {
    Success,
    Failure,
    PartialSuccess,
}

/// A data source medical data was retrieved from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataSource {
    pub source_id: String,
    pub source_type: SourceType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceType {
    #[serde(rename = "DICOM_PACS")]
    DicomPacs,
    #[serde(rename = "OHIF_Viewer")]
    OhifViewer,
    #[serde(rename = "Local_Filesystem")]
    LocalFilesystem,
    #[serde(rename = "Cloud_Storage")]
    CloudStorage,
}

/// Patient identity from DICOM metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DicomPatientInfo {
    pub patient_id: String,
    pub patient_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_sex: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_birth_date: Option<NaiveDate>,
    /// DICOM age string, e.g. `060Y`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient_age: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DicomStudyInfo {
    pub study_instance_uid: String,
    pub study_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub study_date: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub accession_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DicomSeriesInfo {
    pub series_instance_uid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_number: Option<i32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub series_description: Option<String>,
    pub modality: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_part_examined: Option<String>,
}

/// A 3D image volume assembled from one DICOM series.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DicomVolume {
    pub series_instance_uid: String,
    pub dicom_files: Vec<String>,
    pub volume_path: String,
    pub original_modality: String,
    pub patient_info: DicomPatientInfo,
    pub study_info: DicomStudyInfo,
    pub series_info: DicomSeriesInfo,
    pub volume_shape: Vec<u32>,
    pub voxel_spacing: Vec<f64>,
}

/// Summary of data retrieved for one pipeline run.
///
/// Stored in the context under `retrieval_info`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievedDataInfo {
    pub retrieval_id: Uuid,
    pub data_source: DataSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_query: Option<String>,
    pub retrieved_file_paths: Vec<String>,
    pub total_files_retrieved: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_size_bytes: Option<u64>,
    pub retrieval_start_time: DateTime<Utc>,
    pub retrieval_end_time: DateTime<Utc>,
    pub status: RecordStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub patient_info: DicomPatientInfo,
    pub studies: Vec<DicomStudyInfo>,
    pub series_volumes: Vec<DicomVolume>,
}

/// A labelled region of interest produced by segmentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionOfInterest {
    pub roi_id: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub volume_mm3: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_count: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation_model_used: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    pub original_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_path: Option<String>,
    /// e.g. `nifti`, `png`, `dcm`.
    pub image_format: String,
    pub dimensions: Vec<u32>,
}

/// Result of segmenting one image volume.
///
/// Stored in the context under `segmentation_result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentationResult {
    pub segmentation_id: Uuid,
    pub source_volume: DicomVolume,
    pub segmented_at: DateTime<Utc>,
    pub regions_of_interest: Vec<RegionOfInterest>,
    pub segmentation_method: String,
    pub processed_image_meta: ImageMetadata,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmChoice {
    pub text: String,
    pub index: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finish_reason: Option<String>,
}

/// Structured output received from an LLM call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmOutput {
    pub response_id: String,
    pub model_name_used: String,
    pub timestamp: DateTime<Utc>,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub total_tokens: u32,
    pub choices: Vec<LlmChoice>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Normal,
}

/// A diagnostic finding extracted from LLM analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagnosticFinding {
    pub finding_id: Uuid,
    pub category: String,
    pub description: String,
    pub severity: Severity,
    pub confidence_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommended_action: Option<String>,
}

/// Result of an LLM-based diagnostic analysis.
///
/// Stored in the context under `llm_analysis_result`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: Uuid,
    pub llm_output: LlmOutput,
    pub extracted_findings: Vec<DiagnosticFinding>,
    pub summary: String,
    pub status: RecordStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReportState {
    Preliminary,
    Final,
    Error,
}

/// The final diagnostic report.
///
/// Stored in the context under `report_summary`; the serialized form is also
/// written to disk as the pipeline's final artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub report_id: Uuid,
    pub patient_info: DicomPatientInfo,
    pub study_info: DicomStudyInfo,
    pub overall_conclusion: String,
    pub diagnostic_findings: Vec<DiagnosticFinding>,
    pub recommendations: Vec<String>,
    pub status: ReportState,
    pub generated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer_notes: Option<String>,
}
