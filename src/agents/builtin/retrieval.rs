//! Retrieval agent
//!
//! Handles RETRIEVE_DICOM_STUDY and EXTRACT_OHIF_IMAGES. Produces a canned
//! `RetrievedDataInfo` carrying one reconstructed series volume, shaped like
//! the output of a real PACS sniffer or viewer extractor.

use super::{optional_str, require_str};
use crate::agents::{Agent, AgentError, AgentOutputs, ResolvedParameters};
use crate::context::keys;
use crate::protocol::{
    AgentCommand, DataSource, DicomPatientInfo, DicomSeriesInfo, DicomStudyInfo, DicomVolume,
    RecordStatus, RetrievedDataInfo, SourceType,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;
use tracing::debug;
use uuid::Uuid;

pub struct RetrievalAgent {
    name: String,
}

impl RetrievalAgent {
    pub fn new() -> Self {
        Self {
            name: "retrieval".to_string(),
        }
    }

    fn retrieve_dicom_study(
        &self,
        parameters: &ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        let patient_id = require_str(parameters, "patient_id")?;
        let study_uid = optional_str(parameters, "study_uid")?
            .unwrap_or_else(|| format!("2.25.{}", Uuid::new_v4().as_u128()));
        let local_path = optional_str(parameters, "local_dicom_path")?;
        let remote_url = optional_str(parameters, "remote_dicom_url")?;

        let (data_source, base_path) = match (&local_path, &remote_url) {
            (Some(path), _) => (
                DataSource {
                    source_id: "local-filesystem".to_string(),
                    source_type: SourceType::LocalFilesystem,
                    endpoint_url: None,
                },
                path.clone(),
            ),
            (None, Some(url)) => (
                DataSource {
                    source_id: "remote-pacs".to_string(),
                    source_type: SourceType::DicomPacs,
                    endpoint_url: Some(url.clone()),
                },
                url.clone(),
            ),
            (None, None) => {
                return Err(AgentError::Retrieval(
                    "neither 'local_dicom_path' nor 'remote_dicom_url' was provided".to_string(),
                ));
            }
        };

        debug!(
            patient_id = %patient_id,
            study_uid = %study_uid,
            source = ?data_source.source_type,
            "retrieving study"
        );

        let info = canned_retrieval(patient_id, study_uid, data_source, &base_path);
        let mut outputs = Map::new();
        outputs.insert(
            keys::RETRIEVAL_INFO.to_string(),
            serde_json::to_value(&info)?,
        );
        Ok(outputs)
    }

    fn extract_ohif_images(
        &self,
        parameters: &ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        let ohif_url = require_str(parameters, "ohif_url")?;
        let study_id = require_str(parameters, "study_id")?;
        let _series_id = optional_str(parameters, "series_id")?;

        let data_source = DataSource {
            source_id: "ohif-viewer".to_string(),
            source_type: SourceType::OhifViewer,
            endpoint_url: Some(ohif_url.clone()),
        };
        let info = canned_retrieval(
            "ANONYMOUS_PATIENT".to_string(),
            format!("2.25.{}", Uuid::new_v4().as_u128()),
            data_source,
            &format!("{ohif_url}/studies/{study_id}"),
        );

        let mut outputs = Map::new();
        outputs.insert(
            keys::RETRIEVAL_INFO.to_string(),
            serde_json::to_value(&info)?,
        );
        Ok(outputs)
    }
}

impl Default for RetrievalAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for RetrievalAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        command: AgentCommand,
        parameters: ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        match command {
            AgentCommand::RetrieveDicomStudy => self.retrieve_dicom_study(&parameters),
            AgentCommand::ExtractOhifImages => self.extract_ohif_images(&parameters),
            other => Err(AgentError::unsupported_command(&self.name, other)),
        }
    }
}

fn canned_retrieval(
    patient_id: String,
    study_uid: String,
    data_source: DataSource,
    base_path: &str,
) -> RetrievedDataInfo {
    let now = Utc::now();
    let patient_info = DicomPatientInfo {
        patient_id: patient_id.clone(),
        patient_name: "ANON^PATIENT".to_string(),
        patient_sex: None,
        patient_birth_date: None,
        patient_age: None,
    };
    let study_info = DicomStudyInfo {
        study_instance_uid: study_uid.clone(),
        study_id: format!("STUDY-{}", &study_uid[study_uid.len().saturating_sub(4)..]),
        study_description: Some("Simulated MSK study".to_string()),
        study_date: Some(now.date_naive()),
        accession_number: None,
    };
    let series_info = DicomSeriesInfo {
        series_instance_uid: format!("{study_uid}.1"),
        series_number: Some(1),
        series_description: Some("T1 axial".to_string()),
        modality: "MR".to_string(),
        body_part_examined: Some("KNEE".to_string()),
    };
    let dicom_files: Vec<String> = (0..3)
        .map(|i| format!("{base_path}/slice_{i:03}.dcm"))
        .collect();

    let volume = DicomVolume {
        series_instance_uid: series_info.series_instance_uid.clone(),
        dicom_files: dicom_files.clone(),
        volume_path: format!("{base_path}/volume.nii.gz"),
        original_modality: series_info.modality.clone(),
        patient_info: patient_info.clone(),
        study_info: study_info.clone(),
        series_info,
        volume_shape: vec![64, 256, 256],
        voxel_spacing: vec![1.0, 0.5, 0.5],
    };

    RetrievedDataInfo {
        retrieval_id: Uuid::new_v4(),
        data_source,
        original_query: Some(patient_id),
        total_files_retrieved: dicom_files.len(),
        retrieved_file_paths: dicom_files,
        total_size_bytes: Some(3 * 512 * 512 * 2),
        retrieval_start_time: now,
        retrieval_end_time: now,
        status: RecordStatus::Success,
        message: None,
        patient_info,
        studies: vec![study_info],
        series_volumes: vec![volume],
    }
}
