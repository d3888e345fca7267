//! Image processing agent
//!
//! Segmentation stubs: threshold-based, deep-learning, and whole-body
//! multi-structure. Each validates the supplied `dicom_volume` by
//! reconstruction and returns a canned `SegmentationResult` over it.

use super::{optional_typed, require_typed};
use crate::agents::{Agent, AgentError, AgentOutputs, ResolvedParameters};
use crate::context::keys;
use crate::protocol::{
    AgentCommand, DicomVolume, ImageMetadata, RegionOfInterest, SegmentationResult,
};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::Map;
use tracing::debug;
use uuid::Uuid;

const DL_MODEL: &str = "unet3d-msk-v2";

pub struct ImagingAgent {
    name: String,
}

impl ImagingAgent {
    pub fn new() -> Self {
        Self {
            name: "image_processing".to_string(),
        }
    }

    fn basic_segmentation(
        &self,
        parameters: &ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        let volume: DicomVolume = require_typed(parameters, "dicom_volume")?;
        let threshold: Option<f64> = optional_typed(parameters, "threshold")?;
        let threshold = threshold.unwrap_or(0.5);
        debug!(series = %volume.series_instance_uid, threshold, "running threshold segmentation");

        let rois = vec![RegionOfInterest {
            roi_id: format!("roi-{}", Uuid::new_v4()),
            label: "bone".to_string(),
            volume_mm3: Some(182_000.0),
            pixel_count: Some(910_000),
            confidence_score: None,
            segmentation_model_used: None,
        }];
        segmentation_outputs(volume, rois, format!("threshold-{threshold}"))
    }

    fn dl_segmentation(&self, parameters: &ResolvedParameters) -> Result<AgentOutputs, AgentError> {
        let volume: DicomVolume = require_typed(parameters, "dicom_volume")?;
        debug!(series = %volume.series_instance_uid, model = DL_MODEL, "running DL segmentation");

        let rois = vec![
            RegionOfInterest {
                roi_id: format!("roi-{}", Uuid::new_v4()),
                label: "femur".to_string(),
                volume_mm3: Some(210_500.0),
                pixel_count: Some(1_052_500),
                confidence_score: Some(0.97),
                segmentation_model_used: Some(DL_MODEL.to_string()),
            },
            RegionOfInterest {
                roi_id: format!("roi-{}", Uuid::new_v4()),
                label: "lesion".to_string(),
                volume_mm3: Some(1_240.0),
                pixel_count: Some(6_200),
                confidence_score: Some(0.81),
                segmentation_model_used: Some(DL_MODEL.to_string()),
            },
        ];
        segmentation_outputs(volume, rois, DL_MODEL.to_string())
    }

    fn total_segmentator(
        &self,
        parameters: &ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        let volume: DicomVolume = require_typed(parameters, "dicom_volume")?;
        let tasks: Option<Vec<String>> = optional_typed(parameters, "tasks")?;
        let labels = tasks.unwrap_or_else(|| {
            ["femur", "tibia", "patella", "fibula"]
                .iter()
                .map(|s| s.to_string())
                .collect()
        });
        debug!(series = %volume.series_instance_uid, structures = labels.len(), "running whole-body segmentation");

        let rois = labels
            .into_iter()
            .map(|label| RegionOfInterest {
                roi_id: format!("roi-{}", Uuid::new_v4()),
                label,
                volume_mm3: Some(50_000.0),
                pixel_count: Some(250_000),
                confidence_score: Some(0.9),
                segmentation_model_used: Some("totalsegmentator-v2".to_string()),
            })
            .collect();
        segmentation_outputs(volume, rois, "totalsegmentator-v2".to_string())
    }
}

impl Default for ImagingAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for ImagingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        command: AgentCommand,
        parameters: ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        match command {
            AgentCommand::PerformBasicSegmentation => self.basic_segmentation(&parameters),
            AgentCommand::PerformDlSegmentation => self.dl_segmentation(&parameters),
            AgentCommand::RunTotalsegmentator => self.total_segmentator(&parameters),
            other => Err(AgentError::unsupported_command(&self.name, other)),
        }
    }
}

fn segmentation_outputs(
    volume: DicomVolume,
    regions_of_interest: Vec<RegionOfInterest>,
    segmentation_method: String,
) -> Result<AgentOutputs, AgentError> {
    let processed_image_meta = ImageMetadata {
        original_path: volume.volume_path.clone(),
        processed_path: Some(format!("{}.seg.nii.gz", volume.volume_path)),
        image_format: "nifti".to_string(),
        dimensions: volume.volume_shape.clone(),
    };
    let result = SegmentationResult {
        segmentation_id: Uuid::new_v4(),
        source_volume: volume,
        segmented_at: Utc::now(),
        regions_of_interest,
        segmentation_method,
        processed_image_meta,
    };

    let mut outputs = Map::new();
    outputs.insert(
        keys::SEGMENTATION_RESULT.to_string(),
        serde_json::to_value(&result)?,
    );
    Ok(outputs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{DicomPatientInfo, DicomSeriesInfo, DicomStudyInfo, ParamValue};
    use std::collections::BTreeMap;

    fn test_volume() -> DicomVolume {
        DicomVolume {
            series_instance_uid: "1.2.3.1".to_string(),
            dicom_files: vec!["/data/slice_000.dcm".to_string()],
            volume_path: "/data/volume.nii.gz".to_string(),
            original_modality: "MR".to_string(),
            patient_info: DicomPatientInfo {
                patient_id: "PAT-001".to_string(),
                patient_name: "ANON^PATIENT".to_string(),
                patient_sex: None,
                patient_birth_date: None,
                patient_age: None,
            },
            study_info: DicomStudyInfo {
                study_instance_uid: "1.2.3".to_string(),
                study_id: "STUDY-1".to_string(),
                study_description: None,
                study_date: None,
                accession_number: None,
            },
            series_info: DicomSeriesInfo {
                series_instance_uid: "1.2.3.1".to_string(),
                series_number: Some(1),
                series_description: None,
                modality: "MR".to_string(),
                body_part_examined: None,
            },
            volume_shape: vec![64, 256, 256],
            voxel_spacing: vec![1.0, 0.5, 0.5],
        }
    }

    #[tokio::test]
    async fn dl_segmentation_returns_regions_over_the_input_volume() {
        let agent = ImagingAgent::new();
        let mut parameters: ResolvedParameters = BTreeMap::new();
        parameters.insert(
            "dicom_volume".to_string(),
            serde_json::to_value(test_volume()).unwrap(),
        );

        let outputs = agent
            .execute(AgentCommand::PerformDlSegmentation, parameters)
            .await
            .unwrap();

        let result: SegmentationResult =
            serde_json::from_value(outputs[keys::SEGMENTATION_RESULT].clone()).unwrap();
        assert_eq!(result.source_volume.series_instance_uid, "1.2.3.1");
        assert_eq!(result.segmentation_method, DL_MODEL);
        assert!(!result.regions_of_interest.is_empty());
    }

    #[tokio::test]
    async fn unresolved_marker_volume_is_a_reported_failure() {
        let agent = ImagingAgent::new();
        let mut parameters: ResolvedParameters = BTreeMap::new();
        parameters.insert(
            "dicom_volume".to_string(),
            ParamValue::marker("retrieval_info.series_volumes.0"),
        );

        let err = agent
            .execute(AgentCommand::PerformDlSegmentation, parameters)
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::InvalidParameter { .. }));
    }

    #[tokio::test]
    async fn missing_volume_is_reported() {
        let agent = ImagingAgent::new();
        let err = agent
            .execute(AgentCommand::PerformBasicSegmentation, BTreeMap::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::MissingParameter(_)));
    }
}
