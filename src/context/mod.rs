//! Accumulating key/value context for one pipeline run
//!
//! The context is owned by exactly one run and mutated only by the
//! orchestrator after a successful agent response. Values under the
//! well-known keys are reconstructed into their canonical record types on
//! insertion, so later instructions can address fields by name; everything
//! else is stored as raw JSON.

pub mod path;

use crate::protocol::{AnalysisResult, ReportSummary, RetrievedDataInfo, SegmentationResult};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

pub use path::{ContextPath, PathError, PathResolver, ResolutionMode};

/// Well-known context keys with canonical record types.
pub mod keys {
    pub const RETRIEVAL_INFO: &str = "retrieval_info";
    pub const SEGMENTATION_RESULT: &str = "segmentation_result";
    pub const LLM_ANALYSIS_RESULT: &str = "llm_analysis_result";
    pub const REPORT_SUMMARY: &str = "report_summary";
    /// Output key whose value becomes the pipeline's final-artifact reference.
    pub const REPORT_PATH: &str = "report_path";
}

/// A value held in the pipeline context: one of the canonical records for the
/// well-known keys, or raw JSON for everything else.
#[derive(Debug, Clone, PartialEq)]
pub enum ContextValue {
    Retrieval(RetrievedDataInfo),
    Segmentation(SegmentationResult),
    Analysis(AnalysisResult),
    Report(ReportSummary),
    Data(Value),
}

impl ContextValue {
    /// Serialized view of the value for path traversal. Record fields become
    /// object members, giving named-field and generic-map access the same
    /// semantics.
    pub fn to_value(&self) -> Result<Value, ContextError> {
        let value = match self {
            ContextValue::Retrieval(record) => serde_json::to_value(record)?,
            ContextValue::Segmentation(record) => serde_json::to_value(record)?,
            ContextValue::Analysis(record) => serde_json::to_value(record)?,
            ContextValue::Report(record) => serde_json::to_value(record)?,
            ContextValue::Data(value) => value.clone(),
        };
        Ok(value)
    }
}

/// Errors raised while mutating or reading the context.
#[derive(Debug, Error)]
pub enum ContextError {
    #[error("output under '{key}' does not match its canonical record: {source}")]
    Reconstruction {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("context value could not be serialized for traversal: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// String-keyed store threading data between the instructions of one run.
///
/// Grows monotonically (append or overwrite, never remove) and is never
/// shared across runs or threads.
#[derive(Debug, Clone, Default)]
pub struct PipelineContext {
    values: HashMap<String, ContextValue>,
}

impl PipelineContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: ContextValue) {
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<&ContextValue> {
        self.values.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Merge the named outputs of a successful agent response, reconstructing
    /// well-known keys into their canonical records.
    ///
    /// A value that fails reconstruction leaves the context untouched from
    /// that key onward and surfaces as an orchestration-level failure.
    pub fn merge_outputs(&mut self, outputs: &Map<String, Value>) -> Result<(), ContextError> {
        for (key, value) in outputs {
            let entry = match key.as_str() {
                keys::RETRIEVAL_INFO => {
                    ContextValue::Retrieval(Self::reconstruct(key, value)?)
                }
                keys::SEGMENTATION_RESULT => {
                    ContextValue::Segmentation(Self::reconstruct(key, value)?)
                }
                keys::LLM_ANALYSIS_RESULT => {
                    ContextValue::Analysis(Self::reconstruct(key, value)?)
                }
                keys::REPORT_SUMMARY => ContextValue::Report(Self::reconstruct(key, value)?),
                _ => ContextValue::Data(value.clone()),
            };
            self.values.insert(key.clone(), entry);
        }
        Ok(())
    }

    fn reconstruct<T: serde::de::DeserializeOwned>(
        key: &str,
        value: &Value,
    ) -> Result<T, ContextError> {
        serde_json::from_value(value.clone()).map_err(|source| ContextError::Reconstruction {
            key: key.to_string(),
            source,
        })
    }
}
