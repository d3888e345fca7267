//! Orchestrator configuration
//!
//! Loaded from a TOML file and passed by construction to the registry and
//! agents; there is no implicit global configuration state.

use crate::context::ResolutionMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Top-level configuration for a pipeline service or CLI invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub pipeline: PipelineSection,
    #[serde(default)]
    pub resolver: ResolverSection,
    #[serde(default)]
    pub llm: LlmSection,
    #[serde(default)]
    pub storage: StorageSection,
}

/// Pipeline identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineSection {
    /// Pipeline name (must match `[a-zA-Z0-9._-]+`).
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Context-reference resolution behavior.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResolverSection {
    #[serde(default)]
    pub mode: ResolutionMode,
}

/// LLM settings consumed by the inference and reporting agents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmSection {
    /// Model identifier recorded in analysis results and reports.
    pub model: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl Default for LlmSection {
    fn default() -> Self {
        Self {
            model: "diagnostic-default".to_string(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// Filesystem locations for generated artifacts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StorageSection {
    /// Directory the reporting agent writes report JSON files into.
    pub output_directory: PathBuf,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            output_directory: PathBuf::from("output"),
        }
    }
}

/// Configuration loading errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("failed to parse TOML: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("invalid pipeline name format: {0}")]
    InvalidPipelineName(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl OrchestratorConfig {
    /// Load configuration from a TOML file.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: OrchestratorConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_pipeline_name(&self.pipeline.name)?;
        if self.storage.output_directory.as_os_str().is_empty() {
            return Err(ConfigError::InvalidConfig(
                "storage.output_directory must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineSection {
                name: "diagnostic-pipeline".to_string(),
                description: None,
            },
            resolver: ResolverSection::default(),
            llm: LlmSection::default(),
            storage: StorageSection::default(),
        }
    }
}

fn validate_pipeline_name(name: &str) -> Result<(), ConfigError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidPipelineName(name.to_string()))
    }
}
