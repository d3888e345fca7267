//! Builtin specialist agents
//!
//! Stub implementations of the five standard specialists. They validate their
//! parameters and return canned structured data shaped like real results, so
//! full pipelines can be exercised without a PACS, a GPU, or an LLM endpoint.

pub mod imaging;
pub mod indexing;
pub mod inference;
pub mod reporting;
pub mod retrieval;

pub use imaging::ImagingAgent;
pub use indexing::IndexingAgent;
pub use inference::InferenceAgent;
pub use reporting::ReportingAgent;
pub use retrieval::RetrievalAgent;

use super::{AgentError, ResolvedParameters};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Required string parameter.
pub(crate) fn require_str(
    parameters: &ResolvedParameters,
    name: &str,
) -> Result<String, AgentError> {
    match parameters.get(name) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(AgentError::invalid_parameter(
            name,
            format!("expected a string, got {other}"),
        )),
        None => Err(AgentError::missing_parameter(name)),
    }
}

/// Optional string parameter; absent is `None`, wrong type is an error.
pub(crate) fn optional_str(
    parameters: &ResolvedParameters,
    name: &str,
) -> Result<Option<String>, AgentError> {
    match parameters.get(name) {
        None => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        Some(other) => Err(AgentError::invalid_parameter(
            name,
            format!("expected a string, got {other}"),
        )),
    }
}

/// Required parameter reconstructed into a typed record. An unresolved
/// context-reference marker fails reconstruction here, so a missing upstream
/// field surfaces as a reported domain failure at the consuming agent.
pub(crate) fn require_typed<T: DeserializeOwned>(
    parameters: &ResolvedParameters,
    name: &str,
) -> Result<T, AgentError> {
    let value = parameters
        .get(name)
        .ok_or_else(|| AgentError::missing_parameter(name))?;
    serde_json::from_value(value.clone())
        .map_err(|err| AgentError::invalid_parameter(name, err.to_string()))
}

/// Optional typed parameter; absent is `None`, malformed is an error.
pub(crate) fn optional_typed<T: DeserializeOwned>(
    parameters: &ResolvedParameters,
    name: &str,
) -> Result<Option<T>, AgentError> {
    match parameters.get(name) {
        None => Ok(None),
        Some(value) => serde_json::from_value(value.clone())
            .map(Some)
            .map_err(|err| AgentError::invalid_parameter(name, err.to_string())),
    }
}
