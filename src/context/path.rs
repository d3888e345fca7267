//! Context-reference path resolution
//!
//! A context reference names a dotted/indexed path into the pipeline context,
//! e.g. `retrieval_info.series_volumes.0`. Components are walked left to
//! right: the first is a context-key lookup, the rest traverse the value tree
//! by object key or non-negative array index.

use super::{ContextError, PipelineContext};
use crate::protocol::ParamValue;
use serde_json::Value;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

/// Parsed dotted/indexed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContextPath {
    raw: String,
    components: Vec<String>,
}

impl ContextPath {
    pub fn parse(raw: &str) -> Result<Self, PathError> {
        if raw.is_empty() {
            return Err(PathError::Malformed(raw.to_string()));
        }
        let components: Vec<String> = raw.split('.').map(str::to_string).collect();
        if components.iter().any(String::is_empty) {
            return Err(PathError::Malformed(raw.to_string()));
        }
        Ok(Self {
            raw: raw.to_string(),
            components,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }
}

/// What to do when a reference cannot be resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionMode {
    /// Log the miss and substitute the original unresolved marker, letting
    /// dispatch proceed (the historically observed behavior).
    #[default]
    Permissive,
    /// Treat the miss as an orchestration failure for the instruction.
    Strict,
}

/// Errors raised while walking a context path.
#[derive(Debug, Error)]
pub enum PathError {
    #[error("empty or malformed context path '{0}'")]
    Malformed(String),

    #[error("context key '{key}' not present (path '{path}')")]
    UnknownKey { path: String, key: String },

    #[error("component '{component}' not found (path '{path}')")]
    MissingComponent { path: String, component: String },

    #[error("index {index} out of range for sequence of length {len} (path '{path}')")]
    IndexOutOfRange {
        path: String,
        index: usize,
        len: usize,
    },

    #[error("component '{component}' cannot traverse a {kind} value (path '{path}')")]
    NotTraversable {
        path: String,
        component: String,
        kind: &'static str,
    },

    #[error("context value under '{key}' is not traversable: {source}")]
    Untraversable {
        key: String,
        #[source]
        source: ContextError,
    },
}

/// Resolves instruction parameters against the current pipeline context.
#[derive(Debug, Clone, Copy, Default)]
pub struct PathResolver {
    mode: ResolutionMode,
}

impl PathResolver {
    pub fn new(mode: ResolutionMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> ResolutionMode {
        self.mode
    }

    /// Resolve one parameter value. Literals pass through unchanged; context
    /// references are walked against the context. In permissive mode an
    /// unresolvable reference yields the original marker instead of an error.
    pub fn resolve(
        &self,
        param: &ParamValue,
        context: &PipelineContext,
    ) -> Result<Value, PathError> {
        let path = match param {
            ParamValue::Literal(value) => return Ok(value.clone()),
            ParamValue::ContextRef { path } => path,
        };

        match Self::walk(path, context) {
            Ok(value) => Ok(value),
            Err(err) => match self.mode {
                ResolutionMode::Strict => Err(err),
                ResolutionMode::Permissive => {
                    warn!(
                        path = %path,
                        error = %err,
                        "context reference unresolved, substituting original marker"
                    );
                    Ok(ParamValue::marker(path))
                }
            },
        }
    }

    /// Resolve a full parameter mapping in key order.
    pub fn resolve_all(
        &self,
        parameters: &BTreeMap<String, ParamValue>,
        context: &PipelineContext,
    ) -> Result<BTreeMap<String, Value>, PathError> {
        let mut resolved = BTreeMap::new();
        for (key, param) in parameters {
            resolved.insert(key.clone(), self.resolve(param, context)?);
        }
        Ok(resolved)
    }

    fn walk(raw: &str, context: &PipelineContext) -> Result<Value, PathError> {
        let path = ContextPath::parse(raw)?;
        let mut components = path.components().iter();

        // parse() guarantees at least one component
        let root = components.next().ok_or_else(|| PathError::Malformed(raw.to_string()))?;
        let entry = context.get(root).ok_or_else(|| PathError::UnknownKey {
            path: raw.to_string(),
            key: root.clone(),
        })?;
        let mut current = entry.to_value().map_err(|source| PathError::Untraversable {
            key: root.clone(),
            source,
        })?;

        for component in components {
            current = match current {
                Value::Object(mut map) => {
                    map.remove(component.as_str())
                        .ok_or_else(|| PathError::MissingComponent {
                            path: raw.to_string(),
                            component: component.clone(),
                        })?
                }
                Value::Array(mut items) => {
                    let index: usize =
                        component
                            .parse()
                            .map_err(|_| PathError::NotTraversable {
                                path: raw.to_string(),
                                component: component.clone(),
                                kind: "sequence",
                            })?;
                    if index >= items.len() {
                        return Err(PathError::IndexOutOfRange {
                            path: raw.to_string(),
                            index,
                            len: items.len(),
                        });
                    }
                    items.swap_remove(index)
                }
                other => {
                    return Err(PathError::NotTraversable {
                        path: raw.to_string(),
                        component: component.clone(),
                        kind: value_kind(&other),
                    });
                }
            };
        }

        Ok(current)
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
