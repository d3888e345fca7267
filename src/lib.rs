//! radpipe - multi-agent task-pipeline orchestrator
//!
//! Executes an ordered sequence of named instructions against pluggable
//! specialist agents, threading results between steps through an accumulating
//! context addressed by dotted/indexed path expressions, with
//! halt-on-first-failure semantics and per-step status accounting.
//!
//! # Overview
//!
//! This crate provides:
//! - A typed data model for task definitions, instructions, and responses
//! - Context-reference resolution (`{"$from_context": "a.b.0.c"}`)
//! - A read-only agent registry shared across runs
//! - An orchestrator producing a [`PipelineStatus`](protocol::PipelineStatus)
//!   per run
//! - Builtin stub specialists for retrieval, segmentation, inference,
//!   indexing, and reporting
//!
//! # Quick Start
//!
//! ```rust
//! use radpipe::protocol::{AgentCommand, AgentInstruction, ParamValue, TaskDefinition};
//!
//! // A two-step definition: index a document, then query it back.
//! let definition = TaskDefinition::new("index-then-query")
//!     .with_instruction(
//!         AgentInstruction::new(AgentCommand::IndexDocument, "semantic_indexing")
//!             .with_parameter("doc_id", ParamValue::literal("doc-1"))
//!             .with_parameter("text_content", ParamValue::literal("focal lesion")),
//!     )
//!     .with_instruction(
//!         AgentInstruction::new(AgentCommand::QueryIndex, "semantic_indexing")
//!             .with_parameter("query_text", ParamValue::literal("lesion")),
//!     );
//!
//! assert!(definition.validate().is_ok());
//!
//! // Parameter values referencing the context keep their wire shape.
//! let param = ParamValue::from_context("retrieval_info.series_volumes.0");
//! assert_eq!(
//!     serde_json::to_value(&param).unwrap(),
//!     serde_json::json!({ "$from_context": "retrieval_info.series_volumes.0" })
//! );
//! ```

pub mod agents;
pub mod assembler;
pub mod config;
pub mod context;
pub mod error;
pub mod observability;
pub mod orchestrator;
pub mod protocol;
pub mod testing;

pub use agents::{Agent, AgentError, AgentRegistry};
pub use assembler::{diagnostic_task_definition, run_diagnostic_pipeline, PipelineInput};
pub use config::{ConfigError, OrchestratorConfig};
pub use context::{PathResolver, PipelineContext, ResolutionMode};
pub use error::{PipelineError, PipelineResult};
pub use orchestrator::Orchestrator;
pub use protocol::*;
