//! Semantic indexing agent
//!
//! Handles INDEX_DOCUMENT and QUERY_INDEX against an in-memory store. Scoring
//! is a naive term-overlap count; enough to exercise index-then-query flows.

use super::{optional_typed, require_str};
use crate::agents::{Agent, AgentError, AgentOutputs, ResolvedParameters};
use crate::protocol::AgentCommand;
use async_trait::async_trait;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

const DEFAULT_TOP_K: usize = 5;

#[derive(Debug, Clone)]
struct IndexedDocument {
    text: String,
    metadata: Option<Value>,
}

pub struct IndexingAgent {
    name: String,
    documents: Mutex<HashMap<String, IndexedDocument>>,
}

impl IndexingAgent {
    pub fn new() -> Self {
        Self {
            name: "semantic_indexing".to_string(),
            documents: Mutex::new(HashMap::new()),
        }
    }

    async fn index_document(
        &self,
        parameters: &ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        let doc_id = require_str(parameters, "doc_id")?;
        let text_content = require_str(parameters, "text_content")?;
        if text_content.trim().is_empty() {
            return Err(AgentError::Indexing(format!(
                "document '{doc_id}' has empty text content"
            )));
        }
        let metadata = parameters.get("metadata").cloned();

        let mut documents = self.documents.lock().await;
        documents.insert(
            doc_id.clone(),
            IndexedDocument {
                text: text_content,
                metadata,
            },
        );
        debug!(doc_id = %doc_id, total = documents.len(), "document indexed");

        let mut outputs = Map::new();
        outputs.insert("status".to_string(), json!("indexed"));
        outputs.insert("doc_id".to_string(), json!(doc_id));
        Ok(outputs)
    }

    async fn query_index(
        &self,
        parameters: &ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        let query_text = require_str(parameters, "query_text")?;
        let top_k: usize = optional_typed(parameters, "top_k")?.unwrap_or(DEFAULT_TOP_K);

        let terms: Vec<String> = query_text
            .to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect();

        let documents = self.documents.lock().await;
        let mut scored: Vec<(String, usize, &IndexedDocument)> = documents
            .iter()
            .filter_map(|(doc_id, doc)| {
                let haystack = doc.text.to_lowercase();
                let score = terms.iter().filter(|t| haystack.contains(*t)).count();
                (score > 0).then_some((doc_id.clone(), score, doc))
            })
            .collect();
        scored.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        scored.truncate(top_k);

        let results: Vec<Value> = scored
            .into_iter()
            .map(|(doc_id, score, doc)| {
                json!({
                    "doc_id": doc_id,
                    "score": score,
                    "snippet": doc.text.chars().take(120).collect::<String>(),
                    "metadata": doc.metadata,
                })
            })
            .collect();

        let mut outputs = Map::new();
        outputs.insert("query_results".to_string(), Value::Array(results));
        Ok(outputs)
    }
}

impl Default for IndexingAgent {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Agent for IndexingAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        command: AgentCommand,
        parameters: ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        match command {
            AgentCommand::IndexDocument => self.index_document(&parameters).await,
            AgentCommand::QueryIndex => self.query_index(&parameters).await,
            other => Err(AgentError::unsupported_command(&self.name, other)),
        }
    }
}
