//! Mock implementations for testing
//!
//! Provides a scripted [`MockAgent`] so orchestrator behavior can be tested
//! without the builtin specialists: fixed success outputs, reported domain
//! failures, and panics, with invocation recording for never-invoked
//! assertions.

use crate::agents::{Agent, AgentError, AgentOutputs, ResolvedParameters};
use crate::protocol::AgentCommand;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::Mutex;

/// Convert a JSON object literal into an output mapping.
///
/// Panics when handed a non-object; test construction only.
pub fn outputs_of(value: Value) -> AgentOutputs {
    match value {
        Value::Object(map) => map,
        other => panic!("outputs_of requires a JSON object, got {other}"),
    }
}

enum MockBehavior {
    Succeed(AgentOutputs),
    Fail(String),
    Panic,
}

/// Scripted agent with a fixed behavior per instance.
pub struct MockAgent {
    name: String,
    behavior: MockBehavior,
    invocations: Mutex<Vec<(AgentCommand, ResolvedParameters)>>,
}

impl MockAgent {
    /// Always succeeds with the given outputs.
    pub fn succeeding(name: impl Into<String>, outputs: AgentOutputs) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Succeed(outputs),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Always reports a domain failure with the given message.
    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Fail(message.into()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Panics on every call, simulating an uncaught agent crash.
    pub fn panicking(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            behavior: MockBehavior::Panic,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub async fn invocation_count(&self) -> usize {
        self.invocations.lock().await.len()
    }

    pub async fn invocations(&self) -> Vec<(AgentCommand, ResolvedParameters)> {
        self.invocations.lock().await.clone()
    }
}

#[async_trait]
impl Agent for MockAgent {
    fn name(&self) -> &str {
        &self.name
    }

    async fn execute(
        &self,
        command: AgentCommand,
        parameters: ResolvedParameters,
    ) -> Result<AgentOutputs, AgentError> {
        self.invocations
            .lock()
            .await
            .push((command, parameters.clone()));

        match &self.behavior {
            MockBehavior::Succeed(outputs) => Ok(outputs.clone()),
            MockBehavior::Fail(message) => Err(AgentError::Other(message.clone())),
            MockBehavior::Panic => panic!("mock agent '{}' panicked", self.name),
        }
    }
}
