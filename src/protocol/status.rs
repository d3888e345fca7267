//! Per-instruction and aggregate execution records
//!
//! A pipeline run produces one [`PipelineStatus`] holding an ordered list of
//! [`TaskStatus`] entries, one per instruction that was started. The final
//! `PipelineStatus` is the source of truth for the user-visible outcome.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

/// Lifecycle of a single instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Pending,
    InProgress,
    Completed,
    Failed,
}

/// Lifecycle of a whole run.
///
/// `CompletedWithErrors` marks a normally reported agent failure; `Failed` is
/// reserved for orchestration-level errors (unknown agent, escaped panic,
/// malformed well-known output).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PipelineState {
    Running,
    CompletedSuccess,
    CompletedWithErrors,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, PipelineState::Running)
    }
}

/// Structured error detail attached to failed tasks and pipelines.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Short classification tag, e.g. `OrchestrationError`,
    /// `AgentReportedFailure`, `UnexpectedPanic`.
    pub kind: String,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorDetail {
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Execution record for one instruction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskStatus {
    pub instruction_id: Uuid,
    pub name: String,
    pub state: TaskState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorDetail>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl TaskStatus {
    pub fn pending(instruction_id: Uuid, name: impl Into<String>) -> Self {
        Self {
            instruction_id,
            name: name.into(),
            state: TaskState::Pending,
            message: None,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    pub fn start(&mut self) {
        self.state = TaskState::InProgress;
        self.started_at = Some(Utc::now());
    }

    pub fn complete(&mut self, message: impl Into<String>) {
        self.state = TaskState::Completed;
        self.message = Some(message.into());
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>, error: ErrorDetail) {
        self.state = TaskState::Failed;
        self.message = Some(message.into());
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }
}

/// Aggregate execution record for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub pipeline_id: Uuid,
    pub state: PipelineState,
    pub message: String,
    pub task_statuses: Vec<TaskStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fatal_error: Option<ErrorDetail>,
    /// Path of the generated report artifact, when the run produced one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub report_path: Option<PathBuf>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineStatus {
    /// A fresh record in the `Running` state, entered before instruction 1.
    pub fn running(pipeline_id: Uuid, message: impl Into<String>) -> Self {
        Self {
            pipeline_id,
            state: PipelineState::Running,
            message: message.into(),
            task_statuses: Vec::new(),
            fatal_error: None,
            report_path: None,
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Append a new in-progress task entry for an instruction.
    pub fn begin_task(&mut self, instruction_id: Uuid, name: impl Into<String>) {
        let mut task = TaskStatus::pending(instruction_id, name);
        task.start();
        self.task_statuses.push(task);
    }

    /// Mark the most recently appended task as completed.
    pub fn complete_current(&mut self, message: impl Into<String>) {
        if let Some(task) = self.task_statuses.last_mut() {
            task.complete(message);
        }
    }

    /// Mark the most recently appended task as failed.
    pub fn fail_current(&mut self, message: impl Into<String>, error: ErrorDetail) {
        if let Some(task) = self.task_statuses.last_mut() {
            task.fail(message, error);
        }
    }

    /// Transition into a terminal state.
    pub fn finalize(
        &mut self,
        state: PipelineState,
        message: impl Into<String>,
        fatal_error: Option<ErrorDetail>,
    ) {
        debug_assert!(state.is_terminal());
        self.state = state;
        self.message = message.into();
        self.fatal_error = fatal_error;
        self.finished_at = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.state == PipelineState::CompletedSuccess
    }

    /// One-line human-readable summary for CLI output.
    pub fn summary(&self) -> String {
        let completed = self
            .task_statuses
            .iter()
            .filter(|t| t.state == TaskState::Completed)
            .count();
        format!(
            "{:?}: {}/{} instructions completed - {}",
            self.state,
            completed,
            self.task_statuses.len(),
            self.message
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_lifecycle_transitions() {
        let mut task = TaskStatus::pending(Uuid::new_v4(), "RETRIEVE_DICOM_STUDY by retrieval");
        assert_eq!(task.state, TaskState::Pending);
        assert!(task.started_at.is_none());

        task.start();
        assert_eq!(task.state, TaskState::InProgress);
        assert!(task.started_at.is_some());
        assert!(task.finished_at.is_none());

        task.complete("done");
        assert_eq!(task.state, TaskState::Completed);
        assert!(task.finished_at.is_some());
    }

    #[test]
    fn pipeline_finalize_records_fatal_error() {
        let mut status = PipelineStatus::running(Uuid::new_v4(), "starting");
        status.begin_task(Uuid::new_v4(), "step");
        status.fail_current(
            "agent reported failure",
            ErrorDetail::new("AgentReportedFailure", "boom"),
        );
        status.finalize(
            PipelineState::CompletedWithErrors,
            "pipeline halted",
            Some(ErrorDetail::new("AgentReportedFailure", "boom")),
        );

        assert!(!status.is_success());
        assert!(status.finished_at.is_some());
        assert_eq!(status.fatal_error.as_ref().map(|e| e.kind.as_str()), Some("AgentReportedFailure"));
        assert_eq!(status.task_statuses[0].state, TaskState::Failed);
    }

    #[test]
    fn summary_counts_completed_tasks() {
        let mut status = PipelineStatus::running(Uuid::new_v4(), "starting");
        status.begin_task(Uuid::new_v4(), "a");
        status.complete_current("ok");
        status.begin_task(Uuid::new_v4(), "b");
        status.fail_current("bad", ErrorDetail::new("AgentReportedFailure", "bad"));
        status.finalize(PipelineState::CompletedWithErrors, "halted", None);

        assert!(status.summary().contains("1/2"));
    }
}
