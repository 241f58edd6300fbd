//! Task: one step of a workflow.

use chrono::{DateTime, Utc};
use ovis_handlers::Parameters;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::status::RunStatus;

/// One step of a workflow.
///
/// Parameter values are either literals or reference expressions
/// (`$taskId.path`) resolved against prior task results right before the
/// handler runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Unique within its workflow
    pub id: String,

    /// Registry key of the handler
    #[serde(rename = "handler", alias = "handlerType", alias = "type")]
    pub handler_type: String,

    #[serde(default, alias = "params")]
    pub parameters: Parameters,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub status: RunStatus,

    /// Handler result; null until the task completes
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub result: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Task {
    /// Create a pending task.
    pub fn new(id: impl Into<String>, handler_type: impl Into<String>) -> Self {
        let handler_type = handler_type.into();
        Self {
            id: id.into(),
            description: format!("{} task", handler_type),
            handler_type,
            parameters: Parameters::new(),
            status: RunStatus::Pending,
            result: Value::Null,
            error: None,
            started_at: None,
            finished_at: None,
        }
    }

    pub fn with_parameter(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.parameters.insert(name.into(), value.into());
        self
    }

    pub fn with_parameters(mut self, parameters: Parameters) -> Self {
        self.parameters = parameters;
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Clear all run state, returning the task to `Pending`.
    pub fn reset(&mut self) {
        self.status = RunStatus::Pending;
        self.result = Value::Null;
        self.error = None;
        self.started_at = None;
        self.finished_at = None;
    }

    pub(crate) fn mark_running(&mut self) {
        debug_assert!(self.status.can_transition_to(RunStatus::Running));
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub(crate) fn mark_completed(&mut self, result: Value) {
        self.status = RunStatus::Completed;
        self.result = result;
        self.finished_at = Some(Utc::now());
    }

    pub(crate) fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self.finished_at = Some(Utc::now());
    }

    /// Wall-clock duration of the last run, if it finished.
    pub fn duration_ms(&self) -> Option<i64> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
            _ => None,
        }
    }
}
