//! Workflow: an ordered, linear sequence of tasks plus aggregate run state.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::results::ResultStore;
use super::status::RunStatus;
use super::task::Task;

/// Error recorded on a workflow whose run was cancelled.
pub const CANCELLED_MARKER: &str = "cancelled";

/// A workflow template or instance.
///
/// Tasks run strictly in array order. `result` holds the results of the
/// tasks completed so far in the current run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workflow {
    pub id: String,

    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub tasks: Vec<Task>,

    #[serde(default)]
    pub status: RunStatus,

    /// Index of the task being (or last) executed; `None` before the first task
    #[serde(default)]
    pub current_task_index: Option<usize>,

    #[serde(default)]
    pub result: ResultStore,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,

    #[serde(default = "Utc::now")]
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    /// Create an empty pending workflow.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            tasks: Vec::new(),
            status: RunStatus::Pending,
            current_task_index: None,
            result: ResultStore::new(),
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_task(mut self, task: Task) -> Self {
        self.tasks.push(task);
        self
    }

    /// Number of tasks in `Completed` status.
    pub fn completed_tasks(&self) -> usize {
        self.tasks
            .iter()
            .filter(|t| t.status == RunStatus::Completed)
            .count()
    }

    /// Whether the last run ended through cancellation.
    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Failed && self.error.as_deref() == Some(CANCELLED_MARKER)
    }

    /// Check that task ids are non-empty and unique.
    pub fn check_task_ids(&self) -> Result<(), String> {
        let mut seen = HashSet::new();
        for (index, task) in self.tasks.iter().enumerate() {
            if task.id.trim().is_empty() {
                return Err(format!("Task at position {} has an empty id", index));
            }
            if !seen.insert(task.id.as_str()) {
                return Err(format!("Duplicate task id '{}'", task.id));
            }
        }
        Ok(())
    }

    /// Clear all run state so the workflow can be executed again.
    pub fn reset_run_state(&mut self) {
        for task in &mut self.tasks {
            task.reset();
        }
        self.status = RunStatus::Pending;
        self.current_task_index = None;
        self.result = ResultStore::new();
        self.error = None;
        self.touch();
    }

    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub(crate) fn begin_run(&mut self) {
        self.status = RunStatus::Running;
        self.current_task_index = None;
        self.touch();
    }

    pub(crate) fn mark_completed(&mut self, results: ResultStore) {
        self.status = RunStatus::Completed;
        self.result = results;
        self.touch();
    }

    pub(crate) fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.error = Some(error.into());
        self.touch();
    }

    pub(crate) fn mark_cancelled(&mut self) {
        self.mark_failed(CANCELLED_MARKER);
    }
}
