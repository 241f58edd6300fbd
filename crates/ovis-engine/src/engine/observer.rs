//! Run observers.
//!
//! Observers are invoked synchronously from the run loop, in registration
//! order, at every task start, completion and failure. Anything that needs
//! to react on another thread or task should hand the event off, which is
//! what [`ChannelObserver`] does.

use serde::Serialize;
use serde_json::Value;
use tokio::sync::mpsc;

/// Receives task lifecycle notifications. All methods default to no-ops.
pub trait RunObserver: Send + Sync {
    fn on_task_started(&self, _task_id: &str) {}

    fn on_task_completed(&self, _task_id: &str, _result: &Value) {}

    fn on_task_failed(&self, _task_id: &str, _error: &str) {}
}

/// Task lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum RunEvent {
    TaskStarted { task_id: String },
    TaskCompleted { task_id: String, result: Value },
    TaskFailed { task_id: String, error: String },
}

impl RunEvent {
    pub fn task_id(&self) -> &str {
        match self {
            Self::TaskStarted { task_id }
            | Self::TaskCompleted { task_id, .. }
            | Self::TaskFailed { task_id, .. } => task_id,
        }
    }
}

pub type RunEventSender = mpsc::UnboundedSender<RunEvent>;
pub type RunEventReceiver = mpsc::UnboundedReceiver<RunEvent>;

/// Forwards every notification as a [`RunEvent`] over an unbounded channel.
///
/// Events sent after the receiver is dropped are discarded.
#[derive(Debug, Clone)]
pub struct ChannelObserver {
    sender: RunEventSender,
}

impl ChannelObserver {
    pub fn new(sender: RunEventSender) -> Self {
        Self { sender }
    }

    /// Create an observer together with the receiving end of its channel.
    pub fn channel() -> (Self, RunEventReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(tx), rx)
    }

    fn send(&self, event: RunEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Run event receiver dropped");
        }
    }
}

impl RunObserver for ChannelObserver {
    fn on_task_started(&self, task_id: &str) {
        self.send(RunEvent::TaskStarted {
            task_id: task_id.to_string(),
        });
    }

    fn on_task_completed(&self, task_id: &str, result: &Value) {
        self.send(RunEvent::TaskCompleted {
            task_id: task_id.to_string(),
            result: result.clone(),
        });
    }

    fn on_task_failed(&self, task_id: &str, error: &str) {
        self.send(RunEvent::TaskFailed {
            task_id: task_id.to_string(),
            error: error.to_string(),
        });
    }
}

/// Logs task lifecycle events through `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingObserver {
    workflow_id: String,
}

impl TracingObserver {
    pub fn new(workflow_id: impl Into<String>) -> Self {
        Self {
            workflow_id: workflow_id.into(),
        }
    }
}

impl RunObserver for TracingObserver {
    fn on_task_started(&self, task_id: &str) {
        tracing::info!(workflow_id = %self.workflow_id, task_id, "Task started");
    }

    fn on_task_completed(&self, task_id: &str, _result: &Value) {
        tracing::info!(workflow_id = %self.workflow_id, task_id, "Task completed");
    }

    fn on_task_failed(&self, task_id: &str, error: &str) {
        tracing::error!(workflow_id = %self.workflow_id, task_id, error, "Task failed");
    }
}
