//! Run status shared by tasks and workflows.

use serde::{Deserialize, Serialize};

/// Status of a task or workflow within one run.
///
/// Transitions are monotonic per run: `Pending -> Running -> {Completed | Failed}`.
/// Going back to `Pending` requires an explicit reset before a new run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Not started yet.
    #[default]
    Pending,
    /// Currently executing.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error (or was cancelled).
    Failed,
}

impl RunStatus {
    /// Whether `next` is a legal forward transition from this status.
    pub fn can_transition_to(&self, next: RunStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Running)
                | (Self::Running, Self::Completed)
                | (Self::Running, Self::Failed)
        )
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending => write!(f, "pending"),
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
        }
    }
}
