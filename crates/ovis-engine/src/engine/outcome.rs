//! Run outcome.

use crate::error::EngineError;
use crate::model::ResultStore;

/// How a workflow run ended, with the results gathered up to that point.
#[derive(Debug)]
pub enum RunOutcome {
    /// Every task succeeded.
    Completed(ResultStore),
    /// A task failed; `partial` holds the results of the tasks before it.
    Failed {
        error: EngineError,
        partial: ResultStore,
    },
    /// Cancellation was observed between tasks.
    Cancelled(ResultStore),
}

impl RunOutcome {
    /// Results gathered by the run, complete or partial.
    pub fn results(&self) -> &ResultStore {
        match self {
            Self::Completed(results) | Self::Cancelled(results) => results,
            Self::Failed { partial, .. } => partial,
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled(_))
    }

    pub fn error(&self) -> Option<&EngineError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    /// Short label for display.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed(_) => "completed",
            Self::Failed { .. } => "failed",
            Self::Cancelled(_) => "cancelled",
        }
    }

    /// Collapse into a `Result`: a cancelled run yields its partial results
    /// as `Ok`, only a failed run yields `Err`.
    pub fn into_result(self) -> Result<ResultStore, EngineError> {
        match self {
            Self::Completed(results) | Self::Cancelled(results) => Ok(results),
            Self::Failed { error, .. } => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn partial() -> ResultStore {
        let mut store = ResultStore::new();
        store.insert("t1", json!(1));
        store
    }

    #[test]
    fn test_into_result_asymmetry() {
        let cancelled = RunOutcome::Cancelled(partial());
        assert!(cancelled.is_cancelled());
        assert_eq!(cancelled.into_result().unwrap().len(), 1);

        let failed = RunOutcome::Failed {
            error: EngineError::TaskExecution {
                task_id: "t2".to_string(),
                message: "boom".to_string(),
            },
            partial: partial(),
        };
        assert_eq!(failed.results().len(), 1);
        assert_eq!(failed.label(), "failed");
        assert!(failed.into_result().is_err());
    }
}
