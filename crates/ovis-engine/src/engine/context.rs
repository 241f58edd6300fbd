//! Per-run context: cancellation signal and observer fan-out.

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use super::observer::RunObserver;

/// Cloneable cancellation signal shared between a run and its controller.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancelHandle {
    /// Request cancellation; observed before the next task starts.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    pub(crate) fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// State scoped to a single workflow run.
///
/// Each run gets its own cancellation signal and observer list, so runs on
/// the same engine never see each other's signals or notifications.
#[derive(Clone, Default)]
pub struct RunContext {
    cancel: CancelHandle,
    observers: Vec<Arc<dyn RunObserver>>,
}

impl RunContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an observer; all observers receive every event.
    pub fn with_observer(mut self, observer: impl RunObserver + 'static) -> Self {
        self.observers.push(Arc::new(observer));
        self
    }

    /// Handle that can cancel this run from elsewhere.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(crate) fn clear_cancellation(&self) {
        self.cancel.reset();
    }

    pub(crate) fn notify_started(&self, task_id: &str) {
        for observer in &self.observers {
            observer.on_task_started(task_id);
        }
    }

    pub(crate) fn notify_completed(&self, task_id: &str, result: &Value) {
        for observer in &self.observers {
            observer.on_task_completed(task_id, result);
        }
    }

    pub(crate) fn notify_failed(&self, task_id: &str, error: &str) {
        for observer in &self.observers {
            observer.on_task_failed(task_id, error);
        }
    }
}

impl std::fmt::Debug for RunContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunContext")
            .field("cancelled", &self.is_cancelled())
            .field("observers", &self.observers.len())
            .finish()
    }
}
