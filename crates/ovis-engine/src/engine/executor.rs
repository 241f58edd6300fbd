//! Workflow executor.

use ovis_handlers::HandlerRegistry;
use serde_json::Value;
use std::sync::Arc;
use std::time::Instant;

use super::context::RunContext;
use super::outcome::RunOutcome;
use crate::error::EngineError;
use crate::model::{ResultStore, Task, Workflow};
use crate::reference::resolve_parameters;

/// Runs workflows task by task against a handler registry.
///
/// The engine holds no per-run state; cancellation and observers travel in
/// the [`RunContext`] passed to each run, so one engine can drive several
/// runs at once.
#[derive(Debug, Clone)]
pub struct WorkflowEngine {
    registry: Arc<HandlerRegistry>,
}

impl WorkflowEngine {
    /// Create a new engine.
    pub fn new(registry: Arc<HandlerRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Check a workflow ahead of a run.
    ///
    /// Fails when task ids are empty or repeated, or when a task uses a
    /// handler type that is not registered.
    pub fn validate(&self, workflow: &Workflow) -> Result<(), EngineError> {
        workflow.check_task_ids().map_err(EngineError::Validation)?;

        let unknown: Vec<String> = workflow
            .tasks
            .iter()
            .filter(|t| !self.registry.has(&t.handler_type))
            .map(|t| format!("task '{}' uses unregistered handler '{}'", t.id, t.handler_type))
            .collect();

        if !unknown.is_empty() {
            return Err(EngineError::Validation(unknown.join("; ")));
        }

        Ok(())
    }

    /// Execute every task of `workflow` in order.
    ///
    /// Run state is reset first, so a workflow that already ran starts over.
    /// Cancellation is checked before each task; a running handler is never
    /// interrupted. The workflow is left in its terminal state.
    pub async fn execute(&self, workflow: &mut Workflow, ctx: &RunContext) -> RunOutcome {
        let start = Instant::now();

        tracing::info!(
            workflow_id = %workflow.id,
            name = %workflow.name,
            tasks = workflow.tasks.len(),
            "Workflow execution started"
        );

        workflow.reset_run_state();
        workflow.begin_run();
        ctx.clear_cancellation();

        let mut results = ResultStore::new();

        for index in 0..workflow.tasks.len() {
            if ctx.is_cancelled() {
                workflow.mark_cancelled();
                tracing::warn!(
                    workflow_id = %workflow.id,
                    completed = results.len(),
                    remaining = workflow.tasks.len() - index,
                    "Workflow execution cancelled"
                );
                return RunOutcome::Cancelled(results);
            }

            workflow.current_task_index = Some(index);
            workflow.touch();

            let task = &mut workflow.tasks[index];
            match self.execute_task(task, &results, ctx).await {
                Ok(result) => {
                    results.insert(task.id.clone(), result);
                    workflow.result = results.clone();
                }
                Err(error) => {
                    workflow.mark_failed(error.task_message());
                    tracing::error!(
                        workflow_id = %workflow.id,
                        error = %error,
                        duration_ms = start.elapsed().as_millis() as u64,
                        "Workflow execution failed"
                    );
                    return RunOutcome::Failed {
                        error,
                        partial: results,
                    };
                }
            }
        }

        workflow.mark_completed(results.clone());

        tracing::info!(
            workflow_id = %workflow.id,
            tasks = results.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Workflow execution completed"
        );

        RunOutcome::Completed(results)
    }

    /// Execute a single task with parameters resolved against `results`.
    async fn execute_task(
        &self,
        task: &mut Task,
        results: &ResultStore,
        ctx: &RunContext,
    ) -> Result<Value, EngineError> {
        let start = Instant::now();

        task.mark_running();
        ctx.notify_started(&task.id);

        tracing::debug!(task_id = %task.id, handler = %task.handler_type, "Executing task");

        let params = resolve_parameters(&task.parameters, results);

        let outcome = match self.registry.get(&task.handler_type) {
            Some(handler) => handler
                .execute(params)
                .await
                .map_err(|e| EngineError::TaskExecution {
                    task_id: task.id.clone(),
                    message: e.to_string(),
                }),
            None => Err(EngineError::Configuration {
                handler_type: task.handler_type.clone(),
                task_id: task.id.clone(),
            }),
        };

        match outcome {
            Ok(result) => {
                task.mark_completed(result.clone());
                ctx.notify_completed(&task.id, &result);
                tracing::info!(
                    task_id = %task.id,
                    handler = %task.handler_type,
                    duration_ms = start.elapsed().as_millis() as u64,
                    "Task completed"
                );
                Ok(result)
            }
            Err(error) => {
                let message = error.task_message();
                task.mark_failed(message.clone());
                ctx.notify_failed(&task.id, &message);
                tracing::warn!(
                    task_id = %task.id,
                    handler = %task.handler_type,
                    error = %message,
                    "Task failed"
                );
                Err(error)
            }
        }
    }
}
