//! Terminal output.

use chrono::{DateTime, Local, Utc};
use ovis_engine::{InstanceSummary, RunEvent, RunOutcome, RunStatus, TemplateSummary, Workflow};
use serde::Serialize;

/// Print a value as pretty JSON.
pub fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn format_time(time: &DateTime<Utc>) -> String {
    time.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string()
}

fn status_marker(status: RunStatus) -> &'static str {
    match status {
        RunStatus::Pending => " ",
        RunStatus::Running => ">",
        RunStatus::Completed => "+",
        RunStatus::Failed => "x",
    }
}

pub fn print_templates(templates: &[TemplateSummary]) {
    if templates.is_empty() {
        println!("No templates found");
        return;
    }

    println!("{:<24} {:<32} {:>5}  DESCRIPTION", "ID", "NAME", "TASKS");
    for t in templates {
        println!(
            "{:<24} {:<32} {:>5}  {}",
            t.id, t.name, t.task_count, t.description
        );
    }
}

pub fn print_instances(instances: &[InstanceSummary]) {
    if instances.is_empty() {
        println!("No instances found");
        return;
    }

    println!("{:<36} {:<10} {:<20} NAME", "ID", "STATUS", "CREATED");
    for i in instances {
        println!(
            "{:<36} {:<10} {:<20} {}",
            i.id,
            i.status.to_string(),
            format_time(&i.created_at),
            i.name
        );
    }
}

pub fn print_workflow(workflow: &Workflow) {
    println!("{} ({})", workflow.name, workflow.id);
    if !workflow.description.is_empty() {
        println!("  {}", workflow.description);
    }
    println!("  status:  {}", workflow.status);
    if let Some(ref error) = workflow.error {
        println!("  error:   {}", error);
    }
    println!("  created: {}", format_time(&workflow.created_at));
    println!("  updated: {}", format_time(&workflow.updated_at));
    println!();

    for (index, task) in workflow.tasks.iter().enumerate() {
        let duration = task
            .duration_ms()
            .map(|ms| format!(" {}ms", ms))
            .unwrap_or_default();
        println!(
            "  [{}] {}. {} ({}){}",
            status_marker(task.status),
            index + 1,
            task.id,
            task.handler_type,
            duration
        );
        if let Some(ref error) = task.error {
            println!("        error: {}", error);
        }
    }
}

/// One progress line per run event.
pub fn format_event(event: &RunEvent) -> String {
    match event {
        RunEvent::TaskStarted { task_id } => format!("> {} started", task_id),
        RunEvent::TaskCompleted { task_id, .. } => format!("+ {} completed", task_id),
        RunEvent::TaskFailed { task_id, error } => format!("x {} failed: {}", task_id, error),
    }
}

pub fn print_outcome(workflow: &Workflow, outcome: &RunOutcome) {
    let total = workflow.tasks.len();
    let done = workflow.completed_tasks();

    match outcome {
        RunOutcome::Completed(_) => {
            println!("Workflow '{}' completed ({}/{} tasks)", workflow.id, done, total)
        }
        RunOutcome::Cancelled(_) => {
            println!("Workflow '{}' cancelled ({}/{} tasks)", workflow.id, done, total)
        }
        RunOutcome::Failed { error, .. } => {
            println!("Workflow '{}' failed ({}/{} tasks): {}", workflow.id, done, total, error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_event() {
        assert_eq!(
            format_event(&RunEvent::TaskStarted { task_id: "search".to_string() }),
            "> search started"
        );
        assert_eq!(
            format_event(&RunEvent::TaskCompleted {
                task_id: "search".to_string(),
                result: json!({}),
            }),
            "+ search completed"
        );
        assert_eq!(
            format_event(&RunEvent::TaskFailed {
                task_id: "search".to_string(),
                error: "timeout".to_string(),
            }),
            "x search failed: timeout"
        );
    }

    #[test]
    fn test_status_marker() {
        assert_eq!(status_marker(RunStatus::Completed), "+");
        assert_eq!(status_marker(RunStatus::Failed), "x");
    }
}
