//! Workflow template parsing.
//!
//! Template files are YAML with top-level `id`, `name`, `description` and an
//! ordered `tasks` list. Each task has `id`, `handler` (or `type`),
//! `parameters` (or `params`) and an optional `description`.

use ovis_handlers::Parameters;
use serde::Deserialize;
use std::path::Path;

use crate::error::StoreError;
use crate::model::{Task, Workflow};

#[derive(Debug, Deserialize)]
struct TemplateDocument {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    tasks: Vec<TaskDefinition>,
}

#[derive(Debug, Deserialize)]
struct TaskDefinition {
    id: String,
    #[serde(alias = "type")]
    handler: String,
    #[serde(default, alias = "params")]
    parameters: Option<Parameters>,
    #[serde(default)]
    description: Option<String>,
}

impl From<TaskDefinition> for Task {
    fn from(def: TaskDefinition) -> Self {
        let task = Task::new(def.id, def.handler).with_parameters(def.parameters.unwrap_or_default());
        match def.description {
            Some(description) => task.with_description(description),
            None => task,
        }
    }
}

/// Parse template YAML into a pending workflow.
pub fn parse_template(yaml: &str, path: &Path) -> Result<Workflow, StoreError> {
    let doc: TemplateDocument =
        serde_yaml::from_str(yaml).map_err(|e| StoreError::parse(path, e))?;

    if doc.id.trim().is_empty() {
        return Err(StoreError::parse(path, "template id must not be empty"));
    }

    let name = doc.name.unwrap_or_else(|| doc.id.clone());
    let mut workflow = Workflow::new(doc.id, name).with_description(doc.description);
    workflow.tasks = doc.tasks.into_iter().map(Task::from).collect();

    workflow
        .check_task_ids()
        .map_err(|message| StoreError::parse(path, message))?;

    if let Some(task) = workflow.tasks.iter().find(|t| t.handler_type.trim().is_empty()) {
        return Err(StoreError::parse(
            path,
            format!("task '{}' has an empty handler", task.id),
        ));
    }

    Ok(workflow)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RunStatus;
    use serde_json::json;

    const NEWS: &str = r#"
id: daily_news
name: Daily news digest
description: Search and summarize
tasks:
  - id: search
    handler: web_search
    description: Find articles
    parameters:
      query: rust async
      count: 5
  - id: summarize
    type: ai_process
    params:
      previous_result: $search
      style: bullet
"#;

    #[test]
    fn test_parse_template() {
        let wf = parse_template(NEWS, Path::new("daily_news.yaml")).unwrap();

        assert_eq!(wf.id, "daily_news");
        assert_eq!(wf.name, "Daily news digest");
        assert_eq!(wf.tasks.len(), 2);
        assert_eq!(wf.tasks[0].description, "Find articles");
        assert_eq!(wf.tasks[0].parameters.get("count"), Some(&json!(5)));
        assert_eq!(wf.tasks[1].handler_type, "ai_process");
        assert_eq!(wf.tasks[1].description, "ai_process task");
        assert_eq!(
            wf.tasks[1].parameters.get("previous_result"),
            Some(&json!("$search"))
        );
        assert!(wf.tasks.iter().all(|t| t.status == RunStatus::Pending));
    }

    #[test]
    fn test_parameter_order_preserved() {
        let wf = parse_template(
            "id: t\ntasks:\n  - id: a\n    handler: echo\n    parameters:\n      z: 1\n      a: 2\n      m: 3\n",
            Path::new("t.yaml"),
        )
        .unwrap();

        let keys: Vec<&str> = wf.tasks[0].parameters.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(wf.name, "t");
    }

    #[test]
    fn test_duplicate_task_ids_rejected() {
        let yaml = "id: dup\ntasks:\n  - id: a\n    handler: echo\n  - id: a\n    handler: echo\n";
        let err = parse_template(yaml, Path::new("dup.yaml")).unwrap_err();
        assert!(matches!(err, StoreError::Parse { ref message, .. } if message.contains("Duplicate")));
    }

    #[test]
    fn test_invalid_templates() {
        for yaml in [
            "id: ''\ntasks: []\n",
            "name: no id\n",
            "id: x\ntasks:\n  - id: a\n",
            "id: x\ntasks:\n  - id: a\n    handler: ''\n",
            "::: not yaml",
        ] {
            assert!(
                parse_template(yaml, Path::new("x.yaml")).is_err(),
                "expected error for {yaml:?}"
            );
        }
    }
}
