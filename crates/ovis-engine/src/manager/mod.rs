//! Workflow template and instance store.
//!
//! Templates are read-only YAML blueprints in `templates_dir`; instances are
//! JSON run records in `instances_dir`. Each file is named by its entity's id.

mod template;

pub use template::parse_template;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::StoreError;
use crate::model::{RunStatus, Workflow};

const TEMPLATE_EXTENSIONS: [&str; 2] = ["yaml", "yml"];
const INSTANCE_EXTENSION: &str = "json";
const INSTANCE_SUFFIX_LEN: usize = 8;

/// Listing entry for a template file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSummary {
    pub id: String,
    pub name: String,
    pub description: String,
    pub task_count: usize,
    pub path: PathBuf,
}

/// Listing entry for an instance file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceSummary {
    pub id: String,
    pub name: String,
    pub status: RunStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub path: PathBuf,
}

// Only the fields a listing needs; the task list is never materialized.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InstanceHeader {
    id: String,
    name: String,
    #[serde(default)]
    status: RunStatus,
    #[serde(default)]
    error: Option<String>,
    #[serde(default = "Utc::now")]
    created_at: DateTime<Utc>,
    #[serde(default = "Utc::now")]
    updated_at: DateTime<Utc>,
}

/// File-backed store for workflow templates and instances.
#[derive(Debug, Clone)]
pub struct WorkflowManager {
    templates_dir: PathBuf,
    instances_dir: PathBuf,
}

impl WorkflowManager {
    /// Create a manager for the configured directories, creating them if missing.
    pub async fn new(config: &EngineConfig) -> Result<Self, StoreError> {
        let manager = Self::with_dirs(config.templates_dir(), config.instances_dir());

        for dir in [&manager.templates_dir, &manager.instances_dir] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| StoreError::io(dir, e))?;
        }

        tracing::debug!(
            templates_dir = %manager.templates_dir.display(),
            instances_dir = %manager.instances_dir.display(),
            "Workflow manager ready"
        );

        Ok(manager)
    }

    /// Create a manager over existing directories.
    pub fn with_dirs(templates_dir: impl Into<PathBuf>, instances_dir: impl Into<PathBuf>) -> Self {
        Self {
            templates_dir: templates_dir.into(),
            instances_dir: instances_dir.into(),
        }
    }

    pub fn templates_dir(&self) -> &Path {
        &self.templates_dir
    }

    pub fn instances_dir(&self) -> &Path {
        &self.instances_dir
    }

    /// Path of the instance file for `id`.
    pub fn instance_path(&self, id: &str) -> Result<PathBuf, StoreError> {
        validate_id(id)?;
        Ok(self
            .instances_dir
            .join(format!("{}.{}", id, INSTANCE_EXTENSION)))
    }

    // ------------------------------------------------------------------
    // Templates
    // ------------------------------------------------------------------

    /// List templates sorted by id. Malformed files are logged and skipped.
    ///
    /// A template's id is its file stem, the same key `load_template` takes.
    pub async fn list_templates(&self) -> Result<Vec<TemplateSummary>, StoreError> {
        let mut summaries = Vec::new();

        for path in list_files(&self.templates_dir, &TEMPLATE_EXTENSIONS).await? {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()).map(str::to_string) else {
                tracing::warn!(path = %path.display(), "Skipping template with non UTF-8 name");
                continue;
            };

            match read_template(&path).await {
                Ok(workflow) => summaries.push(TemplateSummary {
                    id: template_id_for(&stem, workflow.id),
                    name: workflow.name,
                    description: workflow.description,
                    task_count: workflow.tasks.len(),
                    path,
                }),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Skipping malformed template");
                }
            }
        }

        summaries.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(summaries)
    }

    /// Load a template by id.
    pub async fn load_template(&self, template_id: &str) -> Result<Workflow, StoreError> {
        validate_id(template_id)?;

        for ext in TEMPLATE_EXTENSIONS {
            let path = self.templates_dir.join(format!("{}.{}", template_id, ext));
            match read_template(&path).await {
                Ok(mut workflow) => {
                    workflow.id = template_id_for(template_id, workflow.id);
                    return Ok(workflow);
                }
                Err(StoreError::Io { source, .. }) if source.kind() == ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
        }

        Err(StoreError::NotFound(template_id.to_string()))
    }

    // ------------------------------------------------------------------
    // Instances
    // ------------------------------------------------------------------

    /// Create and persist a new instance of a template.
    pub async fn create_from_template(&self, template_id: &str) -> Result<Workflow, StoreError> {
        let template = self.load_template(template_id).await?;
        self.instantiate(template).await
    }

    /// Persist a loaded template as a new instance.
    ///
    /// The instance id is `<templateId>_<8 hex chars>`; both timestamps are now.
    pub async fn instantiate(&self, template: Workflow) -> Result<Workflow, StoreError> {
        let template_id = template.id.clone();
        let mut workflow = template;

        let suffix = Uuid::new_v4().simple().to_string();
        workflow.id = format!("{}_{}", template_id, &suffix[..INSTANCE_SUFFIX_LEN]);
        workflow.reset_run_state();
        let now = Utc::now();
        workflow.created_at = now;
        workflow.updated_at = now;

        self.save_instance(&workflow).await?;

        tracing::info!(
            template_id = %template_id,
            instance_id = %workflow.id,
            tasks = workflow.tasks.len(),
            "Created workflow instance"
        );

        Ok(workflow)
    }

    /// Persist a workflow authored outside any template as a new instance.
    pub async fn create_instance(&self, workflow: Workflow) -> Result<Workflow, StoreError> {
        let path = self.instance_path(&workflow.id)?;
        if file_exists(&path).await? {
            return Err(StoreError::AlreadyExists(workflow.id));
        }

        workflow
            .check_task_ids()
            .map_err(|message| StoreError::parse(&path, message))?;

        self.save_instance(&workflow).await?;
        tracing::info!(instance_id = %workflow.id, "Created workflow instance");

        Ok(workflow)
    }

    /// List instances, newest first. Malformed files are logged and skipped.
    pub async fn list_instances(&self) -> Result<Vec<InstanceSummary>, StoreError> {
        let mut summaries = Vec::new();

        for path in list_files(&self.instances_dir, &[INSTANCE_EXTENSION]).await? {
            let header = match read_file(&path).await {
                Ok(content) => serde_json::from_str::<InstanceHeader>(&content)
                    .map_err(|e| StoreError::parse(&path, e)),
                Err(e) => Err(e),
            };

            match header {
                Ok(header) => summaries.push(InstanceSummary {
                    id: header.id,
                    name: header.name,
                    status: header.status,
                    error: header.error,
                    created_at: header.created_at,
                    updated_at: header.updated_at,
                    path,
                }),
                Err(e) => {
                    tracing::error!(path = %path.display(), error = %e, "Skipping malformed instance");
                }
            }
        }

        summaries.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(summaries)
    }

    /// Load an instance; `Ok(None)` when no file exists for `id`.
    pub async fn load_instance(&self, id: &str) -> Result<Option<Workflow>, StoreError> {
        let path = self.instance_path(id)?;

        let content = match tokio::fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StoreError::io(&path, e)),
        };

        let workflow = serde_json::from_str(&content).map_err(|e| StoreError::parse(&path, e))?;
        Ok(Some(workflow))
    }

    /// Write an instance file, replacing any previous version.
    pub async fn save_instance(&self, workflow: &Workflow) -> Result<PathBuf, StoreError> {
        let path = self.instance_path(&workflow.id)?;
        let content = serde_json::to_string_pretty(workflow)
            .map_err(|e| StoreError::Serialize(e.to_string()))?;

        // Write then rename so readers never see a half-written file
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content)
            .await
            .map_err(|e| StoreError::io(&tmp, e))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|e| StoreError::io(&path, e))?;

        tracing::debug!(
            instance_id = %workflow.id,
            status = %workflow.status,
            path = %path.display(),
            "Saved workflow instance"
        );

        Ok(path)
    }

    /// Delete an instance; `Ok(false)` when it did not exist.
    pub async fn delete_instance(&self, id: &str) -> Result<bool, StoreError> {
        let path = self.instance_path(id)?;

        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                tracing::info!(instance_id = id, "Deleted workflow instance");
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StoreError::io(&path, e)),
        }
    }
}

/// Check that an id can be used as a file stem.
pub fn validate_id(id: &str) -> Result<(), StoreError> {
    let invalid = id.is_empty()
        || id == "."
        || id == ".."
        || id.contains(['/', '\\', '\0']);

    if invalid {
        return Err(StoreError::InvalidId(id.to_string()));
    }
    Ok(())
}

/// The file stem is a template's id; a differing declared id is logged and dropped.
fn template_id_for(stem: &str, declared_id: String) -> String {
    if declared_id != stem {
        tracing::warn!(
            template_id = stem,
            declared_id = %declared_id,
            "Template id differs from file name, using file name"
        );
    }
    stem.to_string()
}

async fn read_file(path: &Path) -> Result<String, StoreError> {
    tokio::fs::read_to_string(path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

async fn read_template(path: &Path) -> Result<Workflow, StoreError> {
    let content = read_file(path).await?;
    parse_template(&content, path)
}

async fn file_exists(path: &Path) -> Result<bool, StoreError> {
    tokio::fs::try_exists(path)
        .await
        .map_err(|e| StoreError::io(path, e))
}

/// Files in `dir` with one of `extensions`, sorted by path. A missing
/// directory lists as empty.
async fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, StoreError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(dir = %dir.display(), "Directory does not exist");
            return Ok(Vec::new());
        }
        Err(e) => return Err(StoreError::io(dir, e)),
    };

    let mut files = Vec::new();
    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| StoreError::io(dir, e))?
    {
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|ext| extensions.contains(&ext));
        let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
        if matches && is_file {
            files.push(path);
        }
    }

    files.sort();
    Ok(files)
}
