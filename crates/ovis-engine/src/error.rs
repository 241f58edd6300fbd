//! Error types for the Ovis workflow engine.
//!
//! Cancellation is deliberately absent here: a cancelled run is reported as
//! [`RunOutcome::Cancelled`](crate::engine::RunOutcome::Cancelled).

use std::path::PathBuf;
use thiserror::Error;

/// Run-level errors raised by the workflow engine.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A task names a handler type that is not registered.
    #[error("Configuration error: no handler registered for type '{handler_type}' (task '{task_id}')")]
    Configuration { handler_type: String, task_id: String },

    /// A handler failed while executing a task.
    #[error("Task '{task_id}' failed: {message}")]
    TaskExecution { task_id: String, message: String },

    /// Persistence error
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Pre-run validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl EngineError {
    /// Message recorded on the failing task and on the workflow.
    pub fn task_message(&self) -> String {
        match self {
            Self::TaskExecution { message, .. } => message.clone(),
            Self::Configuration { handler_type, .. } => {
                format!("No handler registered for type '{}'", handler_type)
            }
            other => other.to_string(),
        }
    }
}

/// Errors from the template and instance file store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Template not found
    #[error("Template not found: {0}")]
    NotFound(String),

    /// File system error
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed template or instance file
    #[error("Parse error in {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialize(String),

    /// Id unusable as a file name
    #[error("Invalid id: '{0}'")]
    InvalidId(String),

    /// Instance id already taken
    #[error("Instance already exists: {0}")]
    AlreadyExists(String),
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Configuration loading errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Config file could not be read
    #[error("Failed to read config file {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("Failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Environment override could not be parsed
    #[error("Invalid environment configuration: {0}")]
    Env(#[from] envy::Error),
}
