//! Ovis workflow engine.
//!
//! Runs declarative workflows (ordered lists of typed tasks) against a
//! [`HandlerRegistry`](ovis_handlers::HandlerRegistry) and persists workflow
//! templates and run records on disk.
//!
//! ```no_run
//! use std::sync::Arc;
//! use ovis_engine::{EngineConfig, RunContext, WorkflowEngine, WorkflowManager};
//! use ovis_handlers::{create_default_registry, HandlerSettings};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = EngineConfig::load(None)?;
//! let manager = WorkflowManager::new(&config).await?;
//! let registry = create_default_registry(&HandlerSettings::default())?;
//! let engine = WorkflowEngine::new(Arc::new(registry));
//!
//! let mut workflow = manager.create_from_template("daily_news").await?;
//! let outcome = engine.execute(&mut workflow, &RunContext::new()).await;
//! manager.save_instance(&workflow).await?;
//! println!("{}", outcome.label());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod engine;
pub mod error;
pub mod manager;
pub mod model;
pub mod reference;

pub use config::EngineConfig;
pub use engine::{
    CancelHandle, ChannelObserver, RunContext, RunEvent, RunObserver, RunOutcome, TracingObserver,
    WorkflowEngine,
};
pub use error::{ConfigError, EngineError, StoreError};
pub use manager::{InstanceSummary, TemplateSummary, WorkflowManager};
pub use model::{ResultStore, RunStatus, Task, Workflow, CANCELLED_MARKER};
pub use reference::{resolve_parameters, PathSegment, Reference};
