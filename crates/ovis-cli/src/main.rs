//! Ovis command line tool.
//!
//! Lists and validates workflow templates, manages workflow instances and
//! runs workflows with live progress output. Ctrl-C requests cancellation,
//! which takes effect before the next task starts; a second Ctrl-C exits
//! immediately.

mod output;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use ovis_engine::{
    ChannelObserver, EngineConfig, RunContext, RunOutcome, TracingObserver, Workflow,
    WorkflowEngine, WorkflowManager,
};
use ovis_handlers::create_default_registry;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Exit code for a run stopped by Ctrl-C.
const EXIT_CANCELLED: u8 = 130;

#[derive(Parser)]
#[command(name = "ovis")]
#[command(version, about = "Ovis workflow runner", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Config file (JSON, YAML or TOML); overrides OVIS_CONFIG
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Print machine-readable JSON
    #[arg(long, global = true)]
    json: bool,

    /// Log task events through tracing as well
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List workflow templates
    Templates,

    /// List workflow instances, newest first
    Instances,

    /// List registered handler types
    Handlers,

    /// Check that a template parses and all its handlers are registered
    Validate {
        /// Template id
        template: String,
    },

    /// Create a new instance from a template
    Create {
        /// Template id
        template: String,
    },

    /// Run a template, or an existing instance with --instance
    ///
    /// Examples:
    ///     ovis run daily_news                         # new instance from template
    ///     ovis run --instance daily_news_1a2b3c4d     # re-run an instance
    ///     ovis run daily_news --no-save               # run without persisting
    #[command(verbatim_doc_comment)]
    Run {
        /// Template id, or instance id with --instance
        id: String,

        /// Treat the id as an existing instance
        #[arg(long)]
        instance: bool,

        /// Do not persist the instance
        #[arg(long)]
        no_save: bool,
    },

    /// Show an instance with its task states
    Show {
        /// Instance id
        id: String,
    },

    /// Delete an instance
    Delete {
        /// Instance id
        id: String,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn,ovis_engine=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    tracing::debug!(?config, "Configuration loaded");

    let manager = WorkflowManager::new(&config)
        .await
        .context("Failed to open workflow directories")?;
    let registry = create_default_registry(&config.handler_settings())
        .context("Failed to set up handlers")?;
    let engine = WorkflowEngine::new(Arc::new(registry));

    match cli.command {
        Commands::Templates => {
            let templates = manager.list_templates().await?;
            if cli.json {
                output::print_json(&templates)?;
            } else {
                output::print_templates(&templates);
            }
        }

        Commands::Instances => {
            let instances = manager.list_instances().await?;
            if cli.json {
                output::print_json(&instances)?;
            } else {
                output::print_instances(&instances);
            }
        }

        Commands::Handlers => {
            let handlers = engine.registry().list();
            if cli.json {
                output::print_json(&handlers)?;
            } else {
                for handler in handlers {
                    println!("{}", handler);
                }
            }
        }

        Commands::Validate { template } => {
            let workflow = manager.load_template(&template).await?;
            engine.validate(&workflow)?;
            println!("Template '{}' is valid ({} tasks)", template, workflow.tasks.len());
        }

        Commands::Create { template } => {
            let workflow = manager.create_from_template(&template).await?;
            if cli.json {
                output::print_json(&workflow)?;
            } else {
                println!("{}", workflow.id);
            }
        }

        Commands::Run {
            id,
            instance,
            no_save,
        } => {
            let save = config.auto_save && !no_save;
            let workflow = prepare_run(&engine, &manager, &id, instance, save).await?;

            return run_workflow(&engine, &manager, workflow, save, cli.json, cli.verbose).await;
        }

        Commands::Show { id } => {
            let Some(workflow) = manager.load_instance(&id).await? else {
                bail!("Instance not found: {}", id);
            };
            if cli.json {
                output::print_json(&workflow)?;
            } else {
                output::print_workflow(&workflow);
            }
        }

        Commands::Delete { id } => {
            if !manager.delete_instance(&id).await? {
                bail!("Instance not found: {}", id);
            }
            println!("Deleted {}", id);
        }
    }

    Ok(ExitCode::SUCCESS)
}

/// Load and validate the workflow to run.
///
/// A template only becomes a saved instance once it has passed validation.
async fn prepare_run(
    engine: &WorkflowEngine,
    manager: &WorkflowManager,
    id: &str,
    instance: bool,
    save: bool,
) -> Result<Workflow> {
    let workflow = if instance {
        manager
            .load_instance(id)
            .await?
            .with_context(|| format!("Instance not found: {}", id))?
    } else {
        manager.load_template(id).await?
    };

    engine.validate(&workflow)?;

    if save && !instance {
        return Ok(manager.instantiate(workflow).await?);
    }
    Ok(workflow)
}

/// Response to the n-th Ctrl-C of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Interrupt {
    /// Stop before the next task.
    Cancel,
    /// Leave without waiting for the running task.
    Exit,
}

impl Interrupt {
    fn for_signal(count: usize) -> Self {
        if count <= 1 {
            Self::Cancel
        } else {
            Self::Exit
        }
    }
}

async fn run_workflow(
    engine: &WorkflowEngine,
    manager: &WorkflowManager,
    mut workflow: Workflow,
    save: bool,
    json: bool,
    verbose: bool,
) -> Result<ExitCode> {
    let (observer, mut events) = ChannelObserver::channel();
    let mut ctx = RunContext::new().with_observer(observer);
    if verbose {
        ctx = ctx.with_observer(TracingObserver::new(workflow.id.clone()));
    }

    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            if json {
                if let Ok(line) = serde_json::to_string(&event) {
                    println!("{}", line);
                }
            } else {
                println!("{}", output::format_event(&event));
            }
        }
    });

    let cancel = ctx.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        let mut count = 0;
        while tokio::signal::ctrl_c().await.is_ok() {
            count += 1;
            match Interrupt::for_signal(count) {
                Interrupt::Cancel => {
                    eprintln!(
                        "Cancellation requested, stopping after the current task (Ctrl-C again to exit now)"
                    );
                    cancel.cancel();
                }
                Interrupt::Exit => {
                    eprintln!("Exiting without waiting for the current task");
                    std::process::exit(i32::from(EXIT_CANCELLED));
                }
            }
        }
    });

    let outcome = engine.execute(&mut workflow, &ctx).await;
    ctrl_c.abort();

    // Dropping the context closes the event channel so the printer drains and exits
    drop(ctx);
    if let Err(e) = printer.await {
        tracing::warn!(error = %e, "Progress printer stopped unexpectedly");
    }

    if save {
        let path = manager
            .save_instance(&workflow)
            .await
            .context("Failed to save workflow instance")?;
        tracing::info!(instance_id = %workflow.id, path = %path.display(), "Instance saved");
    }

    if json {
        output::print_json(&serde_json::json!({
            "id": workflow.id,
            "outcome": outcome.label(),
            "error": workflow.error,
            "results": outcome.results(),
        }))?;
    } else {
        output::print_outcome(&workflow, &outcome);
    }

    Ok(match outcome {
        RunOutcome::Completed(_) => ExitCode::SUCCESS,
        RunOutcome::Cancelled(_) => ExitCode::from(EXIT_CANCELLED),
        RunOutcome::Failed { .. } => ExitCode::FAILURE,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run() {
        let cli = Cli::parse_from(["ovis", "run", "--instance", "daily_news_1a2b3c4d", "--json"]);
        assert!(cli.json);
        match cli.command {
            Commands::Run {
                id,
                instance,
                no_save,
            } => {
                assert_eq!(id, "daily_news_1a2b3c4d");
                assert!(instance);
                assert!(!no_save);
            }
            _ => panic!("expected run command"),
        }
    }

    #[test]
    fn test_interrupt_escalates() {
        assert_eq!(Interrupt::for_signal(1), Interrupt::Cancel);
        assert_eq!(Interrupt::for_signal(2), Interrupt::Exit);
        assert_eq!(Interrupt::for_signal(5), Interrupt::Exit);
    }

    async fn workspace() -> (tempfile::TempDir, WorkflowManager, WorkflowEngine) {
        let dir = tempfile::TempDir::new().unwrap();
        let config = EngineConfig {
            workflows_dir: dir.path().to_path_buf(),
            ..EngineConfig::default()
        };
        let manager = WorkflowManager::new(&config).await.unwrap();
        let templates = manager.templates_dir();
        tokio::fs::write(
            templates.join("broken.yaml"),
            "id: broken\nname: Broken\ntasks:\n  - id: search\n    handler: web_search\n",
        )
        .await
        .unwrap();
        tokio::fs::write(
            templates.join("greet.yaml"),
            "id: greet\nname: Greet\ntasks:\n  - id: hello\n    handler: echo\n    parameters:\n      text: hi\n",
        )
        .await
        .unwrap();

        let registry = create_default_registry(&config.handler_settings()).unwrap();
        (dir, manager, WorkflowEngine::new(Arc::new(registry)))
    }

    #[tokio::test]
    async fn test_invalid_template_is_not_persisted() {
        let (_dir, manager, engine) = workspace().await;

        let result = prepare_run(&engine, &manager, "broken", false, true).await;

        assert!(result.is_err());
        assert!(manager.list_instances().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_valid_template_becomes_instance() {
        let (_dir, manager, engine) = workspace().await;

        let workflow = prepare_run(&engine, &manager, "greet", false, true).await.unwrap();
        assert!(workflow.id.starts_with("greet_"));
        assert_eq!(manager.list_instances().await.unwrap().len(), 1);

        let unsaved = prepare_run(&engine, &manager, "greet", false, false).await.unwrap();
        assert_eq!(unsaved.id, "greet");
        assert_eq!(manager.list_instances().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_instance() {
        let (_dir, manager, engine) = workspace().await;
        let err = prepare_run(&engine, &manager, "greet_00000000", true, true)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Instance not found"));
    }

    #[test]
    fn test_parse_global_config() {
        let cli = Cli::parse_from(["ovis", "templates", "--config", "ovis.toml"]);
        assert_eq!(cli.config, Some(PathBuf::from("ovis.toml")));
        assert!(matches!(cli.command, Commands::Templates));
    }
}
