//! Built-in handlers.
//!
//! - `echo` - Return the resolved parameters
//! - `shell` - Execute shell commands
//! - `http` - Make HTTP requests
//! - `prompt` - Render prompt templates from disk

mod echo;
mod http;
mod prompt;
mod shell;

pub use self::echo::EchoHandler;
pub use self::http::{HttpHandler, HttpMethod, HttpParams};
pub use self::prompt::PromptHandler;
pub use self::shell::{ShellHandler, ShellParams};

use std::path::PathBuf;
use std::time::Duration;

use crate::error::HandlerError;
use crate::registry::HandlerRegistry;

/// Settings the built-in handlers are constructed with.
#[derive(Debug, Clone)]
pub struct HandlerSettings {
    /// Root directory of prompt templates.
    pub prompts_dir: PathBuf,

    /// Default timeout for HTTP requests.
    pub http_timeout: Duration,

    /// Limit for shell commands that don't set `timeout_seconds`.
    pub shell_timeout: Option<Duration>,
}

impl Default for HandlerSettings {
    fn default() -> Self {
        Self {
            prompts_dir: PathBuf::from("./config/prompts"),
            http_timeout: Duration::from_secs(30),
            shell_timeout: None,
        }
    }
}

/// Create a handler registry with all built-in handlers registered.
pub fn create_default_registry(settings: &HandlerSettings) -> Result<HandlerRegistry, HandlerError> {
    let mut registry = HandlerRegistry::new();

    let shell = match settings.shell_timeout {
        Some(limit) => ShellHandler::new().with_default_timeout(limit),
        None => ShellHandler::new(),
    };

    registry.register(EchoHandler::HANDLER_TYPE, EchoHandler);
    registry.register(ShellHandler::HANDLER_TYPE, shell);
    registry.register(HttpHandler::HANDLER_TYPE, HttpHandler::new(settings.http_timeout)?);
    registry.register(
        PromptHandler::HANDLER_TYPE,
        PromptHandler::new(settings.prompts_dir.clone()),
    );

    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Handler;

    #[test]
    fn test_default_registry() {
        let registry = create_default_registry(&HandlerSettings::default()).unwrap();
        assert_eq!(registry.list(), vec!["echo", "http", "prompt", "shell"]);
    }

    #[tokio::test]
    async fn test_default_registry_applies_shell_timeout() {
        let settings = HandlerSettings {
            shell_timeout: Some(Duration::from_millis(100)),
            ..HandlerSettings::default()
        };
        let registry = create_default_registry(&settings).unwrap();
        let shell = registry.get(ShellHandler::HANDLER_TYPE).unwrap();

        let mut params = crate::params::Parameters::new();
        params.insert("command".to_string(), serde_json::json!("sleep 10"));
        let err = shell.execute(params).await.unwrap_err();

        assert!(matches!(err, HandlerError::Timeout(limit) if limit == Duration::from_millis(100)));
    }
}
