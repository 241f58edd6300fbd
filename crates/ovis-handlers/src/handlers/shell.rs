//! Shell command handler.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::AsyncReadExt;
use tokio::process::Command;
use tokio::time::timeout;

use crate::error::HandlerError;
use crate::params::Parameters;
use crate::registry::Handler;

/// Shell handler parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ShellParams {
    /// Command to execute.
    pub command: String,

    /// Shell to use (default: "bash").
    #[serde(default = "default_shell")]
    pub shell: String,

    /// Working directory.
    #[serde(default)]
    pub cwd: Option<String>,

    /// Environment variables.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

fn default_shell() -> String {
    "bash".to_string()
}

/// Runs a shell command and returns `{exit_code, stdout, stderr}`.
///
/// A non-zero exit code fails the task.
pub struct ShellHandler {
    default_timeout: Option<Duration>,
}

impl ShellHandler {
    pub const HANDLER_TYPE: &'static str = "shell";

    pub fn new() -> Self {
        Self {
            default_timeout: None,
        }
    }

    /// Apply a timeout to commands that don't set their own.
    pub fn with_default_timeout(mut self, duration: Duration) -> Self {
        self.default_timeout = Some(duration);
        self
    }

    /// Execute a shell command directly.
    pub async fn run(&self, params: &ShellParams) -> Result<Value, HandlerError> {
        let start = std::time::Instant::now();

        let mut cmd = Command::new(&params.shell);
        cmd.arg("-c").arg(&params.command);
        if let Some(ref dir) = params.cwd {
            cmd.current_dir(dir);
        }
        for (k, v) in &params.env {
            cmd.env(k, v);
        }
        cmd.stdout(std::process::Stdio::piped());
        cmd.stderr(std::process::Stdio::piped());
        cmd.kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .map_err(|e| HandlerError::Process(format!("Failed to spawn process: {}", e)))?;

        let stdout = child.stdout.take();
        let stderr = child.stderr.take();

        // Drain both pipes concurrently so a chatty process can't block on a full pipe
        let stdout_handle = tokio::spawn(read_pipe(stdout));
        let stderr_handle = tokio::spawn(read_pipe(stderr));

        let limit = params
            .timeout_seconds
            .map(Duration::from_secs)
            .or(self.default_timeout);

        let wait_result = match limit {
            Some(duration) => match timeout(duration, child.wait()).await {
                Ok(result) => result,
                Err(_) => {
                    let _ = child.kill().await;
                    return Err(HandlerError::Timeout(duration));
                }
            },
            None => child.wait().await,
        };

        let status = wait_result
            .map_err(|e| HandlerError::Process(format!("Failed to wait for process: {}", e)))?;

        let exit_code = status.code().unwrap_or(-1);
        let stdout = stdout_handle.await.unwrap_or_default();
        let stderr = stderr_handle.await.unwrap_or_default();

        tracing::debug!(
            exit_code,
            duration_ms = start.elapsed().as_millis() as u64,
            "Shell command finished"
        );

        if exit_code != 0 {
            return Err(HandlerError::ExecutionFailed(format!(
                "Command exited with code {}: {}",
                exit_code,
                stderr.trim()
            )));
        }

        Ok(json!({
            "exit_code": exit_code,
            "stdout": stdout,
            "stderr": stderr,
        }))
    }
}

async fn read_pipe<R>(pipe: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut output = String::new();
    if let Some(mut pipe) = pipe {
        let _ = pipe.read_to_string(&mut output).await;
    }
    output
}

impl Default for ShellHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Handler for ShellHandler {
    async fn execute(&self, params: Parameters) -> Result<Value, HandlerError> {
        let shell_params: ShellParams = serde_json::from_value(Value::Object(params))
            .map_err(|e| HandlerError::InvalidParameter {
                name: "command".to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            command = %shell_params.command,
            shell = %shell_params.shell,
            cwd = ?shell_params.cwd,
            "Executing shell command"
        );

        self.run(&shell_params).await
    }
}
