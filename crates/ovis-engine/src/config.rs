//! Engine configuration.
//!
//! Values are layered: built-in defaults, then an optional config file
//! (JSON, YAML or TOML), then environment variables prefixed with `OVIS_`:
//! - `OVIS_CONFIG`: Path of the config file
//! - `OVIS_WORKFLOWS_DIR`: Base directory for workflow files (default: "./config/workflows")
//! - `OVIS_TEMPLATES_DIR`: Template directory (default: "<workflows_dir>/templates")
//! - `OVIS_INSTANCES_DIR`: Instance directory (default: "<workflows_dir>/instances")
//! - `OVIS_PROMPTS_DIR`: Prompt template directory (default: "./config/prompts")
//! - `OVIS_AUTO_SAVE`: Persist instances after a run (default: true)
//! - `OVIS_HTTP_TIMEOUT_SECS`: Default HTTP handler timeout (default: 30)
//! - `OVIS_SHELL_TIMEOUT_SECS`: Default shell command timeout (default: none)

use ovis_handlers::HandlerSettings;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::ConfigError;

/// Environment variable naming the config file.
pub const CONFIG_ENV_VAR: &str = "OVIS_CONFIG";

const ENV_PREFIX: &str = "OVIS_";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Base directory for workflow files
    pub workflows_dir: PathBuf,

    /// Template directory; derived from `workflows_dir` when unset
    pub templates_dir: Option<PathBuf>,

    /// Instance directory; derived from `workflows_dir` when unset
    pub instances_dir: Option<PathBuf>,

    /// Prompt template directory
    pub prompts_dir: PathBuf,

    /// Persist instances after a run
    pub auto_save: bool,

    /// Default HTTP handler timeout in seconds
    pub http_timeout_secs: u64,

    /// Default shell command timeout in seconds; unlimited when unset
    pub shell_timeout_secs: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            workflows_dir: PathBuf::from("./config/workflows"),
            templates_dir: None,
            instances_dir: None,
            prompts_dir: PathBuf::from("./config/prompts"),
            auto_save: true,
            http_timeout_secs: 30,
            shell_timeout_secs: None,
        }
    }
}

/// Environment overrides; every field is optional.
#[derive(Debug, Default, Deserialize)]
struct EnvOverrides {
    workflows_dir: Option<PathBuf>,
    templates_dir: Option<PathBuf>,
    instances_dir: Option<PathBuf>,
    prompts_dir: Option<PathBuf>,
    auto_save: Option<bool>,
    http_timeout_secs: Option<u64>,
    shell_timeout_secs: Option<u64>,
    config: Option<PathBuf>,
}

impl EngineConfig {
    /// Load configuration from the process environment.
    ///
    /// `config_path` takes precedence over `OVIS_CONFIG`.
    pub fn load(config_path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_from(config_path, std::env::vars())
    }

    /// Load configuration from an explicit set of environment variables.
    pub fn load_from<I>(config_path: Option<&Path>, vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let overrides: EnvOverrides = envy::prefixed(ENV_PREFIX).from_iter(vars)?;

        let file = config_path.map(Path::to_path_buf).or(overrides.config.clone());
        let mut config = match file {
            Some(path) => {
                tracing::debug!(path = %path.display(), "Loading config file");
                Self::from_file(&path)?
            }
            None => Self::default(),
        };

        config.apply_overrides(overrides);
        Ok(config)
    }

    /// Parse a config file, picking the format from its extension.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let parse_error = |message: String| ConfigError::Parse {
            path: path.to_path_buf(),
            message,
        };

        let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        match extension {
            "toml" => toml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            "json" => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string())),
            "yaml" | "yml" => serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string())),
            _ => {
                if content.trim().starts_with('{') {
                    serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))
                } else if content.contains(": ") {
                    serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))
                } else {
                    toml::from_str(&content).map_err(|e| parse_error(e.to_string()))
                }
            }
        }
    }

    fn apply_overrides(&mut self, overrides: EnvOverrides) {
        if let Some(dir) = overrides.workflows_dir {
            self.workflows_dir = dir;
        }
        if let Some(dir) = overrides.templates_dir {
            self.templates_dir = Some(dir);
        }
        if let Some(dir) = overrides.instances_dir {
            self.instances_dir = Some(dir);
        }
        if let Some(dir) = overrides.prompts_dir {
            self.prompts_dir = dir;
        }
        if let Some(auto_save) = overrides.auto_save {
            self.auto_save = auto_save;
        }
        if let Some(secs) = overrides.http_timeout_secs {
            self.http_timeout_secs = secs;
        }
        if let Some(secs) = overrides.shell_timeout_secs {
            self.shell_timeout_secs = Some(secs);
        }
    }

    /// Effective template directory.
    pub fn templates_dir(&self) -> PathBuf {
        self.templates_dir
            .clone()
            .unwrap_or_else(|| self.workflows_dir.join("templates"))
    }

    /// Effective instance directory.
    pub fn instances_dir(&self) -> PathBuf {
        self.instances_dir
            .clone()
            .unwrap_or_else(|| self.workflows_dir.join("instances"))
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    /// Settings for the built-in handlers.
    pub fn handler_settings(&self) -> HandlerSettings {
        HandlerSettings {
            prompts_dir: self.prompts_dir.clone(),
            http_timeout: self.http_timeout(),
            shell_timeout: self.shell_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert_eq!(config.workflows_dir, PathBuf::from("./config/workflows"));
        assert_eq!(
            config.templates_dir(),
            PathBuf::from("./config/workflows/templates")
        );
        assert_eq!(
            config.instances_dir(),
            PathBuf::from("./config/workflows/instances")
        );
        assert!(config.auto_save);
        assert_eq!(config.http_timeout(), Duration::from_secs(30));
        assert_eq!(config.handler_settings().prompts_dir, PathBuf::from("./config/prompts"));
        assert!(config.handler_settings().shell_timeout.is_none());
    }

    #[test]
    fn test_shell_timeout_reaches_handler_settings() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ovis.toml");
        std::fs::write(&path, "shell_timeout_secs = 120\n").unwrap();

        let config = EngineConfig::load_from(Some(&path), Vec::new()).unwrap();
        assert_eq!(
            config.handler_settings().shell_timeout,
            Some(Duration::from_secs(120))
        );

        let config =
            EngineConfig::load_from(Some(&path), vars(&[("OVIS_SHELL_TIMEOUT_SECS", "7")])).unwrap();
        assert_eq!(config.shell_timeout_secs, Some(7));
        assert_eq!(
            config.handler_settings().shell_timeout,
            Some(Duration::from_secs(7))
        );
    }

    #[test]
    fn test_env_overrides() {
        let config = EngineConfig::load_from(
            None,
            vars(&[
                ("OVIS_WORKFLOWS_DIR", "/srv/ovis"),
                ("OVIS_AUTO_SAVE", "false"),
                ("OVIS_HTTP_TIMEOUT_SECS", "5"),
                ("UNRELATED", "ignored"),
            ]),
        )
        .unwrap();

        assert_eq!(config.templates_dir(), PathBuf::from("/srv/ovis/templates"));
        assert!(!config.auto_save);
        assert_eq!(config.http_timeout_secs, 5);
    }

    #[test]
    fn test_invalid_env_value() {
        let result = EngineConfig::load_from(None, vars(&[("OVIS_HTTP_TIMEOUT_SECS", "soon")]));
        assert!(matches!(result, Err(ConfigError::Env(_))));
    }

    #[test]
    fn test_file_then_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ovis.yaml");
        std::fs::write(
            &path,
            "workflows_dir: /data/workflows\ninstances_dir: /data/runs\nhttp_timeout_secs: 60\n",
        )
        .unwrap();

        let config = EngineConfig::load_from(
            None,
            vars(&[
                ("OVIS_CONFIG", path.to_str().unwrap()),
                ("OVIS_HTTP_TIMEOUT_SECS", "10"),
            ]),
        )
        .unwrap();

        assert_eq!(config.templates_dir(), PathBuf::from("/data/workflows/templates"));
        assert_eq!(config.instances_dir(), PathBuf::from("/data/runs"));
        assert_eq!(config.http_timeout_secs, 10);
        assert!(config.auto_save);
    }

    #[test]
    fn test_toml_and_json_files() {
        let dir = TempDir::new().unwrap();

        let toml_path = dir.path().join("ovis.toml");
        std::fs::write(&toml_path, "prompts_dir = \"/data/prompts\"\nauto_save = false\n").unwrap();
        let config = EngineConfig::from_file(&toml_path).unwrap();
        assert_eq!(config.prompts_dir, PathBuf::from("/data/prompts"));
        assert!(!config.auto_save);

        let json_path = dir.path().join("ovis.json");
        std::fs::write(&json_path, r#"{"http_timeout_secs": 3}"#).unwrap();
        let config = EngineConfig::load_from(Some(&json_path), Vec::new()).unwrap();
        assert_eq!(config.http_timeout_secs, 3);
    }

    #[test]
    fn test_missing_file() {
        let result = EngineConfig::from_file(Path::new("/nonexistent/ovis.yaml"));
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
