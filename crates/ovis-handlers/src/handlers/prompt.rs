//! Prompt rendering handler.
//!
//! Prompt templates live on disk as `<prompts_dir>/<category>/<name>.txt`
//! and are addressed as `category/name`. Rendering uses the task's other
//! parameters as template variables, so reference expressions resolved by
//! the engine flow straight into the prompt.

use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

use crate::error::HandlerError;
use crate::params::{ParamsExt, Parameters};
use crate::registry::Handler;
use crate::template::TemplateEngine;

const TEMPLATE_PARAM: &str = "template";
const REQUIRED_PARAM: &str = "required";
const INPUTS_PARAM: &str = "inputs";
const PREVIOUS_RESULT_PARAMS: [&str; 2] = ["previousResult", "previous_result"];

/// Renders a prompt template and returns `{template, prompt}`.
pub struct PromptHandler {
    prompts_dir: PathBuf,
    engine: TemplateEngine,
}

impl PromptHandler {
    pub const HANDLER_TYPE: &'static str = "prompt";

    pub fn new(prompts_dir: impl Into<PathBuf>) -> Self {
        Self {
            prompts_dir: prompts_dir.into(),
            engine: TemplateEngine::new(),
        }
    }

    /// Resolve `category/name` to a template file under the prompts dir.
    pub fn template_path(&self, name: &str) -> Result<PathBuf, HandlerError> {
        let relative = Path::new(name);
        let is_plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !is_plain {
            return Err(HandlerError::InvalidParameter {
                name: TEMPLATE_PARAM.to_string(),
                reason: format!("'{}' is not a valid template name", name),
            });
        }

        Ok(self.prompts_dir.join(relative).with_extension("txt"))
    }

    /// Load the raw text of a prompt template.
    pub async fn load(&self, name: &str) -> Result<String, HandlerError> {
        let path = self.template_path(name)?;
        tokio::fs::read_to_string(&path).await.map_err(|e| {
            HandlerError::Template(format!(
                "Prompt template '{}' could not be read from {}: {}",
                name,
                path.display(),
                e
            ))
        })
    }

    /// Build the variable set a prompt is rendered with.
    fn render_context(params: &Parameters) -> Parameters {
        let mut ctx = Parameters::new();

        for (key, value) in params {
            match key.as_str() {
                TEMPLATE_PARAM | REQUIRED_PARAM => {}
                INPUTS_PARAM => {
                    if let Value::Object(inputs) = value {
                        for (k, v) in inputs {
                            ctx.insert(k.clone(), v.clone());
                        }
                    }
                }
                _ => {
                    ctx.insert(key.clone(), value.clone());
                }
            }
        }

        // The prior task's full result is exposed as `input`
        if !ctx.contains_key("input") {
            if let Some(previous) = PREVIOUS_RESULT_PARAMS.iter().find_map(|k| params.get(*k)) {
                ctx.insert("input".to_string(), previous.clone());
            }
        }

        ctx
    }
}

#[async_trait]
impl Handler for PromptHandler {
    async fn execute(&self, params: Parameters) -> Result<Value, HandlerError> {
        let name = params.require_str(TEMPLATE_PARAM)?;
        let ctx = Self::render_context(&params);

        if let Some(Value::Array(required)) = params.get(REQUIRED_PARAM) {
            for var in required.iter().filter_map(|v| v.as_str()) {
                if ctx.get(var).map_or(true, Value::is_null) {
                    return Err(HandlerError::InvalidParameter {
                        name: var.to_string(),
                        reason: format!("prompt '{}' requires this variable", name),
                    });
                }
            }
        }

        let source = self.load(&name).await?;
        let prompt = self.engine.render(&source, &ctx)?;

        tracing::debug!(template = %name, chars = prompt.len(), "Rendered prompt");

        Ok(json!({
            "template": name,
            "prompt": prompt,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    fn prompts_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        let category = dir.path().join("news");
        std::fs::create_dir_all(&category).unwrap();
        std::fs::write(
            category.join("summarize.txt"),
            "Summarize about {{ topic }}:\n{{ input.items | bullets }}",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_prompt_render() {
        let dir = prompts_dir();
        let handler = PromptHandler::new(dir.path());

        let result = handler
            .execute(params(json!({
                "template": "news/summarize",
                "inputs": {"topic": "rust"},
                "previous_result": {"items": ["a", "b"]}
            })))
            .await
            .unwrap();

        assert_eq!(result["template"], json!("news/summarize"));
        assert_eq!(result["prompt"], json!("Summarize about rust:\n- a\n- b"));
    }

    #[tokio::test]
    async fn test_prompt_top_level_params_are_variables() {
        let dir = prompts_dir();
        let handler = PromptHandler::new(dir.path());

        let result = handler
            .execute(params(json!({
                "template": "news/summarize",
                "topic": "tokio",
                "input": {"items": ["x"]}
            })))
            .await
            .unwrap();

        assert_eq!(result["prompt"], json!("Summarize about tokio:\n- x"));
    }

    #[tokio::test]
    async fn test_prompt_required_variable_missing() {
        let dir = prompts_dir();
        let handler = PromptHandler::new(dir.path());

        let err = handler
            .execute(params(json!({
                "template": "news/summarize",
                "required": ["topic"],
                "topic": null
            })))
            .await
            .unwrap_err();

        assert!(matches!(err, HandlerError::InvalidParameter { ref name, .. } if name == "topic"));
    }

    #[tokio::test]
    async fn test_prompt_missing_template() {
        let dir = prompts_dir();
        let handler = PromptHandler::new(dir.path());

        let err = handler
            .execute(params(json!({"template": "news/absent"})))
            .await
            .unwrap_err();
        assert!(matches!(err, HandlerError::Template(_)));
    }

    #[test]
    fn test_template_path_rejects_traversal() {
        let handler = PromptHandler::new("/prompts");

        assert!(handler.template_path("../secrets").is_err());
        assert!(handler.template_path("/etc/passwd").is_err());
        assert!(handler.template_path("").is_err());
        assert_eq!(
            handler.template_path("news/summarize").unwrap(),
            PathBuf::from("/prompts/news/summarize.txt")
        );
    }
}
