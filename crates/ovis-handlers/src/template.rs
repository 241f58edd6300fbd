//! Prompt template rendering using minijinja.

use minijinja::{Environment, UndefinedBehavior, Value};

use crate::error::HandlerError;
use crate::params::Parameters;

/// Template engine with Jinja2-compatible syntax.
///
/// Undefined variables are an error, so a prompt never silently renders
/// with a hole in it.
pub struct TemplateEngine {
    env: Environment<'static>,
}

impl TemplateEngine {
    /// Create a new template engine with custom filters.
    pub fn new() -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);

        env.add_filter("tojson", filter_tojson);
        env.add_filter("bullets", filter_bullets);
        env.add_filter("truncate_chars", filter_truncate_chars);

        Self { env }
    }

    /// Render a template string with the given context.
    pub fn render(&self, template: &str, context: &Parameters) -> Result<String, HandlerError> {
        let tmpl = self.env.template_from_str(template)?;
        let ctx = Value::from_serialize(context);

        tmpl.render(ctx).map_err(|e| HandlerError::Template(e.to_string()))
    }
}

impl Default for TemplateEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn filter_tojson(value: Value) -> Result<String, minijinja::Error> {
    serde_json::to_string_pretty(&value)
        .map_err(|e| minijinja::Error::new(minijinja::ErrorKind::InvalidOperation, e.to_string()))
}

// One "- item" line per element; scalars render as a single line.
fn filter_bullets(value: Value) -> Result<String, minijinja::Error> {
    match value.len() {
        Some(len) if value.kind() == minijinja::value::ValueKind::Seq => {
            let lines: Vec<String> = (0..len)
                .filter_map(|i| value.get_item(&Value::from(i)).ok())
                .map(|v| format!("- {}", v))
                .collect();
            Ok(lines.join("\n"))
        }
        _ => Ok(format!("- {}", value)),
    }
}

fn filter_truncate_chars(value: Value, max: usize) -> String {
    let text = value.to_string();
    if text.chars().count() <= max {
        text
    } else {
        let mut truncated: String = text.chars().take(max).collect();
        truncated.push_str("...");
        truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ctx(value: serde_json::Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_simple_template() {
        let engine = TemplateEngine::new();
        let result = engine
            .render("Summarize: {{ topic }}", &ctx(json!({"topic": "rust"})))
            .unwrap();
        assert_eq!(result, "Summarize: rust");
    }

    #[test]
    fn test_undefined_is_error() {
        let engine = TemplateEngine::new();
        let result = engine.render("Hello {{ missing }}", &Parameters::new());
        assert!(matches!(result, Err(HandlerError::Template(_))));
    }

    #[test]
    fn test_nested_object() {
        let engine = TemplateEngine::new();
        let result = engine
            .render(
                "{{ input.title }} ({{ input.items | length }})",
                &ctx(json!({"input": {"title": "News", "items": [1, 2, 3]}})),
            )
            .unwrap();
        assert_eq!(result, "News (3)");
    }

    #[test]
    fn test_filter_bullets() {
        let engine = TemplateEngine::new();
        let result = engine
            .render("{{ items | bullets }}", &ctx(json!({"items": ["a", "b"]})))
            .unwrap();
        assert_eq!(result, "- a\n- b");
    }

    #[test]
    fn test_filter_truncate_chars() {
        let engine = TemplateEngine::new();
        let result = engine
            .render("{{ text | truncate_chars(5) }}", &ctx(json!({"text": "hello world"})))
            .unwrap();
        assert_eq!(result, "hello...");
    }

    #[test]
    fn test_filter_tojson() {
        let engine = TemplateEngine::new();
        let result = engine
            .render("{{ data | tojson }}", &ctx(json!({"data": {"key": "value"}})))
            .unwrap();
        assert!(result.contains("\"key\"") && result.contains("\"value\""));
    }
}
