//! Resolved parameter mapping handed to handlers.

use serde_json::Value;

use crate::error::HandlerError;

/// Ordered name -> value mapping a handler is invoked with.
///
/// By the time a handler sees it, every reference expression has been
/// resolved against prior task results.
pub type Parameters = serde_json::Map<String, Value>;

/// Typed accessors over [`Parameters`].
pub trait ParamsExt {
    /// Get a parameter rendered as a string.
    ///
    /// Strings are returned as-is, numbers and booleans are formatted,
    /// anything else is serialized as JSON. `null` counts as absent.
    fn get_str(&self, name: &str) -> Option<String>;

    /// Like [`ParamsExt::get_str`] but fails when the parameter is absent.
    fn require_str(&self, name: &str) -> Result<String, HandlerError>;
}

/// Render a JSON value the way handlers expect to see it in text.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        other => other.to_string(),
    }
}

impl ParamsExt for Parameters {
    fn get_str(&self, name: &str) -> Option<String> {
        match self.get(name) {
            None | Some(Value::Null) => None,
            Some(v) => Some(value_to_string(v)),
        }
    }

    fn require_str(&self, name: &str) -> Result<String, HandlerError> {
        self.get_str(name).ok_or_else(|| HandlerError::missing(name))
    }
}
