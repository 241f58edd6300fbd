//! Reference expressions and parameter resolution.
//!
//! A parameter value of the form `$taskId[.segment...]` refers to the result
//! of an earlier task in the same run. Resolution is deliberately lenient:
//!
//! - an unknown task id leaves the original string untouched,
//! - a path that cannot be walked yields `null`,
//! - anything that is not a `$`-prefixed string passes through unchanged.
//!
//! The special keys `previousResult` / `previous_result` take a bare task id
//! (with or without `$`) and are replaced by that task's entire result, or
//! dropped when the task has no result.

use ovis_handlers::Parameters;
use serde_json::Value;

use crate::model::ResultStore;

/// Parameter keys that receive a prior task's whole result.
pub const PREVIOUS_RESULT_KEYS: [&str; 2] = ["previousResult", "previous_result"];

const REFERENCE_PREFIX: char = '$';

/// One step of a reference path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    /// Canonical non-negative decimal (`0`, `12`; never `012` or `+1`).
    Index(usize),
    Key(String),
}

impl PathSegment {
    fn parse(segment: &str) -> Self {
        let canonical = !segment.is_empty()
            && segment.bytes().all(|b| b.is_ascii_digit())
            && (segment == "0" || !segment.starts_with('0'));

        match segment.parse::<usize>() {
            Ok(index) if canonical => Self::Index(index),
            _ => Self::Key(segment.to_string()),
        }
    }

    /// Descend one level; `None` when the step cannot be taken.
    fn step<'a>(&self, value: &'a Value) -> Option<&'a Value> {
        match (self, value) {
            (Self::Index(i), Value::Array(items)) => items.get(*i),
            (Self::Index(i), Value::Object(map)) => map.get(&i.to_string()),
            (Self::Key(key), Value::Object(map)) => map.get(key),
            _ => None,
        }
    }
}

impl std::fmt::Display for PathSegment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Index(i) => write!(f, "{}", i),
            Self::Key(k) => write!(f, "{}", k),
        }
    }
}

/// A parsed `$taskId.path` expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    task_id: String,
    path: Vec<PathSegment>,
}

impl Reference {
    /// Parse a reference; `None` unless the string starts with `$`.
    pub fn parse(raw: &str) -> Option<Self> {
        let body = raw.strip_prefix(REFERENCE_PREFIX)?;
        let mut parts = body.split('.');
        let task_id = parts.next().unwrap_or_default().to_string();
        let path = parts.map(PathSegment::parse).collect();

        Some(Self { task_id, path })
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn path(&self) -> &[PathSegment] {
        &self.path
    }

    /// Evaluate against prior results.
    ///
    /// Returns `None` when the task id has no result, otherwise the walked
    /// value, which is `Null` as soon as a segment cannot be followed.
    pub fn evaluate(&self, results: &ResultStore) -> Option<Value> {
        let mut current = results.get(&self.task_id)?;

        for segment in &self.path {
            match segment.step(current) {
                Some(next) => current = next,
                None => {
                    tracing::debug!(
                        reference = %self,
                        segment = %segment,
                        "Reference path not found, resolving to null"
                    );
                    return Some(Value::Null);
                }
            }
        }

        Some(current.clone())
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{}", REFERENCE_PREFIX, self.task_id)?;
        for segment in &self.path {
            write!(f, ".{}", segment)?;
        }
        Ok(())
    }
}

/// Resolve one parameter value against prior results.
pub fn resolve_value(value: &Value, results: &ResultStore) -> Value {
    let Some(reference) = value.as_str().and_then(Reference::parse) else {
        return value.clone();
    };

    match reference.evaluate(results) {
        Some(resolved) => resolved,
        None => {
            tracing::debug!(
                reference = %reference,
                "Unknown task in reference, keeping literal"
            );
            value.clone()
        }
    }
}

/// Resolve a task's raw parameters against the results of earlier tasks.
pub fn resolve_parameters(raw: &Parameters, results: &ResultStore) -> Parameters {
    let mut resolved = Parameters::new();

    for (key, value) in raw {
        if PREVIOUS_RESULT_KEYS.contains(&key.as_str()) {
            if let Some(previous) = resolve_previous_result(value, results) {
                resolved.insert(key.clone(), previous);
            }
            continue;
        }

        resolved.insert(key.clone(), resolve_value(value, results));
    }

    resolved
}

// The whole remainder after `$` is the task id; no path is walked.
fn resolve_previous_result(value: &Value, results: &ResultStore) -> Option<Value> {
    let raw = value.as_str().filter(|s| !s.is_empty())?;
    let task_id = raw.strip_prefix(REFERENCE_PREFIX).unwrap_or(raw);

    let result = results.get(task_id).cloned();
    if result.is_none() {
        tracing::debug!(task_id, "No prior result for previous result key, omitting");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn results() -> ResultStore {
        let mut store = ResultStore::new();
        store.insert("t1", json!({"text": "hello"}));
        store.insert(
            "search",
            json!({"items": [{"title": "first"}, {"title": "second"}], "1": "by key"}),
        );
        store
    }

    fn params(value: Value) -> Parameters {
        value.as_object().cloned().unwrap_or_default()
    }

    #[test]
    fn test_parse_reference() {
        let reference = Reference::parse("$search.items.0.title").unwrap();
        assert_eq!(reference.task_id(), "search");
        assert_eq!(
            reference.path(),
            &[
                PathSegment::Key("items".to_string()),
                PathSegment::Index(0),
                PathSegment::Key("title".to_string()),
            ]
        );
        assert_eq!(reference.to_string(), "$search.items.0.title");

        assert!(Reference::parse("search.items").is_none());
        assert_eq!(Reference::parse("$t1").unwrap().path(), &[]);
    }

    #[test]
    fn test_non_canonical_index_is_key() {
        assert_eq!(PathSegment::parse("0"), PathSegment::Index(0));
        assert_eq!(PathSegment::parse("12"), PathSegment::Index(12));
        assert_eq!(PathSegment::parse("01"), PathSegment::Key("01".to_string()));
        assert_eq!(PathSegment::parse("+1"), PathSegment::Key("+1".to_string()));
        assert_eq!(PathSegment::parse("-1"), PathSegment::Key("-1".to_string()));
        assert_eq!(PathSegment::parse(""), PathSegment::Key(String::new()));
    }

    #[test]
    fn test_resolve_basic_cases() {
        let store = results();
        assert_eq!(resolve_value(&json!("$t1.text"), &store), json!("hello"));
        assert_eq!(resolve_value(&json!("$t1.missing"), &store), Value::Null);
        assert_eq!(
            resolve_value(&json!("$unknown.text"), &store),
            json!("$unknown.text")
        );
        assert_eq!(resolve_value(&json!("$t1"), &store), json!({"text": "hello"}));
    }

    #[test]
    fn test_resolve_sequences() {
        let store = results();
        assert_eq!(
            resolve_value(&json!("$search.items.1.title"), &store),
            json!("second")
        );
        assert_eq!(resolve_value(&json!("$search.items.5.title"), &store), Value::Null);
        assert_eq!(resolve_value(&json!("$search.items.01"), &store), Value::Null);
        // Numeric segment on a mapping looks up the decimal key
        assert_eq!(resolve_value(&json!("$search.1"), &store), json!("by key"));
    }

    #[test]
    fn test_null_stops_walk() {
        let store = results();
        assert_eq!(resolve_value(&json!("$t1.text.deeper.still"), &store), Value::Null);
        assert_eq!(resolve_value(&json!("$t1.missing.text"), &store), Value::Null);
    }

    #[test]
    fn test_non_references_pass_through() {
        let store = results();
        for value in [json!(42), json!(true), json!(null), json!(["$t1"]), json!("plain $t1")] {
            assert_eq!(resolve_value(&value, &store), value);
        }
        // Nested values are not resolved
        assert_eq!(
            resolve_value(&json!({"text": "$t1.text"}), &store),
            json!({"text": "$t1.text"})
        );
    }

    #[test]
    fn test_previous_result() {
        let store = results();
        let resolved = resolve_parameters(
            &params(json!({"previousResult": "$t1", "mode": "short"})),
            &store,
        );
        assert_eq!(resolved.get("previousResult"), Some(&json!({"text": "hello"})));
        assert_eq!(resolved.get("mode"), Some(&json!("short")));

        // Bare id and snake_case spelling
        let resolved = resolve_parameters(&params(json!({"previous_result": "t1"})), &store);
        assert_eq!(resolved.get("previous_result"), Some(&json!({"text": "hello"})));
    }

    #[test]
    fn test_previous_result_omitted() {
        let store = results();
        for raw in [
            json!({"previousResult": "$nope"}),
            json!({"previousResult": ""}),
            json!({"previousResult": null}),
            json!({"previousResult": "$t1.text"}),
            json!({"previous_result": 7}),
        ] {
            let resolved = resolve_parameters(&params(raw.clone()), &store);
            assert!(resolved.is_empty(), "expected omission for {raw}");
        }
    }

    #[test]
    fn test_resolve_parameters_keeps_order() {
        let store = results();
        let resolved = resolve_parameters(
            &params(json!({"z": "$t1.text", "a": 1, "m": "$missing"})),
            &store,
        );
        let keys: Vec<&str> = resolved.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
        assert_eq!(resolved["z"], json!("hello"));
        assert_eq!(resolved["m"], json!("$missing"));
    }
}
