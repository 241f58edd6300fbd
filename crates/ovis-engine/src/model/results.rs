//! Per-run result store.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Mapping from task id to that task's result, in completion order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultStore(Map<String, Value>);

impl ResultStore {
    pub fn new() -> Self {
        Self(Map::new())
    }

    pub fn insert(&mut self, task_id: impl Into<String>, result: Value) {
        self.0.insert(task_id.into(), result);
    }

    pub fn get(&self, task_id: &str) -> Option<&Value> {
        self.0.get(task_id)
    }

    pub fn contains(&self, task_id: &str) -> bool {
        self.0.contains_key(task_id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Task ids in completion order.
    pub fn task_ids(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}
