//! Handler contract and registry.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use crate::error::HandlerError;
use crate::params::Parameters;

/// Executable unit bound to a handler type.
///
/// A handler receives the fully resolved parameter mapping of one task and
/// produces a JSON result, which becomes visible to later tasks.
#[async_trait]
pub trait Handler: Send + Sync {
    /// Execute the handler with resolved parameters.
    async fn execute(&self, params: Parameters) -> Result<Value, HandlerError>;
}

/// Adapter turning an async closure into a [`Handler`].
pub struct FnHandler<F> {
    func: F,
}

impl<F> FnHandler<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, Fut> Handler for FnHandler<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    async fn execute(&self, params: Parameters) -> Result<Value, HandlerError> {
        (self.func)(params).await
    }
}

/// Wrap an async closure as a handler.
pub fn handler_fn<F, Fut>(func: F) -> FnHandler<F>
where
    F: Fn(Parameters) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Value, HandlerError>> + Send + 'static,
{
    FnHandler::new(func)
}

/// Registry mapping handler types to handlers.
///
/// Holds at most one handler per type. Registering a type twice replaces
/// the previous handler without error.
pub struct HandlerRegistry {
    handlers: HashMap<String, Arc<dyn Handler>>,
}

impl HandlerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler under `handler_type`, replacing any previous one.
    pub fn register<H: Handler + 'static>(&mut self, handler_type: impl Into<String>, handler: H) {
        self.register_arc(handler_type, Arc::new(handler));
    }

    /// Register an already shared handler.
    pub fn register_arc(&mut self, handler_type: impl Into<String>, handler: Arc<dyn Handler>) {
        let handler_type = handler_type.into();
        if self.handlers.insert(handler_type.clone(), handler).is_some() {
            tracing::debug!(handler = %handler_type, "Replaced existing handler registration");
        }
    }

    /// Get a handler by type.
    pub fn get(&self, handler_type: &str) -> Option<Arc<dyn Handler>> {
        self.handlers.get(handler_type).cloned()
    }

    /// Check if a handler type is registered.
    pub fn has(&self, handler_type: &str) -> bool {
        self.handlers.contains_key(handler_type)
    }

    /// List registered handler types, sorted.
    pub fn list(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Number of registered handlers.
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("handlers", &self.list())
            .finish()
    }
}
