//! Echo handler.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::HandlerError;
use crate::params::Parameters;
use crate::registry::Handler;

/// Returns its resolved parameters unchanged, as a JSON object.
///
/// Useful for seeding a workflow with literal data and for checking how
/// reference expressions resolve.
#[derive(Debug, Default)]
pub struct EchoHandler;

impl EchoHandler {
    pub const HANDLER_TYPE: &'static str = "echo";
}

#[async_trait]
impl Handler for EchoHandler {
    async fn execute(&self, params: Parameters) -> Result<Value, HandlerError> {
        Ok(Value::Object(params))
    }
}
