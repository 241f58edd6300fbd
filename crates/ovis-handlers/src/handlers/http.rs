//! HTTP request handler.

use async_trait::async_trait;
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

use crate::error::HandlerError;
use crate::params::{value_to_string, Parameters};
use crate::registry::Handler;

/// HTTP method.
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
#[allow(clippy::upper_case_acronyms)]
pub enum HttpMethod {
    #[default]
    GET,
    POST,
    PUT,
    PATCH,
    DELETE,
}

impl From<HttpMethod> for Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::GET => Method::GET,
            HttpMethod::POST => Method::POST,
            HttpMethod::PUT => Method::PUT,
            HttpMethod::PATCH => Method::PATCH,
            HttpMethod::DELETE => Method::DELETE,
        }
    }
}

/// HTTP handler parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct HttpParams {
    /// URL to request.
    pub url: String,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: HttpMethod,

    /// Request headers.
    #[serde(default)]
    pub headers: HashMap<String, String>,

    /// Query parameters; scalar values are sent in their text form.
    #[serde(default)]
    pub query: serde_json::Map<String, Value>,

    /// JSON request body.
    #[serde(default)]
    pub json: Option<Value>,

    /// Raw text request body, used when `json` is absent.
    #[serde(default)]
    pub body: Option<String>,

    /// Request timeout in seconds.
    #[serde(default)]
    pub timeout_seconds: Option<u64>,
}

/// Performs an HTTP request and returns `{status, headers, body}`.
///
/// The body is parsed as JSON when possible and kept as text otherwise.
/// Non-2xx responses fail the task.
pub struct HttpHandler {
    client: reqwest::Client,
}

impl HttpHandler {
    pub const HANDLER_TYPE: &'static str = "http";

    /// Create a new HTTP handler with a default request timeout.
    pub fn new(timeout: Duration) -> Result<Self, HandlerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HandlerError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// Execute an HTTP request.
    pub async fn request(&self, params: &HttpParams) -> Result<Value, HandlerError> {
        let start = std::time::Instant::now();

        let method: Method = params.method.clone().into();
        let mut request = self.client.request(method, &params.url);

        if !params.query.is_empty() {
            let query: Vec<(String, String)> = params
                .query
                .iter()
                .map(|(k, v)| (k.clone(), value_to_string(v)))
                .collect();
            request = request.query(&query);
        }

        for (key, value) in &params.headers {
            request = request.header(key.as_str(), value.as_str());
        }

        if let Some(ref json) = params.json {
            request = request.json(json);
        } else if let Some(ref body) = params.body {
            request = request.body(body.clone());
        }

        if let Some(timeout) = params.timeout_seconds {
            request = request.timeout(Duration::from_secs(timeout));
        }

        let response = request.send().await?;

        let status = response.status().as_u16();
        let headers: HashMap<String, String> = response
            .headers()
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_str().unwrap_or("").to_string()))
            .collect();

        let text = response.text().await?;
        let body: Value = serde_json::from_str(&text).unwrap_or_else(|_| json!(text));

        tracing::debug!(
            url = %params.url,
            status,
            duration_ms = start.elapsed().as_millis() as u64,
            "HTTP request finished"
        );

        if !(200..300).contains(&status) {
            return Err(HandlerError::Http(format!(
                "HTTP {} response from {}",
                status, params.url
            )));
        }

        Ok(json!({
            "status": status,
            "headers": headers,
            "body": body,
        }))
    }
}

#[async_trait]
impl Handler for HttpHandler {
    async fn execute(&self, params: Parameters) -> Result<Value, HandlerError> {
        let http_params: HttpParams = serde_json::from_value(Value::Object(params))
            .map_err(|e| HandlerError::InvalidParameter {
                name: "url".to_string(),
                reason: e.to_string(),
            })?;

        tracing::debug!(
            url = %http_params.url,
            method = ?http_params.method,
            "Executing HTTP request"
        );

        self.request(&http_params).await
    }
}
