//! Handler error types.

use std::time::Duration;
use thiserror::Error;

/// Errors a handler can fail with.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Handler ran but could not produce a result.
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),

    /// A required parameter is missing or has the wrong shape.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// Handler exceeded its own time limit.
    #[error("Execution timed out after {}ms", .0.as_millis())]
    Timeout(Duration),

    /// Template loading or rendering error.
    #[error("Template error: {0}")]
    Template(String),

    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(String),

    /// Process spawn error.
    #[error("Process error: {0}")]
    Process(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(String),
}

impl HandlerError {
    /// Shorthand for a missing required parameter.
    pub fn missing(name: &str) -> Self {
        HandlerError::InvalidParameter {
            name: name.to_string(),
            reason: "required parameter is missing".to_string(),
        }
    }
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        HandlerError::Io(e.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(e: serde_json::Error) -> Self {
        HandlerError::Json(e.to_string())
    }
}

impl From<reqwest::Error> for HandlerError {
    fn from(e: reqwest::Error) -> Self {
        HandlerError::Http(e.to_string())
    }
}

impl From<minijinja::Error> for HandlerError {
    fn from(e: minijinja::Error) -> Self {
        HandlerError::Template(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = HandlerError::Timeout(Duration::from_secs(30));
        assert_eq!(err.to_string(), "Execution timed out after 30000ms");

        let err = HandlerError::Timeout(Duration::from_millis(250));
        assert_eq!(err.to_string(), "Execution timed out after 250ms");

        let err = HandlerError::missing("query");
        assert_eq!(
            err.to_string(),
            "Invalid parameter 'query': required parameter is missing"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HandlerError = io_err.into();
        assert!(matches!(err, HandlerError::Io(_)));
    }
}
