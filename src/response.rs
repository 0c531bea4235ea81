//! Provider-neutral response object

use crate::error::CloudError;
use serde_json::{Map, Value};

/// Status plus parsed body, as returned by every provider operation
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Map<String, Value>,
}

impl Response {
    pub fn new(status: u16, body: Map<String, Value>) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Map<String, Value>) -> Self {
        Self::new(200, body)
    }

    /// Client error in the `{ Code, Message }` shape
    pub fn error(status: u16, code: &str, message: impl Into<String>) -> Self {
        let mut body = Map::new();
        body.insert("Code".to_string(), Value::String(code.to_string()));
        body.insert("Message".to_string(), Value::String(message.into()));
        Self::new(status, body)
    }

    pub fn missing_parameter(parameter: &str) -> Self {
        Self::error(
            400,
            "MissingParameter",
            format!("The request must contain the parameter {}", parameter),
        )
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn code(&self) -> Option<&str> {
        self.body.get("Code").and_then(|v| v.as_str())
    }

    pub fn message(&self) -> Option<&str> {
        self.body.get("Message").and_then(|v| v.as_str())
    }

    /// Turn a non-success response into a [`CloudError::Provider`]
    pub fn into_result(self, provider: &'static str) -> Result<Self, CloudError> {
        if self.is_success() {
            return Ok(self);
        }

        Err(CloudError::Provider {
            provider,
            status: self.status,
            code: self.code().unwrap_or("Unknown").to_string(),
            message: self.message().unwrap_or_default().to_string(),
        })
    }
}
