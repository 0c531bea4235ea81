//! HTTP utilities for Google REST API calls

use crate::error::{sanitize_for_log, CloudError};
use crate::response::Response;
use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use serde_json::{Map, Value};
use std::time::Duration;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client wrapper for Google API calls
#[derive(Clone)]
pub struct GcpHttpClient {
    client: Client,
}

impl GcpHttpClient {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("nimbus/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    pub async fn get(&self, url: &str, token: &str) -> Result<Response> {
        tracing::debug!("GET {}", url);
        self.send(self.client.get(url).bearer_auth(token)).await
    }

    pub async fn post(&self, url: &str, token: &str, body: Option<&Value>) -> Result<Response> {
        tracing::debug!("POST {}", url);

        let mut request = self.client.post(url).bearer_auth(token);
        if let Some(body) = body {
            request = request.json(body);
        }

        self.send(request).await
    }

    pub async fn delete(&self, url: &str, token: &str) -> Result<Response> {
        tracing::debug!("DELETE {}", url);
        self.send(self.client.delete(url).bearer_auth(token)).await
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(CloudError::from_reqwest)?;

        let status = response.status();
        let text = response.text().await.map_err(CloudError::from_reqwest)?;

        if !status.is_success() {
            // Security: Only log sanitized/truncated error body to avoid leaking sensitive data
            tracing::error!("Compute API error: {} - {}", status, sanitize_for_log(&text));
            let (code, message) = parse_error(&text)
                .unwrap_or_else(|| (status.as_str().to_string(), sanitize_for_log(&text)));
            return Err(CloudError::Provider {
                provider: "compute",
                status: status.as_u16(),
                code,
                message,
            }
            .into());
        }

        // Handle empty response
        if text.is_empty() {
            return Ok(Response::new(status.as_u16(), Map::new()));
        }

        let body = match serde_json::from_str::<Value>(&text) {
            Ok(Value::Object(map)) => map,
            Ok(other) => {
                return Err(CloudError::Parse {
                    what: "Compute",
                    reason: format!("expected a JSON object, got {}", json_kind(&other)),
                }
                .into())
            }
            Err(e) => {
                return Err(CloudError::Parse {
                    what: "Compute",
                    reason: e.to_string(),
                }
                .into())
            }
        };

        Ok(Response::new(status.as_u16(), body))
    }
}

/// Extract reason and message from a Google error body:
/// `{"error": {"code": 404, "message": "...", "errors": [{"reason": "notFound"}]}}`
fn parse_error(text: &str) -> Option<(String, String)> {
    let value: Value = serde_json::from_str(text).ok()?;
    let error = value.get("error")?;

    let message = error
        .get("message")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let code = error
        .get("errors")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("reason"))
        .and_then(|v| v.as_str())
        .map(String::from)
        .or_else(|| error.get("status").and_then(|v| v.as_str()).map(String::from))
        .or_else(|| error.get("code").map(|v| v.to_string()))?;

    Some((code, message))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_prefers_reason() {
        let body = r#"{"error":{"code":404,"message":"The resource 'disk-1' was not found","errors":[{"reason":"notFound"}]}}"#;
        let (code, message) = parse_error(body).unwrap();
        assert_eq!(code, "notFound");
        assert_eq!(message, "The resource 'disk-1' was not found");
    }

    #[test]
    fn test_parse_error_falls_back_to_status() {
        let body = r#"{"error":{"code":403,"message":"denied","status":"PERMISSION_DENIED"}}"#;
        let (code, _) = parse_error(body).unwrap();
        assert_eq!(code, "PERMISSION_DENIED");
    }

    #[test]
    fn test_parse_error_ignores_other_bodies() {
        assert!(parse_error("<html>bad gateway</html>").is_none());
        assert!(parse_error(r#"{"items": []}"#).is_none());
    }
}
