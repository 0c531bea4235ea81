//! Error kinds shared by both providers
//!
//! Functions in this crate return `anyhow::Result`. When the caller needs to
//! react to a specific failure, the underlying error is a [`CloudError`] and
//! can be recovered with `downcast_ref`.

use thiserror::Error;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Maximum length of an error message shown to the user
const MAX_ERROR_LENGTH: usize = 120;

#[derive(Debug, Error)]
pub enum CloudError {
    /// The provider answered with a non-success status. Code and message are
    /// passed through exactly as the provider sent them.
    #[error("{provider} API error {status}: {code}: {message}")]
    Provider {
        provider: &'static str,
        status: u16,
        code: String,
        message: String,
    },

    /// Socket-level failure (connect refused, timeout). Safe to treat as transient.
    #[error("socket error: {0}")]
    Socket(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("failed to parse {what} response: {reason}")]
    Parse { what: &'static str, reason: String },

    #[error("missing required attribute: {0}")]
    MissingAttribute(&'static str),

    #[error("credentials unavailable: {0}")]
    Credentials(String),

    #[error("request signing failed: {0}")]
    Signature(String),
}

impl CloudError {
    /// Classify a reqwest error into a transient socket error or a generic transport error
    pub fn from_reqwest(err: reqwest::Error) -> Self {
        if err.is_connect() || err.is_timeout() {
            CloudError::Socket(err.to_string())
        } else {
            CloudError::Transport(err.to_string())
        }
    }

    pub fn is_transient(&self) -> bool {
        matches!(self, CloudError::Socket(_))
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, CloudError::Provider { status: 404, .. })
            || matches!(self, CloudError::Provider { code, .. } if code.ends_with(".NotFound"))
    }
}

/// True when the error chain carries a transient [`CloudError`]
pub fn is_transient(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<CloudError>()
        .map(CloudError::is_transient)
        .unwrap_or(false)
}

/// True when the error chain carries a provider "not found" [`CloudError`]
pub fn is_not_found(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<CloudError>()
        .map(CloudError::is_not_found)
        .unwrap_or(false)
}

/// Format a cloud error for display
/// Security: Sanitizes error messages to avoid leaking sensitive API details
pub fn format_cloud_error(error: &anyhow::Error) -> String {
    if let Some(cloud) = error.downcast_ref::<CloudError>() {
        match cloud {
            CloudError::Provider { status: 401, .. } => {
                return "Authentication failed. Check your credentials.".to_string();
            }
            CloudError::Provider { status: 403, .. } => {
                return "Permission denied. Check your IAM permissions.".to_string();
            }
            CloudError::Provider { status: 429, .. } => {
                return "Rate limit exceeded. Please try again later.".to_string();
            }
            CloudError::Provider { status, .. } if *status >= 500 => {
                return "Cloud service temporarily unavailable. Please try again.".to_string();
            }
            CloudError::Provider { code, message, .. } => {
                return sanitize(&format!("{}: {}", code, message));
            }
            CloudError::Socket(_) => {
                return "Request failed. Check your network connection and try again."
                    .to_string();
            }
            CloudError::Credentials(_) => {
                return "No credentials found. Configure AWS or gcloud credentials.".to_string();
            }
            _ => {}
        }
    }

    sanitize(&error.to_string())
}

/// Sanitize response body for logging
/// Truncates long responses and drops non-printable characters
pub(crate) fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut end = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(end) {
            end -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..end], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Truncate long error messages and drop non-printable characters
fn sanitize(message: &str) -> String {
    let mut printable = message.chars().filter(|c| c.is_ascii_graphic() || *c == ' ');
    let sanitized = printable.by_ref().take(MAX_ERROR_LENGTH).collect::<String>();

    if printable.next().is_some() {
        format!("{}...", sanitized)
    } else {
        sanitized
    }
}
