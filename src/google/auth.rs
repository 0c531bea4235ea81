//! Google Cloud authentication
//!
//! Access tokens come from Application Default Credentials (service account
//! keys, gcloud user credentials, metadata server) or, for tests and
//! pre-authorized callers, from a fixed token.

use crate::error::CloudError;
use anyhow::{Context, Result};
use gcp_auth::TokenProvider;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Scope needed for Compute Engine read/write
pub const COMPUTE_SCOPES: &[&str] = &["https://www.googleapis.com/auth/compute"];

/// Refresh tokens this long before the assumed expiry
const TOKEN_EXPIRY_BUFFER: Duration = Duration::from_secs(60);

/// Assumed token lifetime (conservative: 30 minutes)
const DEFAULT_TOKEN_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone)]
struct CachedToken {
    token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_valid(&self) -> bool {
        Instant::now() < self.expires_at
    }
}

#[derive(Clone)]
enum Source {
    /// Application Default Credentials with a cached token
    Adc {
        provider: Arc<dyn TokenProvider>,
        cache: Arc<RwLock<Option<CachedToken>>>,
    },
    /// A fixed token, mostly for testing
    Static(String),
}

/// Where bearer tokens come from
#[derive(Clone)]
pub struct TokenSource {
    source: Source,
}

impl TokenSource {
    /// Resolve Application Default Credentials
    pub async fn adc() -> Result<Self> {
        let provider = gcp_auth::provider().await.map_err(|e| {
            CloudError::Credentials(format!(
                "{}. Run 'gcloud auth application-default login'",
                e
            ))
        })?;

        Ok(Self {
            source: Source::Adc {
                provider,
                cache: Arc::new(RwLock::new(None)),
            },
        })
    }

    pub fn fixed(token: &str) -> Self {
        Self {
            source: Source::Static(token.to_string()),
        }
    }

    /// Get an access token, reusing the cached one while it is valid
    pub async fn token(&self) -> Result<String> {
        let (provider, cache) = match &self.source {
            Source::Static(token) => return Ok(token.clone()),
            Source::Adc { provider, cache } => (provider, cache),
        };

        if let Some(cached) = cache.read().await.as_ref() {
            if cached.is_valid() {
                return Ok(cached.token.clone());
            }
            tracing::debug!("Cached token expired, fetching new token");
        }

        let token = provider
            .token(COMPUTE_SCOPES)
            .await
            .context("Failed to get access token")?;
        let token = token.as_str().to_string();

        *cache.write().await = Some(CachedToken {
            token: token.clone(),
            expires_at: Instant::now() + DEFAULT_TOKEN_TTL - TOKEN_EXPIRY_BUFFER,
        });

        Ok(token)
    }
}

/// Get the gcloud configuration directory
pub fn gcloud_config_dir() -> Option<PathBuf> {
    if let Ok(path) = std::env::var("CLOUDSDK_CONFIG") {
        return Some(PathBuf::from(path));
    }
    dirs::config_dir().map(|p| p.join("gcloud"))
}

/// Validate a GCP project ID format
/// Project IDs must be 6-30 characters, lowercase letters, digits, and hyphens
/// Must start with a letter and cannot end with a hyphen
pub fn validate_project_id(project: &str) -> bool {
    if project.len() < 6 || project.len() > 30 {
        return false;
    }

    if !project.starts_with(|c: char| c.is_ascii_lowercase()) || project.ends_with('-') {
        return false;
    }

    project
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
}

/// Find `key = value` inside `[section]` of an ini-style gcloud file
pub(crate) fn read_ini_value(content: &str, section: &str, key: &str) -> Option<String> {
    let header = format!("[{}]", section);
    let mut in_section = false;

    for line in content.lines().map(str::trim) {
        // Security: Skip comments and empty lines
        if line.is_empty() || line.starts_with('#') || line.starts_with(';') {
            continue;
        }
        if line.starts_with('[') {
            in_section = line == header;
            continue;
        }
        if !in_section {
            continue;
        }
        if let Some((name, value)) = line.split_once('=') {
            if name.trim() == key {
                return Some(value.trim().to_string());
            }
        }
    }

    None
}

/// Read `[section] key` from the active gcloud configuration
fn read_active_gcloud_value(section: &str, key: &str) -> Option<String> {
    let config_dir = gcloud_config_dir()?;
    let active_config = std::fs::read_to_string(config_dir.join("active_config")).ok()?;
    let config_name = active_config.trim();

    // Security: Validate config name to prevent path traversal
    if !config_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        tracing::warn!("Invalid characters in active_config name");
        return None;
    }

    let path = config_dir
        .join("configurations")
        .join(format!("config_{}", config_name));
    let content = std::fs::read_to_string(path).ok()?;
    read_ini_value(&content, section, key)
}

/// Default project from the environment or gcloud configuration
/// Security: Validates project ID format before returning
pub fn default_project() -> Option<String> {
    for var in ["CLOUDSDK_CORE_PROJECT", "GOOGLE_CLOUD_PROJECT", "GCLOUD_PROJECT"] {
        if let Ok(project) = std::env::var(var) {
            if validate_project_id(&project) {
                return Some(project);
            }
            tracing::warn!("Invalid project ID format in {}", var);
        }
    }

    read_active_gcloud_value("core", "project").filter(|p| validate_project_id(p))
}

/// Default zone from the environment or gcloud configuration
pub fn default_zone() -> Option<String> {
    if let Ok(zone) = std::env::var("CLOUDSDK_COMPUTE_ZONE") {
        return Some(zone);
    }
    read_active_gcloud_value("compute", "zone")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_project_id() {
        assert!(validate_project_id("my-project-123"));
        assert!(!validate_project_id("short"));
        assert!(!validate_project_id("1starts-with-digit"));
        assert!(!validate_project_id("ends-with-hyphen-"));
        assert!(!validate_project_id("Has-Uppercase"));
    }

    #[test]
    fn test_read_ini_value_respects_sections() {
        let content = "[core]\nproject = my-project\n# zone = ignored\n[compute]\nzone = europe-west1-b\n";
        assert_eq!(
            read_ini_value(content, "core", "project").as_deref(),
            Some("my-project")
        );
        assert_eq!(
            read_ini_value(content, "compute", "zone").as_deref(),
            Some("europe-west1-b")
        );
        assert_eq!(read_ini_value(content, "core", "zone"), None);
    }

    #[tokio::test]
    async fn test_fixed_token() {
        let source = TokenSource::fixed("test-token");
        assert_eq!(source.token().await.unwrap(), "test-token");
    }
}
