//! Compute Engine client
//!
//! Combines a token source with the HTTP wrapper and knows how to build
//! Compute Engine resource URLs for one project.

use super::auth::TokenSource;
use super::http::GcpHttpClient;
use crate::response::Response;
use anyhow::{Context, Result};
use serde_json::Value;

const COMPUTE_BASE_URL: &str = "https://compute.googleapis.com/compute/v1";

#[derive(Clone)]
pub struct GcpClient {
    tokens: TokenSource,
    http: GcpHttpClient,
    project_id: String,
    base_url: String,
}

impl GcpClient {
    /// Client using Application Default Credentials
    pub async fn new(project_id: &str) -> Result<Self> {
        let tokens = TokenSource::adc()
            .await
            .context("Failed to initialize GCP credentials")?;
        Self::with_tokens(project_id, tokens, COMPUTE_BASE_URL)
    }

    /// Client with an explicit token source and API base URL
    pub fn with_tokens(project_id: &str, tokens: TokenSource, base_url: &str) -> Result<Self> {
        Ok(Self {
            tokens,
            http: GcpHttpClient::new()?,
            project_id: project_id.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub async fn get(&self, url: &str) -> Result<Response> {
        let token = self.tokens.token().await?;
        self.http.get(url, &token).await
    }

    pub async fn post(&self, url: &str, body: Option<&Value>) -> Result<Response> {
        let token = self.tokens.token().await?;
        self.http.post(url, &token, body).await
    }

    pub async fn delete(&self, url: &str) -> Result<Response> {
        let token = self.tokens.token().await?;
        self.http.delete(url, &token).await
    }

    /// Build Compute Engine API URL
    pub fn compute_url(&self, path: &str) -> String {
        format!("{}/projects/{}/{}", self.base_url, self.project_id, path)
    }

    /// Build zonal Compute Engine API URL
    pub fn compute_zonal_url(&self, zone: &str, resource: &str) -> String {
        self.compute_url(&format!("zones/{}/{}", zone, resource))
    }

    /// Build global Compute Engine API URL
    pub fn compute_global_url(&self, resource: &str) -> String {
        self.compute_url(&format!("global/{}", resource))
    }
}

/// Extract short name from a resource URL
/// e.g., "https://www.googleapis.com/compute/v1/projects/my-project/zones/us-central1-a" -> "us-central1-a"
pub fn short_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GcpClient {
        GcpClient::with_tokens(
            "test-project",
            TokenSource::fixed("token"),
            "https://compute.googleapis.com/compute/v1/",
        )
        .unwrap()
    }

    #[test]
    fn test_zonal_url() {
        assert_eq!(
            client().compute_zonal_url("us-central1-a", "disks/disk-1"),
            "https://compute.googleapis.com/compute/v1/projects/test-project/zones/us-central1-a/disks/disk-1"
        );
    }

    #[test]
    fn test_global_url() {
        assert_eq!(
            client().compute_global_url("images/debian-12"),
            "https://compute.googleapis.com/compute/v1/projects/test-project/global/images/debian-12"
        );
    }

    #[test]
    fn test_short_name() {
        assert_eq!(
            short_name("https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a"),
            "us-central1-a"
        );
        assert_eq!(short_name("us-central1-a"), "us-central1-a");
    }
}
