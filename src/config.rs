//! Configuration Management
//!
//! Handles persistent configuration storage for nimbus. Effective values
//! resolve as command line > config file > environment > built-in default.

use crate::google::auth;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_AWS_REGION: &str = "us-east-1";
pub const DEFAULT_GOOGLE_ZONE: &str = "us-central1-a";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// Serve every request from the in-memory mock store
    #[serde(default)]
    pub mock: Option<bool>,
    #[serde(default)]
    pub aws_region: Option<String>,
    #[serde(default)]
    pub google_project: Option<String>,
    #[serde(default)]
    pub google_zone: Option<String>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("nimbus").join("config.json"))
    }

    /// Load configuration from disk; a missing or unreadable file yields defaults
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(e) => {
                tracing::warn!("Failed to read config {:?}: {}", path, e);
                Self::default()
            }
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {:?}", parent))?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content).with_context(|| format!("Failed to write {:?}", path))?;

        Ok(())
    }

    /// Mock mode (CLI > config > NIMBUS_MOCK)
    pub fn effective_mock(&self, cli: bool) -> bool {
        cli || self.mock.unwrap_or_else(|| {
            std::env::var("NIMBUS_MOCK")
                .map(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
                .unwrap_or(false)
        })
    }

    /// AWS region (CLI > config > AWS_REGION / AWS_DEFAULT_REGION > us-east-1)
    pub fn effective_region(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.aws_region.clone())
            .or_else(|| std::env::var("AWS_REGION").ok())
            .or_else(|| std::env::var("AWS_DEFAULT_REGION").ok())
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_AWS_REGION.to_string())
    }

    /// Google project (CLI > config > gcloud default); `None` when nothing is configured
    pub fn effective_project(&self, cli: Option<&str>) -> Option<String> {
        cli.map(str::to_string)
            .or_else(|| self.google_project.clone())
            .or_else(auth::default_project)
            .filter(|p| auth::validate_project_id(p))
    }

    /// Google zone (CLI > config > gcloud default > us-central1-a)
    pub fn effective_zone(&self, cli: Option<&str>) -> String {
        cli.map(str::to_string)
            .or_else(|| self.google_zone.clone())
            .or_else(auth::default_zone)
            .unwrap_or_else(|| DEFAULT_GOOGLE_ZONE.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_beats_config() {
        let config = Config {
            aws_region: Some("eu-west-1".into()),
            google_zone: Some("europe-west1-b".into()),
            ..Default::default()
        };
        assert_eq!(config.effective_region(Some("ap-south-1")), "ap-south-1");
        assert_eq!(config.effective_region(None), "eu-west-1");
        assert_eq!(config.effective_zone(Some("us-east1-b")), "us-east1-b");
        assert_eq!(config.effective_zone(None), "europe-west1-b");
    }

    #[test]
    fn test_mock_flag_overrides_config() {
        let config = Config {
            mock: Some(false),
            ..Default::default()
        };
        assert!(config.effective_mock(true));
        assert!(!config.effective_mock(false));
    }

    #[test]
    fn test_invalid_project_is_rejected() {
        let config = Config {
            google_project: Some("../etc".into()),
            ..Default::default()
        };
        assert_eq!(config.effective_project(None), None);
        assert_eq!(
            config.effective_project(Some("my-project-123")).as_deref(),
            Some("my-project-123")
        );
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let path = std::env::temp_dir()
            .join(format!("nimbus-config-{}", uuid::Uuid::new_v4()))
            .join("config.json");
        let config = Config {
            mock: Some(true),
            aws_region: Some("us-west-2".into()),
            google_project: Some("demo-project".into()),
            google_zone: None,
        };

        config.save_to(&path).unwrap();
        assert_eq!(Config::load_from(&path), config);

        let _ = std::fs::remove_dir_all(path.parent().unwrap());
    }

    #[test]
    fn test_malformed_file_yields_defaults() {
        let dir = std::env::temp_dir().join(format!("nimbus-config-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, "{not json").unwrap();

        assert_eq!(Config::load_from(&path), Config::default());
        let _ = std::fs::remove_dir_all(dir);
    }
}
