//! In-memory provider simulation
//!
//! A [`MockStore`] stands in for the provider's backing store. It is created
//! by the caller (usually one per test) and shared with the provider services
//! through an `Arc`. Each provider namespace sits behind its own async mutex.

use serde_json::{Map, Value};
use std::collections::HashMap;
use tokio::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Polls a pending resource survives before reaching its terminal state
const DEFAULT_SETTLE_POLLS: u32 = 1;

/// One simulated resource
#[derive(Debug, Clone)]
pub struct MockEntry {
    pub attributes: Map<String, Value>,
    /// Number of times a get/describe call has observed this entry
    pub polls: u32,
}

impl MockEntry {
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            attributes,
            polls: 0,
        }
    }

    pub fn status(&self) -> Option<&str> {
        self.attributes.get("status").and_then(|v| v.as_str())
    }

    /// Record one observation and move to `terminal` once past `settle_polls`
    pub fn observe(&mut self, pending: &str, terminal: &str, settle_polls: u32) {
        self.polls += 1;
        if self.status() == Some(pending) && self.polls > settle_polls {
            self.attributes
                .insert("status".to_string(), Value::String(terminal.to_string()));
            tracing::info!(
                "mock resource transitioned {} -> {} after {} polls",
                pending,
                terminal,
                self.polls
            );
        }
    }
}

/// EC2 namespace
#[derive(Debug, Default)]
pub struct AwsData {
    pub volumes: HashMap<String, MockEntry>,
}

/// Compute Engine namespace, disks keyed by name
#[derive(Debug, Default)]
pub struct GoogleData {
    pub disks: HashMap<String, MockEntry>,
}

#[derive(Debug)]
pub struct MockStore {
    aws: Mutex<AwsData>,
    google: Mutex<GoogleData>,
    settle_polls: u32,
}

impl Default for MockStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MockStore {
    pub fn new() -> Self {
        Self::with_settle_polls(DEFAULT_SETTLE_POLLS)
    }

    /// Store whose pending resources turn terminal after `settle_polls` observations
    pub fn with_settle_polls(settle_polls: u32) -> Self {
        Self {
            aws: Mutex::new(AwsData::default()),
            google: Mutex::new(GoogleData::default()),
            settle_polls,
        }
    }

    pub fn settle_polls(&self) -> u32 {
        self.settle_polls
    }

    pub async fn aws(&self) -> MutexGuard<'_, AwsData> {
        self.aws.lock().await
    }

    pub async fn google(&self) -> MutexGuard<'_, GoogleData> {
        self.google.lock().await
    }

    /// Drop all simulated resources
    pub async fn reset(&self) {
        *self.aws.lock().await = AwsData::default();
        *self.google.lock().await = GoogleData::default();
        tracing::debug!("mock store reset");
    }
}

// =============================================================================
// Id generators
// =============================================================================

fn hex_chars(length: usize) -> String {
    Uuid::new_v4().simple().to_string()[..length].to_string()
}

/// EC2 style volume id, e.g. `vol-1a2b3c4d`
pub fn volume_id() -> String {
    format!("vol-{}", hex_chars(8))
}

/// Request id echoed back by EC2 responses
pub fn request_id() -> String {
    Uuid::new_v4().to_string()
}

/// Compute Engine style numeric resource id
pub fn numeric_id() -> String {
    (Uuid::new_v4().as_u128() % 10u128.pow(19)).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_id_format() {
        let id = volume_id();
        assert!(id.starts_with("vol-"));
        assert_eq!(id.len(), 12);
        assert!(id[4..].chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_ids_are_unique() {
        assert_ne!(volume_id(), volume_id());
        assert_ne!(numeric_id(), numeric_id());
    }

    #[test]
    fn test_observe_settles_after_threshold() {
        let mut attributes = Map::new();
        attributes.insert("status".to_string(), Value::String("creating".into()));
        let mut entry = MockEntry::new(attributes);

        entry.observe("creating", "available", 1);
        assert_eq!(entry.status(), Some("creating"));

        entry.observe("creating", "available", 1);
        assert_eq!(entry.status(), Some("available"));
    }

    #[tokio::test]
    async fn test_reset_clears_namespaces() {
        let store = MockStore::new();
        store
            .aws()
            .await
            .volumes
            .insert("vol-1".into(), MockEntry::new(Map::new()));
        store.reset().await;
        assert!(store.aws().await.volumes.is_empty());
    }
}
