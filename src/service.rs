//! Provider capabilities
//!
//! Models and collections only talk to a provider through these traits. Each
//! provider implements the capability set it supports, and whether it hits
//! the network or a [`MockStore`](crate::mock::MockStore) is decided when the
//! provider is constructed.

use crate::response::Response;
use anyhow::Result;
use async_trait::async_trait;

/// Block storage volumes (EC2)
#[async_trait]
pub trait VolumeService: Send + Sync {
    /// Create a volume in `availability_zone` of `size` GiB, optionally from a snapshot
    async fn create_volume(
        &self,
        availability_zone: Option<&str>,
        size: Option<u32>,
        snapshot_id: Option<&str>,
    ) -> Result<Response>;

    /// Describe the given volumes, or all volumes when `volume_ids` is empty
    async fn describe_volumes(&self, volume_ids: &[String]) -> Result<Response>;

    async fn delete_volume(&self, volume_id: &str) -> Result<Response>;
}

/// Persistent disks (Compute Engine)
#[async_trait]
pub trait DiskService: Send + Sync {
    async fn insert_disk(
        &self,
        name: &str,
        size_gb: Option<u64>,
        zone: Option<&str>,
        image: Option<&str>,
    ) -> Result<Response>;

    async fn get_disk(&self, name: &str, zone: &str) -> Result<Response>;

    async fn list_disks(&self, zone: &str) -> Result<Response>;

    async fn delete_disk(&self, name: &str, zone: &str) -> Result<Response>;
}
