//! Compute Engine persistent disk model

use super::attributes::{as_string, as_u64, AttributeTable};
use crate::error::{self, CloudError};
use crate::google::client::short_name;
use crate::response::Response;
use crate::service::DiskService;
use anyhow::Result;
use futures::future::try_join_all;
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// Status of a disk that can be attached
pub const RUNNING_STATE: &str = "READY";

static DISK_ATTRIBUTES: OnceLock<AttributeTable> = OnceLock::new();

/// `(local, wire)` names of every disk attribute
fn disk_attributes() -> &'static AttributeTable {
    DISK_ATTRIBUTES.get_or_init(|| {
        AttributeTable::new(
            "disk",
            &[
                ("name", "name"),
                ("kind", "kind"),
                ("id", "id"),
                ("creation_timestamp", "creationTimestamp"),
                ("zone_name", "zone"),
                ("status", "status"),
                ("description", "description"),
                ("size_gb", "sizeGb"),
                ("self_link", "selfLink"),
                ("image_name", "sourceImage"),
            ],
        )
        .unwrap_or_else(|e| panic!("Invalid disk attribute table: {}", e))
    })
}

/// Partial set of disk fields; `None` leaves the current value alone
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DiskPatch {
    pub name: Option<String>,
    pub kind: Option<String>,
    pub id: Option<String>,
    pub creation_timestamp: Option<String>,
    pub zone_name: Option<String>,
    pub status: Option<String>,
    pub description: Option<String>,
    pub size_gb: Option<u64>,
    pub self_link: Option<String>,
    pub image_name: Option<String>,
}

impl DiskPatch {
    /// Decode a parsed Compute response; zone URLs are shortened to the zone name
    pub fn from_wire(data: &Map<String, Value>) -> Self {
        let mut patch = Self::default();

        for (local, value) in disk_attributes().decode(data) {
            match local {
                "name" => patch.name = as_string(value),
                "kind" => patch.kind = as_string(value),
                "id" => patch.id = as_string(value),
                "creation_timestamp" => patch.creation_timestamp = as_string(value),
                "zone_name" => {
                    patch.zone_name = value.as_str().map(|zone| short_name(zone).to_string())
                }
                "status" => patch.status = as_string(value),
                "description" => patch.description = as_string(value),
                "size_gb" => patch.size_gb = as_u64(value),
                "self_link" => patch.self_link = as_string(value),
                "image_name" => patch.image_name = as_string(value),
                _ => {}
            }
        }

        patch
    }
}

/// One persistent disk, bound to the service that manages it
#[derive(Clone)]
pub struct Disk {
    service: Arc<dyn DiskService>,
    name: Option<String>,
    kind: Option<String>,
    id: Option<String>,
    creation_timestamp: Option<String>,
    zone_name: Option<String>,
    status: Option<String>,
    description: Option<String>,
    size_gb: Option<u64>,
    self_link: Option<String>,
    image_name: Option<String>,
}

impl fmt::Debug for Disk {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Disk")
            .field("name", &self.name)
            .field("zone_name", &self.zone_name)
            .field("status", &self.status)
            .field("size_gb", &self.size_gb)
            .finish_non_exhaustive()
    }
}

impl Disk {
    pub fn new(service: Arc<dyn DiskService>, patch: DiskPatch) -> Self {
        let mut disk = Self {
            service,
            name: None,
            kind: None,
            id: None,
            creation_timestamp: None,
            zone_name: None,
            status: None,
            description: None,
            size_gb: None,
            self_link: None,
            image_name: None,
        };
        disk.merge_attributes(patch);
        disk
    }

    /// Apply every field set in `patch`
    pub fn merge_attributes(&mut self, patch: DiskPatch) {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = patch.$field {
                    self.$field = Some(value);
                })*
            };
        }
        apply!(
            name,
            kind,
            id,
            creation_timestamp,
            zone_name,
            status,
            description,
            size_gb,
            self_link,
            image_name
        );
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn kind(&self) -> Option<&str> {
        self.kind.as_deref()
    }

    pub fn creation_timestamp(&self) -> Option<&str> {
        self.creation_timestamp.as_deref()
    }

    pub fn zone_name(&self) -> Option<&str> {
        self.zone_name.as_deref()
    }

    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn size_gb(&self) -> Option<u64> {
        self.size_gb
    }

    pub fn self_link(&self) -> Option<&str> {
        self.self_link.as_deref()
    }

    pub fn image_name(&self) -> Option<&str> {
        self.image_name.as_deref()
    }

    /// Current attributes under their wire names
    pub fn attributes(&self) -> Map<String, Value> {
        disk_attributes().encode(&[
            ("name", self.name.clone().map(Value::from)),
            ("kind", self.kind.clone().map(Value::from)),
            ("id", self.id.clone().map(Value::from)),
            (
                "creation_timestamp",
                self.creation_timestamp.clone().map(Value::from),
            ),
            ("zone_name", self.zone_name.clone().map(Value::from)),
            ("status", self.status.clone().map(Value::from)),
            ("description", self.description.clone().map(Value::from)),
            ("size_gb", self.size_gb.map(|s| Value::from(s.to_string()))),
            ("self_link", self.self_link.clone().map(Value::from)),
            ("image_name", self.image_name.clone().map(Value::from)),
        ])
    }

    fn require_identity(&self) -> Result<&str, CloudError> {
        self.name
            .as_deref()
            .ok_or(CloudError::MissingAttribute("name"))
    }

    fn require_zone(&self) -> Result<&str, CloudError> {
        self.zone_name
            .as_deref()
            .ok_or(CloudError::MissingAttribute("zone_name"))
    }

    /// Create the disk, then fetch it back and merge the result into `self`
    pub async fn save(&mut self) -> Result<()> {
        let name = self.require_identity()?.to_string();

        self.service
            .insert_disk(
                &name,
                self.size_gb,
                self.zone_name.as_deref(),
                self.image_name.as_deref(),
            )
            .await?
            .into_result("compute")?;

        let zone = self.require_zone()?.to_string();
        let data = self.service.get_disk(&name, &zone).await?;
        self.merge_attributes(DiskPatch::from_wire(&data.body));

        tracing::info!("disk {} saved in {} ({:?})", name, zone, self.status);
        Ok(())
    }

    /// Fetch current state, merge it, and report whether the disk is `READY`
    ///
    /// This is a single poll; callers wait by calling it in a loop.
    pub async fn ready(&mut self) -> Result<bool> {
        let name = self.require_identity()?.to_string();
        let zone = self.require_zone()?.to_string();

        let data = self.service.get_disk(&name, &zone).await?;
        let mut patch = DiskPatch::from_wire(&data.body);
        patch.zone_name = Some(zone);
        self.merge_attributes(patch);

        Ok(self.status.as_deref() == Some(RUNNING_STATE))
    }

    /// Refresh from the provider
    ///
    /// Returns `None` when the disk is gone or the lookup hit a transient
    /// socket error; other errors propagate.
    pub async fn reload(&mut self) -> Result<Option<&mut Self>> {
        let name = self.require_identity()?.to_string();
        let zone = self.require_zone()?.to_string();

        let collection = Disks::new(self.service.clone());
        let fresh = match collection.get(&name, &zone).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => return Ok(None),
            Err(e) if error::is_transient(&e) => {
                tracing::warn!("reload of disk {} skipped: {}", name, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        self.merge_attributes(fresh.to_patch());
        Ok(Some(self))
    }

    /// Descriptor used when attaching this disk as an instance boot disk
    pub fn get_as_boot_disk(&self, writable: bool) -> Value {
        let mode = if writable { "READ_WRITE" } else { "READ_ONLY" };
        json!({
            "name": self.name,
            "type": "PERSISTENT",
            "boot": true,
            "source": self.self_link,
            "mode": mode,
        })
    }

    pub async fn destroy(&self) -> Result<Response> {
        let name = self.require_identity()?;
        let zone = self.require_zone()?;
        self.service.delete_disk(name, zone).await
    }

    fn to_patch(&self) -> DiskPatch {
        DiskPatch {
            name: self.name.clone(),
            kind: self.kind.clone(),
            id: self.id.clone(),
            creation_timestamp: self.creation_timestamp.clone(),
            zone_name: self.zone_name.clone(),
            status: self.status.clone(),
            description: self.description.clone(),
            size_gb: self.size_gb,
            self_link: self.self_link.clone(),
            image_name: self.image_name.clone(),
        }
    }
}

/// Disk lookups for one service
#[derive(Clone)]
pub struct Disks {
    service: Arc<dyn DiskService>,
}

impl Disks {
    pub fn new(service: Arc<dyn DiskService>) -> Self {
        Self { service }
    }

    /// Unsaved disk bound to this collection's service
    pub fn build(&self, patch: DiskPatch) -> Disk {
        Disk::new(self.service.clone(), patch)
    }

    /// Fetch one disk; `None` if the provider reports it does not exist
    pub async fn get(&self, name: &str, zone: &str) -> Result<Option<Disk>> {
        match self.service.get_disk(name, zone).await {
            Ok(response) => {
                let mut patch = DiskPatch::from_wire(&response.body);
                patch.zone_name.get_or_insert_with(|| zone.to_string());
                Ok(Some(self.build(patch)))
            }
            Err(e) if error::is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// All disks in one zone
    pub async fn all(&self, zone: &str) -> Result<Vec<Disk>> {
        let response = self.service.list_disks(zone).await?;

        Ok(response
            .body
            .get("items")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object())
                    .map(|item| self.build(DiskPatch::from_wire(item)))
                    .collect()
            })
            .unwrap_or_default())
    }

    /// All disks across several zones, fetched concurrently
    pub async fn all_in_zones(&self, zones: &[String]) -> Result<Vec<Disk>> {
        let pages = try_join_all(zones.iter().map(|zone| self.all(zone))).await?;
        Ok(pages.into_iter().flatten().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::Compute;
    use crate::mock::MockStore;

    fn disks() -> Disks {
        Disks::new(Arc::new(Compute::mock(Arc::new(MockStore::new()), "my-project")))
    }

    fn patch(name: &str, zone: &str, size_gb: u64) -> DiskPatch {
        DiskPatch {
            name: Some(name.to_string()),
            zone_name: Some(zone.to_string()),
            size_gb: Some(size_gb),
            ..Default::default()
        }
    }

    #[test]
    fn test_attribute_table_is_valid() {
        let table = disk_attributes();
        assert_eq!(table.local_name("creationTimestamp"), Some("creation_timestamp"));
        assert_eq!(table.wire_name("zone_name"), Some("zone"));
    }

    #[test]
    fn test_from_wire_shortens_zone_and_parses_size() {
        let data = json!({
            "name": "disk-1",
            "zone": "https://www.googleapis.com/compute/v1/projects/p/zones/us-central1-a",
            "sizeGb": "50",
            "users": ["instance-1"],
        });
        let patch = DiskPatch::from_wire(data.as_object().unwrap());
        assert_eq!(patch.zone_name.as_deref(), Some("us-central1-a"));
        assert_eq!(patch.size_gb, Some(50));
        assert_eq!(patch.name.as_deref(), Some("disk-1"));
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut disk = disks().build(patch("disk-1", "us-central1-a", 10));
        disk.merge_attributes(DiskPatch {
            status: Some("READY".into()),
            ..Default::default()
        });
        assert_eq!(disk.size_gb(), Some(10));
        assert_eq!(disk.status(), Some("READY"));
    }

    #[test]
    fn test_boot_disk_descriptor() {
        let mut disk = disks().build(patch("boot", "us-central1-a", 10));
        disk.merge_attributes(DiskPatch {
            self_link: Some("https://example/disks/boot".into()),
            ..Default::default()
        });

        let writable = disk.get_as_boot_disk(true);
        assert_eq!(
            writable,
            json!({
                "name": "boot",
                "type": "PERSISTENT",
                "boot": true,
                "source": "https://example/disks/boot",
                "mode": "READ_WRITE",
            })
        );
        assert_eq!(disk.get_as_boot_disk(false)["mode"], "READ_ONLY");
    }

    #[test]
    fn test_attributes_use_wire_names() {
        let disk = disks().build(patch("disk-1", "us-central1-a", 10));
        let attributes = disk.attributes();
        assert_eq!(attributes["name"], "disk-1");
        assert_eq!(attributes["zone"], "us-central1-a");
        assert_eq!(attributes["sizeGb"], "10");
        assert!(!attributes.contains_key("status"));
    }

    #[tokio::test]
    async fn test_save_merges_into_self() {
        let mut disk = disks().build(patch("disk-1", "us-central1-a", 10));
        disk.save().await.unwrap();

        assert_eq!(disk.status(), Some("CREATING"));
        assert!(disk.id().is_some());
        assert!(disk.self_link().unwrap().ends_with("/disks/disk-1"));
        assert_eq!(disk.zone_name(), Some("us-central1-a"));
    }

    #[tokio::test]
    async fn test_save_without_zone_fails() {
        let mut disk = disks().build(DiskPatch {
            name: Some("disk-1".into()),
            size_gb: Some(10),
            ..Default::default()
        });
        let err = disk.save().await.unwrap_err();
        match err.downcast_ref::<CloudError>() {
            Some(CloudError::Provider { code, message, .. }) => {
                assert_eq!(code, "MissingParameter");
                assert!(message.contains("zone"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reload_requires_identity() {
        let mut disk = disks().build(DiskPatch::default());
        let err = disk.reload().await.unwrap_err();
        assert!(matches!(
            err.downcast_ref::<CloudError>(),
            Some(CloudError::MissingAttribute("name"))
        ));
    }

    #[tokio::test]
    async fn test_reload_missing_disk_is_none() {
        let mut disk = disks().build(patch("ghost", "us-central1-a", 10));
        assert!(disk.reload().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_all_in_zones() {
        let disks = disks();
        for (name, zone) in [("a", "us-central1-a"), ("b", "us-east1-b"), ("c", "europe-west1-b")] {
            disks.build(patch(name, zone, 10)).save().await.unwrap();
        }

        let found = disks
            .all_in_zones(&["us-central1-a".to_string(), "us-east1-b".to_string()])
            .await
            .unwrap();
        let mut names: Vec<_> = found.iter().filter_map(|d| d.name()).collect();
        names.sort();
        assert_eq!(names, vec!["a", "b"]);
    }
}
