//! EBS volume model

use super::attributes::{as_string, as_u64, AttributeTable};
use crate::error::{self, CloudError};
use crate::response::Response;
use crate::service::VolumeService;
use anyhow::Result;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Arc, OnceLock};

/// State of a volume that can be attached
pub const AVAILABLE_STATE: &str = "available";

static VOLUME_ATTRIBUTES: OnceLock<AttributeTable> = OnceLock::new();

fn volume_attributes() -> &'static AttributeTable {
    VOLUME_ATTRIBUTES.get_or_init(|| {
        AttributeTable::new(
            "volume",
            &[
                ("id", "volumeId"),
                ("availability_zone", "availabilityZone"),
                ("size", "size"),
                ("snapshot_id", "snapshotId"),
                ("state", "status"),
                ("created_at", "createTime"),
                ("attachments", "attachmentSet"),
            ],
        )
        .unwrap_or_else(|e| panic!("Invalid volume attribute table: {}", e))
    })
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct VolumePatch {
    pub id: Option<String>,
    pub availability_zone: Option<String>,
    pub size: Option<u32>,
    pub snapshot_id: Option<String>,
    pub state: Option<String>,
    pub created_at: Option<String>,
    pub attachments: Option<Vec<Value>>,
}

impl VolumePatch {
    pub fn from_wire(data: &Map<String, Value>) -> Self {
        let mut patch = Self::default();

        for (local, value) in volume_attributes().decode(data) {
            match local {
                "id" => patch.id = as_string(value),
                "availability_zone" => patch.availability_zone = as_string(value),
                "size" => patch.size = as_u64(value).and_then(|s| u32::try_from(s).ok()),
                // EC2 sends an empty element when the volume has no snapshot
                "snapshot_id" => patch.snapshot_id = as_string(value).filter(|s| !s.is_empty()),
                "state" => patch.state = as_string(value),
                "created_at" => patch.created_at = as_string(value),
                "attachments" => patch.attachments = value.as_array().cloned(),
                _ => {}
            }
        }

        patch
    }
}

/// One EBS volume, bound to the service that manages it
#[derive(Clone)]
pub struct Volume {
    service: Arc<dyn VolumeService>,
    id: Option<String>,
    availability_zone: Option<String>,
    size: Option<u32>,
    snapshot_id: Option<String>,
    state: Option<String>,
    created_at: Option<String>,
    attachments: Option<Vec<Value>>,
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("id", &self.id)
            .field("availability_zone", &self.availability_zone)
            .field("size", &self.size)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

impl Volume {
    pub fn new(service: Arc<dyn VolumeService>, patch: VolumePatch) -> Self {
        let mut volume = Self {
            service,
            id: None,
            availability_zone: None,
            size: None,
            snapshot_id: None,
            state: None,
            created_at: None,
            attachments: None,
        };
        volume.merge_attributes(patch);
        volume
    }

    pub fn merge_attributes(&mut self, patch: VolumePatch) {
        macro_rules! apply {
            ($($field:ident),*) => {
                $(if let Some(value) = patch.$field {
                    self.$field = Some(value);
                })*
            };
        }
        apply!(
            id,
            availability_zone,
            size,
            snapshot_id,
            state,
            created_at,
            attachments
        );
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn availability_zone(&self) -> Option<&str> {
        self.availability_zone.as_deref()
    }

    pub fn size(&self) -> Option<u32> {
        self.size
    }

    pub fn snapshot_id(&self) -> Option<&str> {
        self.snapshot_id.as_deref()
    }

    pub fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    pub fn created_at(&self) -> Option<&str> {
        self.created_at.as_deref()
    }

    pub fn attachments(&self) -> &[Value] {
        self.attachments.as_deref().unwrap_or_default()
    }

    pub fn attributes(&self) -> Map<String, Value> {
        volume_attributes().encode(&[
            ("id", self.id.clone().map(Value::from)),
            (
                "availability_zone",
                self.availability_zone.clone().map(Value::from),
            ),
            ("size", self.size.map(Value::from)),
            ("snapshot_id", self.snapshot_id.clone().map(Value::from)),
            ("state", self.state.clone().map(Value::from)),
            ("created_at", self.created_at.clone().map(Value::from)),
            ("attachments", self.attachments.clone().map(Value::Array)),
        ])
    }

    fn require_id(&self) -> Result<&str, CloudError> {
        self.id.as_deref().ok_or(CloudError::MissingAttribute("id"))
    }

    /// Create the volume; the create response carries the new entity
    pub async fn save(&mut self) -> Result<()> {
        let mut response = self
            .service
            .create_volume(
                self.availability_zone.as_deref(),
                self.size,
                self.snapshot_id.as_deref(),
            )
            .await?
            .into_result("ec2")?;

        response.body.remove("requestId");
        self.merge_attributes(VolumePatch::from_wire(&response.body));

        tracing::info!("volume {:?} saved ({:?})", self.id, self.state);
        Ok(())
    }

    /// Describe the volume once, merge it, and report whether it is `available`
    pub async fn ready(&mut self) -> Result<bool> {
        let id = self.require_id()?.to_string();
        let response = self.service.describe_volumes(&[id]).await?;

        let Some(data) = first_volume(&response) else {
            return Ok(false);
        };
        let mut patch = VolumePatch::from_wire(data);
        if let Some(zone) = &self.availability_zone {
            patch.availability_zone = Some(zone.clone());
        }
        self.merge_attributes(patch);

        Ok(self.state.as_deref() == Some(AVAILABLE_STATE))
    }

    pub async fn reload(&mut self) -> Result<Option<&mut Self>> {
        let id = self.require_id()?.to_string();
        if self.availability_zone.is_none() {
            return Err(CloudError::MissingAttribute("availability_zone").into());
        }

        let collection = Volumes::new(self.service.clone());
        let fresh = match collection.get(&id).await {
            Ok(Some(fresh)) => fresh,
            Ok(None) => return Ok(None),
            Err(e) if error::is_transient(&e) => {
                tracing::warn!("reload of volume {} skipped: {}", id, e);
                return Ok(None);
            }
            Err(e) => return Err(e),
        };

        self.merge_attributes(fresh.to_patch());
        Ok(Some(self))
    }

    pub async fn destroy(&self) -> Result<Response> {
        let id = self.require_id()?;
        self.service.delete_volume(id).await
    }

    fn to_patch(&self) -> VolumePatch {
        VolumePatch {
            id: self.id.clone(),
            availability_zone: self.availability_zone.clone(),
            size: self.size,
            snapshot_id: self.snapshot_id.clone(),
            state: self.state.clone(),
            created_at: self.created_at.clone(),
            attachments: self.attachments.clone(),
        }
    }
}

fn first_volume(response: &Response) -> Option<&Map<String, Value>> {
    response
        .body
        .get("volumeSet")?
        .as_array()?
        .first()?
        .as_object()
}

#[derive(Clone)]
pub struct Volumes {
    service: Arc<dyn VolumeService>,
}

impl Volumes {
    pub fn new(service: Arc<dyn VolumeService>) -> Self {
        Self { service }
    }

    pub fn build(&self, patch: VolumePatch) -> Volume {
        Volume::new(self.service.clone(), patch)
    }

    /// Fetch one volume; `None` if EC2 reports it does not exist
    pub async fn get(&self, id: &str) -> Result<Option<Volume>> {
        match self.service.describe_volumes(&[id.to_string()]).await {
            Ok(response) => Ok(first_volume(&response)
                .map(|data| self.build(VolumePatch::from_wire(data)))),
            Err(e) if error::is_not_found(&e) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub async fn all(&self) -> Result<Vec<Volume>> {
        let response = self.service.describe_volumes(&[]).await?;

        Ok(response
            .body
            .get("volumeSet")
            .and_then(|v| v.as_array())
            .map(|items| {
                items
                    .iter()
                    .filter_map(|item| item.as_object())
                    .map(|item| self.build(VolumePatch::from_wire(item)))
                    .collect()
            })
            .unwrap_or_default())
    }
}
