//! EC2 request dispatcher
//!
//! Every operation branches on the backend picked at construction: the live
//! backend builds query parameters and goes through [`Ec2Client`], the mock
//! backend simulates the call against a shared [`MockStore`].

use super::http::{Ec2Client, Params};
use super::mock;
use super::parser::Ec2Parser;
use crate::mock::MockStore;
use crate::response::Response;
use crate::service::VolumeService;
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

const CREATE_VOLUME: Ec2Parser = Ec2Parser::new("CreateVolume");
const DESCRIBE_VOLUMES: Ec2Parser = Ec2Parser::new("DescribeVolumes");
const DELETE_VOLUME: Ec2Parser = Ec2Parser::new("DeleteVolume");

#[derive(Clone)]
enum Backend {
    Live(Ec2Client),
    Mock(Arc<MockStore>),
}

/// EC2 service handle
#[derive(Clone)]
pub struct Ec2 {
    backend: Backend,
}

impl Ec2 {
    pub fn live(client: Ec2Client) -> Self {
        Self {
            backend: Backend::Live(client),
        }
    }

    pub fn mock(store: Arc<MockStore>) -> Self {
        Self {
            backend: Backend::Mock(store),
        }
    }

    pub fn is_mocking(&self) -> bool {
        matches!(self.backend, Backend::Mock(_))
    }
}

fn params(action: &str) -> Params {
    let mut params = Params::new();
    params.insert("Action".to_string(), action.to_string());
    params
}

#[async_trait]
impl VolumeService for Ec2 {
    /// Create an EBS volume
    ///
    /// `size` is in GiB. The live API enforces provider bounds; nothing is
    /// validated locally. In mock mode a missing zone or size yields a
    /// `MissingParameter` 400 response instead of an error.
    async fn create_volume(
        &self,
        availability_zone: Option<&str>,
        size: Option<u32>,
        snapshot_id: Option<&str>,
    ) -> Result<Response> {
        match &self.backend {
            Backend::Live(client) => {
                let mut params = params("CreateVolume");
                if let Some(zone) = availability_zone {
                    params.insert("AvailabilityZone".to_string(), zone.to_string());
                }
                if let Some(size) = size {
                    params.insert("Size".to_string(), size.to_string());
                }
                if let Some(snapshot_id) = snapshot_id {
                    params.insert("SnapshotId".to_string(), snapshot_id.to_string());
                }
                client.request(params, &CREATE_VOLUME).await
            }
            Backend::Mock(store) => {
                Ok(mock::create_volume(store, availability_zone, size, snapshot_id).await)
            }
        }
    }

    async fn describe_volumes(&self, volume_ids: &[String]) -> Result<Response> {
        match &self.backend {
            Backend::Live(client) => {
                let mut params = params("DescribeVolumes");
                for (index, id) in volume_ids.iter().enumerate() {
                    params.insert(format!("VolumeId.{}", index + 1), id.clone());
                }
                client.request(params, &DESCRIBE_VOLUMES).await
            }
            Backend::Mock(store) => Ok(mock::describe_volumes(store, volume_ids)
                .await
                .into_result("ec2")?),
        }
    }

    async fn delete_volume(&self, volume_id: &str) -> Result<Response> {
        match &self.backend {
            Backend::Live(client) => {
                let mut params = params("DeleteVolume");
                params.insert("VolumeId".to_string(), volume_id.to_string());
                client.request(params, &DELETE_VOLUME).await
            }
            Backend::Mock(store) => Ok(mock::delete_volume(store, volume_id)
                .await
                .into_result("ec2")?),
        }
    }
}
