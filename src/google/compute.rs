//! Compute Engine request dispatcher

use super::client::GcpClient;
use super::mock;
use crate::mock::MockStore;
use crate::response::Response;
use crate::service::DiskService;
use anyhow::Result;
use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

#[derive(Clone)]
enum Backend {
    Live(GcpClient),
    Mock { store: Arc<MockStore>, project: String },
}

/// Compute Engine service handle
#[derive(Clone)]
pub struct Compute {
    backend: Backend,
}

impl Compute {
    pub fn live(client: GcpClient) -> Self {
        Self {
            backend: Backend::Live(client),
        }
    }

    pub fn mock(store: Arc<MockStore>, project: &str) -> Self {
        Self {
            backend: Backend::Mock {
                store,
                project: project.to_string(),
            },
        }
    }

    pub fn is_mocking(&self) -> bool {
        matches!(self.backend, Backend::Mock { .. })
    }
}

/// Resolve an image name to a URL; names without a slash live in the project's global images
fn source_image(client: &GcpClient, image: &str) -> String {
    if image.contains('/') {
        image.to_string()
    } else {
        client.compute_global_url(&format!("images/{}", image))
    }
}

#[async_trait]
impl DiskService for Compute {
    /// Create a persistent disk, optionally from an image
    ///
    /// The live API answers with a zonal operation; the disk itself appears
    /// in `CREATING` state right away.
    async fn insert_disk(
        &self,
        name: &str,
        size_gb: Option<u64>,
        zone: Option<&str>,
        image: Option<&str>,
    ) -> Result<Response> {
        match &self.backend {
            Backend::Live(client) => {
                let mut url = client.compute_zonal_url(zone.unwrap_or_default(), "disks");
                if let Some(image) = image {
                    url = format!(
                        "{}?sourceImage={}",
                        url,
                        urlencoding::encode(&source_image(client, image))
                    );
                }

                let mut body = json!({ "name": name });
                if let Some(size_gb) = size_gb {
                    body["sizeGb"] = json!(size_gb.to_string());
                }

                client.post(&url, Some(&body)).await
            }
            Backend::Mock { store, project } => {
                Ok(mock::insert_disk(store, project, name, size_gb, zone, image).await?)
            }
        }
    }

    async fn get_disk(&self, name: &str, zone: &str) -> Result<Response> {
        match &self.backend {
            Backend::Live(client) => {
                let url = client.compute_zonal_url(zone, &format!("disks/{}", name));
                client.get(&url).await
            }
            Backend::Mock { store, project } => {
                Ok(mock::get_disk(store, project, name, zone).await?)
            }
        }
    }

    async fn list_disks(&self, zone: &str) -> Result<Response> {
        match &self.backend {
            Backend::Live(client) => client.get(&client.compute_zonal_url(zone, "disks")).await,
            Backend::Mock { store, project } => Ok(mock::list_disks(store, project, zone).await),
        }
    }

    async fn delete_disk(&self, name: &str, zone: &str) -> Result<Response> {
        match &self.backend {
            Backend::Live(client) => {
                let url = client.compute_zonal_url(zone, &format!("disks/{}", name));
                client.delete(&url).await
            }
            Backend::Mock { store, project } => {
                Ok(mock::delete_disk(store, project, name, zone).await?)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::google::auth::TokenSource;

    #[test]
    fn test_source_image_resolution() {
        let client = GcpClient::with_tokens(
            "my-project",
            TokenSource::fixed("t"),
            "https://compute.googleapis.com/compute/v1",
        )
        .unwrap();

        assert_eq!(
            source_image(&client, "debian-12"),
            "https://compute.googleapis.com/compute/v1/projects/my-project/global/images/debian-12"
        );
        assert_eq!(
            source_image(&client, "projects/debian-cloud/global/images/family/debian-12"),
            "projects/debian-cloud/global/images/family/debian-12"
        );
    }

    #[tokio::test]
    async fn test_mock_round_trip() {
        let compute = Compute::mock(Arc::new(MockStore::new()), "my-project");
        assert!(compute.is_mocking());

        compute
            .insert_disk("disk-1", Some(20), Some("us-central1-a"), None)
            .await
            .unwrap();
        let disk = compute.get_disk("disk-1", "us-central1-a").await.unwrap();
        assert_eq!(disk.body["sizeGb"], "20");
        assert_eq!(disk.body["status"], "CREATING");
    }
}
