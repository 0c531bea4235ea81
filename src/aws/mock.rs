//! Simulated EC2 volume requests

use crate::mock::{self, MockEntry, MockStore};
use crate::response::Response;
use serde_json::{json, Map, Value};

/// Status every simulated volume starts in
pub const INITIAL_STATE: &str = "creating";

/// Status a simulated volume settles into once polled
pub const AVAILABLE_STATE: &str = "available";

/// Fields of the stored volume echoed back by `CreateVolume`
pub const CREATE_VOLUME_FIELDS: &[&str] = &[
    "availabilityZone",
    "createTime",
    "size",
    "snapshotId",
    "status",
    "volumeId",
];

pub async fn create_volume(
    store: &MockStore,
    availability_zone: Option<&str>,
    size: Option<u32>,
    snapshot_id: Option<&str>,
) -> Response {
    let (Some(availability_zone), Some(size)) = (availability_zone, size) else {
        let missing = if availability_zone.is_none() {
            "availability_zone"
        } else {
            "size"
        };
        tracing::debug!("mock CreateVolume rejected: missing {}", missing);
        return Response::missing_parameter(missing);
    };

    let volume_id = mock::volume_id();
    let mut data = Map::new();
    data.insert("availabilityZone".into(), json!(availability_zone));
    data.insert("attachmentSet".into(), json!([]));
    data.insert("createTime".into(), json!(chrono::Utc::now().to_rfc3339()));
    data.insert("size".into(), json!(size));
    data.insert("snapshotId".into(), json!(snapshot_id.unwrap_or("")));
    data.insert("status".into(), json!(INITIAL_STATE));
    data.insert("volumeId".into(), json!(volume_id));

    let mut body: Map<String, Value> = data
        .iter()
        .filter(|(key, _)| CREATE_VOLUME_FIELDS.contains(&key.as_str()))
        .map(|(k, v)| (k.clone(), v.clone()))
        .collect();
    body.insert("requestId".to_string(), Value::String(mock::request_id()));

    store
        .aws()
        .await
        .volumes
        .insert(volume_id.clone(), MockEntry::new(data));
    tracing::info!("mock CreateVolume {} in {}", volume_id, availability_zone);

    Response::ok(body)
}

pub async fn describe_volumes(store: &MockStore, volume_ids: &[String]) -> Response {
    let settle_polls = store.settle_polls();
    let mut data = store.aws().await;

    if let Some(missing) = volume_ids.iter().find(|id| !data.volumes.contains_key(*id)) {
        return Response::error(
            400,
            "InvalidVolume.NotFound",
            format!("The volume '{}' does not exist.", missing),
        );
    }

    let mut volumes: Vec<Value> = data
        .volumes
        .iter_mut()
        .filter(|(id, _)| volume_ids.is_empty() || volume_ids.contains(*id))
        .map(|(_, entry)| {
            entry.observe(INITIAL_STATE, AVAILABLE_STATE, settle_polls);
            Value::Object(entry.attributes.clone())
        })
        .collect();
    volumes.sort_by(|a, b| a["volumeId"].as_str().cmp(&b["volumeId"].as_str()));

    let mut body = Map::new();
    body.insert("requestId".to_string(), Value::String(mock::request_id()));
    body.insert("volumeSet".to_string(), Value::Array(volumes));
    Response::ok(body)
}

pub async fn delete_volume(store: &MockStore, volume_id: &str) -> Response {
    if store.aws().await.volumes.remove(volume_id).is_none() {
        return Response::error(
            400,
            "InvalidVolume.NotFound",
            format!("The volume '{}' does not exist.", volume_id),
        );
    }
    tracing::info!("mock DeleteVolume {}", volume_id);

    let mut body = Map::new();
    body.insert("requestId".to_string(), Value::String(mock::request_id()));
    body.insert("return".to_string(), Value::Bool(true));
    Response::ok(body)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_attachment_set_is_stored_but_not_echoed() {
        let store = MockStore::new();
        let response = create_volume(&store, Some("us-east-1a"), Some(5), None).await;
        assert!(!response.body.contains_key("attachmentSet"));

        let id = response.body["volumeId"].as_str().unwrap();
        let data = store.aws().await;
        assert!(data.volumes[id].attributes.contains_key("attachmentSet"));
    }

    #[tokio::test]
    async fn test_describe_advances_after_settle_polls() {
        let store = MockStore::with_settle_polls(1);
        let created = create_volume(&store, Some("us-east-1a"), Some(5), None).await;
        let id = created.body["volumeId"].as_str().unwrap().to_string();

        let first = describe_volumes(&store, &[id.clone()]).await;
        assert_eq!(first.body["volumeSet"][0]["status"], INITIAL_STATE);

        let second = describe_volumes(&store, &[id]).await;
        assert_eq!(second.body["volumeSet"][0]["status"], AVAILABLE_STATE);
    }

    #[tokio::test]
    async fn test_describe_unknown_volume() {
        let store = MockStore::new();
        let response = describe_volumes(&store, &["vol-00000000".to_string()]).await;
        assert_eq!(response.status, 400);
        assert_eq!(response.code(), Some("InvalidVolume.NotFound"));
    }

    #[tokio::test]
    async fn test_delete_removes_entry() {
        let store = MockStore::new();
        let created = create_volume(&store, Some("us-east-1a"), Some(5), None).await;
        let id = created.body["volumeId"].as_str().unwrap().to_string();

        assert!(delete_volume(&store, &id).await.is_success());
        assert_eq!(delete_volume(&store, &id).await.status, 400);
    }
}
