//! Simulated Compute Engine disk requests

use crate::error::CloudError;
use crate::mock::{self, MockEntry, MockStore};
use crate::response::Response;
use serde_json::{json, Map, Value};

/// Status every simulated disk starts in
pub const INITIAL_STATE: &str = "CREATING";

/// Status a simulated disk settles into once polled
pub const READY_STATE: &str = "READY";

const MOCK_BASE_URL: &str = "https://www.googleapis.com/compute/v1";

fn zone_url(project: &str, zone: &str) -> String {
    format!("{}/projects/{}/zones/{}", MOCK_BASE_URL, project, zone)
}

fn disk_url(project: &str, zone: &str, name: &str) -> String {
    format!("{}/disks/{}", zone_url(project, zone), name)
}

fn not_found(project: &str, zone: &str, name: &str) -> CloudError {
    CloudError::Provider {
        provider: "compute",
        status: 404,
        code: "notFound".to_string(),
        message: format!(
            "The resource 'projects/{}/zones/{}/disks/{}' was not found",
            project, zone, name
        ),
    }
}

fn already_exists(project: &str, zone: &str, name: &str) -> CloudError {
    CloudError::Provider {
        provider: "compute",
        status: 409,
        code: "alreadyExists".to_string(),
        message: format!(
            "The resource 'projects/{}/zones/{}/disks/{}' already exists",
            project, zone, name
        ),
    }
}

fn operation(project: &str, zone: &str, name: &str, operation_type: &str) -> Map<String, Value> {
    let id = mock::numeric_id();
    let mut body = Map::new();
    body.insert("kind".into(), json!("compute#operation"));
    body.insert("id".into(), json!(id));
    body.insert("name".into(), json!(format!("operation-{}", id)));
    body.insert("zone".into(), json!(zone_url(project, zone)));
    body.insert("operationType".into(), json!(operation_type));
    body.insert("targetLink".into(), json!(disk_url(project, zone, name)));
    body.insert("status".into(), json!("DONE"));
    body.insert("progress".into(), json!(100));
    body.insert("insertTime".into(), json!(chrono::Utc::now().to_rfc3339()));
    body
}

pub async fn insert_disk(
    store: &MockStore,
    project: &str,
    name: &str,
    size_gb: Option<u64>,
    zone: Option<&str>,
    image: Option<&str>,
) -> Result<Response, CloudError> {
    let (Some(zone), Some(size_gb)) = (zone, size_gb) else {
        let missing = if zone.is_none() { "zone" } else { "size_gb" };
        tracing::debug!("mock insert_disk rejected: missing {}", missing);
        return Ok(Response::missing_parameter(missing));
    };

    // Disks are keyed by name, so a name taken in any zone is rejected
    let mut google = store.google().await;
    if google.disks.contains_key(name) {
        tracing::debug!("mock insert_disk rejected: {} already exists", name);
        return Err(already_exists(project, zone, name));
    }

    let mut data = Map::new();
    data.insert("kind".into(), json!("compute#disk"));
    data.insert("id".into(), json!(mock::numeric_id()));
    data.insert(
        "creationTimestamp".into(),
        json!(chrono::Utc::now().to_rfc3339()),
    );
    data.insert("zone".into(), json!(zone_url(project, zone)));
    data.insert("status".into(), json!(INITIAL_STATE));
    data.insert("name".into(), json!(name));
    // Compute Engine encodes int64 fields as strings
    data.insert("sizeGb".into(), json!(size_gb.to_string()));
    data.insert("selfLink".into(), json!(disk_url(project, zone, name)));
    if let Some(image) = image {
        data.insert("sourceImage".into(), json!(image));
    }

    google.disks.insert(name.to_string(), MockEntry::new(data));
    tracing::info!("mock insert_disk {} in {}", name, zone);

    Ok(Response::ok(operation(project, zone, name, "insert")))
}

fn entry_in_zone<'a>(
    disks: &'a mut std::collections::HashMap<String, MockEntry>,
    project: &str,
    zone: &str,
    name: &str,
) -> Option<&'a mut MockEntry> {
    let expected_zone = zone_url(project, zone);
    disks
        .get_mut(name)
        .filter(|entry| {
            entry.attributes.get("zone").and_then(|v| v.as_str()) == Some(expected_zone.as_str())
        })
}

pub async fn get_disk(
    store: &MockStore,
    project: &str,
    name: &str,
    zone: &str,
) -> Result<Response, CloudError> {
    let settle_polls = store.settle_polls();
    let mut data = store.google().await;

    let entry = entry_in_zone(&mut data.disks, project, zone, name)
        .ok_or_else(|| not_found(project, zone, name))?;
    entry.observe(INITIAL_STATE, READY_STATE, settle_polls);

    Ok(Response::ok(entry.attributes.clone()))
}

pub async fn list_disks(store: &MockStore, project: &str, zone: &str) -> Response {
    let settle_polls = store.settle_polls();
    let expected_zone = zone_url(project, zone);
    let mut data = store.google().await;

    let mut items: Vec<Value> = data
        .disks
        .values_mut()
        .filter(|entry| {
            entry.attributes.get("zone").and_then(|v| v.as_str()) == Some(expected_zone.as_str())
        })
        .map(|entry| {
            entry.observe(INITIAL_STATE, READY_STATE, settle_polls);
            Value::Object(entry.attributes.clone())
        })
        .collect();
    items.sort_by(|a, b| a["name"].as_str().cmp(&b["name"].as_str()));

    let mut body = Map::new();
    body.insert("kind".into(), json!("compute#diskList"));
    body.insert("items".into(), Value::Array(items));
    Response::ok(body)
}

pub async fn delete_disk(
    store: &MockStore,
    project: &str,
    name: &str,
    zone: &str,
) -> Result<Response, CloudError> {
    let mut data = store.google().await;

    if entry_in_zone(&mut data.disks, project, zone, name).is_none() {
        return Err(not_found(project, zone, name));
    }
    data.disks.remove(name);
    tracing::info!("mock delete_disk {} in {}", name, zone);

    Ok(Response::ok(operation(project, zone, name, "delete")))
}
