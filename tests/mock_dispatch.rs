//! Mock mode scenarios and property-based tests
//!
//! These tests drive the providers against an in-memory store: creation
//! echo shape, missing parameter priority, id uniqueness and the
//! poll-driven lifecycle.

use nimbus::aws::Ec2;
use nimbus::google::Compute;
use nimbus::mock::MockStore;
use nimbus::model::{DiskPatch, Disks};
use nimbus::service::{DiskService, VolumeService};
use proptest::prelude::*;
use std::collections::BTreeSet;
use std::sync::Arc;

fn ec2() -> (Arc<MockStore>, Ec2) {
    let store = Arc::new(MockStore::new());
    (store.clone(), Ec2::mock(store))
}

fn keys(response: &nimbus::Response) -> BTreeSet<&str> {
    response.body.keys().map(String::as_str).collect()
}

mod volume_tests {
    use super::*;

    #[tokio::test]
    async fn test_create_volume_echoes_whitelist() {
        let (_, ec2) = ec2();
        let response = ec2
            .create_volume(Some("us-central1-a"), Some(10), None)
            .await
            .unwrap();

        assert_eq!(response.status, 200);
        assert_eq!(response.body["availabilityZone"], "us-central1-a");
        assert_eq!(response.body["size"], 10);
        assert_eq!(response.body["status"], "creating");
        assert!(response.body["volumeId"].as_str().unwrap().starts_with("vol-"));

        let expected: BTreeSet<&str> = [
            "availabilityZone",
            "createTime",
            "size",
            "snapshotId",
            "status",
            "volumeId",
            "requestId",
        ]
        .into_iter()
        .collect();
        assert_eq!(keys(&response), expected);
    }

    #[tokio::test]
    async fn test_missing_zone_is_reported() {
        let (store, ec2) = ec2();
        let response = ec2.create_volume(None, Some(10), None).await.unwrap();

        assert_eq!(response.status, 400);
        assert_eq!(response.code(), Some("MissingParameter"));
        assert!(response.message().unwrap().contains("availability_zone"));
        assert!(store.aws().await.volumes.is_empty());
    }

    #[tokio::test]
    async fn test_zone_is_checked_before_size() {
        let (_, ec2) = ec2();
        let response = ec2.create_volume(None, None, None).await.unwrap();
        assert!(response.message().unwrap().contains("availability_zone"));

        let response = ec2.create_volume(Some("us-east-1a"), None, None).await.unwrap();
        assert_eq!(
            response.message(),
            Some("The request must contain the parameter size")
        );
    }

    #[tokio::test]
    async fn test_identical_creates_get_distinct_ids() {
        let (store, ec2) = ec2();
        let first = ec2.create_volume(Some("us-east-1a"), Some(5), None).await.unwrap();
        let second = ec2.create_volume(Some("us-east-1a"), Some(5), None).await.unwrap();

        assert_ne!(first.body["volumeId"], second.body["volumeId"]);
        assert_eq!(store.aws().await.volumes.len(), 2);
    }

    #[tokio::test]
    async fn test_reset_clears_store() {
        let (store, ec2) = ec2();
        ec2.create_volume(Some("us-east-1a"), Some(5), None).await.unwrap();
        store.reset().await;

        let response = ec2.describe_volumes(&[]).await.unwrap();
        assert_eq!(response.body["volumeSet"].as_array().unwrap().len(), 0);
    }
}

mod disk_tests {
    use super::*;

    fn disks() -> (Arc<MockStore>, Disks) {
        let store = Arc::new(MockStore::new());
        let compute = Compute::mock(store.clone(), "test-project");
        (store, Disks::new(Arc::new(compute)))
    }

    #[tokio::test]
    async fn test_disk_becomes_ready_after_polling() {
        let (_, disks) = disks();
        let mut disk = disks.build(DiskPatch {
            name: Some("disk-1".into()),
            zone_name: Some("us-central1-a".into()),
            size_gb: Some(10),
            ..Default::default()
        });
        disk.save().await.unwrap();
        assert_eq!(disk.status(), Some("CREATING"));

        // save already polled once; the next fetch settles the disk
        assert!(disk.ready().await.unwrap());
        assert_eq!(disk.status(), Some("READY"));
        assert_eq!(disk.zone_name(), Some("us-central1-a"));

        let boot = disk.get_as_boot_disk(true);
        assert_eq!(boot["source"], disk.self_link().unwrap());
        assert_eq!(boot["mode"], "READ_WRITE");
    }

    #[tokio::test]
    async fn test_slow_store_keeps_disk_creating() {
        let store = Arc::new(MockStore::with_settle_polls(3));
        let disks = Disks::new(Arc::new(Compute::mock(store, "test-project")));
        let mut disk = disks.build(DiskPatch {
            name: Some("disk-1".into()),
            zone_name: Some("us-central1-a".into()),
            size_gb: Some(10),
            ..Default::default()
        });
        disk.save().await.unwrap();

        assert!(!disk.ready().await.unwrap());
        assert!(!disk.ready().await.unwrap());
        assert!(disk.ready().await.unwrap());
    }

    #[tokio::test]
    async fn test_insert_without_zone_or_size() {
        let (store, _) = disks();
        let compute = Compute::mock(store.clone(), "test-project");

        let response = compute.insert_disk("d", None, None, None).await.unwrap();
        assert!(response.message().unwrap().ends_with("zone"));

        let response = compute
            .insert_disk("d", None, Some("us-central1-a"), None)
            .await
            .unwrap();
        assert!(response.message().unwrap().ends_with("size_gb"));
        assert!(store.google().await.disks.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_name_does_not_replace_disk() {
        let (_, disks) = disks();
        let patch = |zone: &str| DiskPatch {
            name: Some("data".into()),
            zone_name: Some(zone.to_string()),
            size_gb: Some(10),
            ..Default::default()
        };
        disks.build(patch("us-central1-a")).save().await.unwrap();

        let err = disks.build(patch("us-east1-b")).save().await.unwrap_err();
        assert!(err.to_string().contains("alreadyExists"));

        let zones = ["us-central1-a".to_string(), "us-east1-b".to_string()];
        let found = disks.all_in_zones(&zones).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].zone_name(), Some("us-central1-a"));
    }

    #[tokio::test]
    async fn test_destroy_then_get_is_none() {
        let (_, disks) = disks();
        let mut disk = disks.build(DiskPatch {
            name: Some("disk-1".into()),
            zone_name: Some("us-central1-a".into()),
            size_gb: Some(10),
            ..Default::default()
        });
        disk.save().await.unwrap();
        disk.destroy().await.unwrap();

        assert!(disks.get("disk-1", "us-central1-a").await.unwrap().is_none());
    }
}

proptest! {
    #[test]
    fn prop_missing_zone_always_wins(size in proptest::option::of(1u32..16_384)) {
        let (_, ec2) = ec2();
        let response = tokio_test::block_on(ec2.create_volume(None, size, None)).unwrap();

        prop_assert_eq!(response.status, 400);
        prop_assert_eq!(
            response.message(),
            Some("The request must contain the parameter availability_zone")
        );
    }

    #[test]
    fn prop_create_echoes_inputs(
        zone in "[a-z]{2}-[a-z]{4,9}-[1-9][a-f]",
        size in 1u32..16_384,
        snapshot in proptest::option::of("snap-[0-9a-f]{8}"),
    ) {
        let (store, ec2) = ec2();
        let response = tokio_test::block_on(
            ec2.create_volume(Some(zone.as_str()), Some(size), snapshot.as_deref()),
        )
        .unwrap();

        prop_assert_eq!(response.status, 200);
        prop_assert_eq!(response.body["availabilityZone"].as_str(), Some(zone.as_str()));
        prop_assert_eq!(response.body["size"].as_u64(), Some(u64::from(size)));
        prop_assert_eq!(
            response.body["snapshotId"].as_str(),
            Some(snapshot.as_deref().unwrap_or(""))
        );
        prop_assert_eq!(keys(&response).len(), 7);

        let id = response.body["volumeId"].as_str().unwrap().to_string();
        prop_assert!(tokio_test::block_on(store.aws()).volumes.contains_key(&id));
    }

    #[test]
    fn prop_n_creates_make_n_entries(count in 1usize..20) {
        let (store, ec2) = ec2();
        let ids: BTreeSet<String> = (0..count)
            .map(|_| {
                let response =
                    tokio_test::block_on(ec2.create_volume(Some("us-east-1a"), Some(1), None))
                        .unwrap();
                response.body["volumeId"].as_str().unwrap().to_string()
            })
            .collect();

        prop_assert_eq!(ids.len(), count);
        prop_assert_eq!(tokio_test::block_on(store.aws()).volumes.len(), count);
    }
}
