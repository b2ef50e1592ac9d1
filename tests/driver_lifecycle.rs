//! Lifecycle tests for the volume registry, driven through fake OS
//! capabilities so no privileges or real FUSE helpers are needed.

mod support;

use support::{opts, MountBehavior, TestHarness};

#[tokio::test]
async fn create_validates_mandatory_fields() {
    let h = TestHarness::new();

    let err = h.driver.create("", opts("b")).await.unwrap_err();
    assert_eq!(err.to_string(), "Missing mandatory 'volume_name'");

    let err = h
        .driver
        .create("v1", serde_json::json!({"access_key_id": "a", "secret_access_key": "s"}))
        .await
        .unwrap_err();
    assert_eq!(err.to_string(), "Missing mandatory 'bucket' field in 'Opts'");

    let err = h
        .driver
        .create("v1", serde_json::json!({"bucket": "b", "secret_access_key": "s"}))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing mandatory 'access_key_id' field in 'Opts'"
    );

    let err = h
        .driver
        .create("v1", serde_json::json!({"bucket": "b", "access_key_id": "a"}))
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Missing mandatory 'secret_access_key' field in 'Opts'"
    );
}

#[tokio::test]
async fn mount_requires_prior_create() {
    let h = TestHarness::new();

    let err = h.driver.mount("ghost").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Volume 'ghost' must be created before being mounted"
    );
}

#[tokio::test]
async fn full_lifecycle_mount_get_list_unmount() {
    let h = TestHarness::new();
    let expected = h.root.path().join("v1");

    h.driver.create("v1", opts("bucket-1")).await.unwrap();

    let mountpoint = h.driver.mount("v1").await.unwrap();
    assert_eq!(mountpoint, expected);
    assert!(expected.is_dir());
    assert!(h.table.contains(&expected));
    assert!(h.state_file().exists());
    assert_eq!(h.mounter.launch_count(), 1);

    let launch = h.mounter.launches.lock().unwrap()[0].clone();
    assert_eq!(launch.bucket, "bucket-1");
    assert_eq!(launch.access_key_id, "AKIATEST");
    assert!(launch.mount_options.contains_key("allow_other"));

    let volume = h.driver.get("v1").await.unwrap();
    assert_eq!(volume.name, "v1");
    assert_eq!(volume.mountpoint, expected);

    let listed = h.driver.list().await;
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].name, "v1");

    assert_eq!(h.driver.path("v1").await.unwrap(), expected);

    h.driver.unmount("v1").await.unwrap();
    assert!(!expected.exists());
    assert!(h.table.is_empty());
    assert!(h.driver.list().await.is_empty());
    assert_eq!(
        h.driver.get("v1").await.unwrap_err().to_string(),
        "Volume not found"
    );
}

#[tokio::test]
async fn mount_is_reference_counted() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b")).await.unwrap();

    let first = h.driver.mount("v1").await.unwrap();
    let second = h.driver.mount("v1").await.unwrap();
    assert_eq!(first, second);
    // the helper is launched exactly once for the first reference
    assert_eq!(h.mounter.launch_count(), 1);

    h.driver.unmount("v1").await.unwrap();
    // one reference remains: still registered and mounted
    assert!(h.driver.get("v1").await.is_ok());
    assert!(h.table.contains(&first));

    h.driver.unmount("v1").await.unwrap();
    assert!(h.driver.get("v1").await.is_err());
    assert!(!first.exists());
}

#[tokio::test]
async fn registered_but_unmounted_volumes_are_not_listed() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b")).await.unwrap();

    assert!(h.driver.list().await.is_empty());
    assert_eq!(
        h.driver.path("v1").await.unwrap_err().to_string(),
        "Volume not previously mounted"
    );
}

#[tokio::test]
async fn create_overwrites_connection_in_place() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("old-bucket")).await.unwrap();
    h.driver.create("v1", opts("new-bucket")).await.unwrap();

    h.driver.mount("v1").await.unwrap();

    let launch = h.mounter.launches.lock().unwrap()[0].clone();
    assert_eq!(launch.bucket, "new-bucket");
}

#[tokio::test]
async fn mounter_failure_is_stored_and_replayed() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b")).await.unwrap();
    h.mounter.set_behavior(MountBehavior::Fail);

    let err = h.driver.mount("v1").await.unwrap_err();
    assert_eq!(err.to_string(), "something went wrong with mounter");

    // the error sticks to the volume until a successful mount supersedes it
    let err = h.driver.mount("v1").await.unwrap_err();
    assert_eq!(err.to_string(), "something went wrong with mounter");
    assert_eq!(h.mounter.launch_count(), 1);
}

#[tokio::test]
async fn safe_mounter_failure_is_stored_as_json() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b")).await.unwrap();
    h.mounter
        .set_behavior(MountBehavior::FailSafe("endpoint unreachable".to_string()));

    let err = h.driver.mount("v1").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "{\"SafeDescription\":\"endpoint unreachable\"}"
    );
}

#[tokio::test]
async fn silently_lost_mount_is_remounted() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b")).await.unwrap();

    let mountpoint = h.driver.mount("v1").await.unwrap();
    assert_eq!(h.mounter.launch_count(), 1);

    // the helper dies behind the registry's back
    h.table.remove(&mountpoint);

    let remounted = h.driver.mount("v1").await.unwrap();
    assert_eq!(remounted, mountpoint);
    assert_eq!(h.mounter.launch_count(), 2);
    assert!(h.table.contains(&mountpoint));
}

#[tokio::test]
async fn unmount_boundary_errors() {
    let h = TestHarness::new();

    assert_eq!(
        h.driver.unmount("").await.unwrap_err().to_string(),
        "Missing mandatory 'volume_name'"
    );
    assert_eq!(
        h.driver.unmount("ghost").await.unwrap_err().to_string(),
        "Volume 'ghost' not found"
    );

    h.driver.create("v1", opts("b")).await.unwrap();
    assert_eq!(
        h.driver.unmount("v1").await.unwrap_err().to_string(),
        "Volume not previously mounted"
    );
}

#[tokio::test]
async fn unmount_reports_vanished_mountpoint() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b")).await.unwrap();
    let mountpoint = h.driver.mount("v1").await.unwrap();

    // kernel mount disappeared entirely (machine reboot, manual umount)
    h.table.remove(&mountpoint);

    let err = h.driver.unmount("v1").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        format!("Volume v1 does not exist (path: {})", mountpoint.display())
    );
    // the stale directory was still cleaned up
    assert!(!mountpoint.exists());
}

#[tokio::test]
async fn remove_is_silent_for_unknown_and_unmounts_first() {
    let h = TestHarness::new();

    // unknown volume: success, e.g. a Remove arriving after a drain
    h.driver.remove("ghost").await.unwrap();

    h.driver.create("v1", opts("b")).await.unwrap();
    let mountpoint = h.driver.mount("v1").await.unwrap();

    h.driver.remove("v1").await.unwrap();
    assert!(h.driver.get("v1").await.is_err());
    assert!(!mountpoint.exists());
    assert!(h.table.is_empty());

    // remove after remove is a no-op
    h.driver.remove("v1").await.unwrap();
}

#[tokio::test]
async fn restart_restores_mounted_volumes() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b")).await.unwrap();
    let mountpoint = h.driver.mount("v1").await.unwrap();

    let (restarted, _mounter) = h.restarted();
    restarted.restore_state().await;

    // the mount survived the daemon restart and Path still answers
    assert_eq!(restarted.path("v1").await.unwrap(), mountpoint);

    restarted.unmount("v1").await.unwrap();
    assert!(!mountpoint.exists());
    assert!(h.table.is_empty());
}

#[tokio::test]
async fn restore_evicts_entries_without_bucket() {
    let h = TestHarness::new();
    let stale_dir = h.root.path().join("stale");
    std::fs::create_dir_all(&stale_dir).unwrap();

    let state = serde_json::json!({
        "stale": {
            "Name": "stale",
            "Mountpoint": stale_dir,
            "MountCount": 1,
            "ConnectionInfo": {"Bucket": ""}
        },
        "kept": {
            "Name": "kept",
            "Mountpoint": h.root.path().join("kept"),
            "MountCount": 1,
            "ConnectionInfo": {"Bucket": "b"}
        }
    });
    std::fs::write(h.state_file(), serde_json::to_vec(&state).unwrap()).unwrap();

    h.driver.restore_state().await;

    assert!(h.driver.get("stale").await.is_err());
    assert!(!stale_dir.exists());
    assert!(h.driver.get("kept").await.is_ok());

    // the normalized file no longer carries the evicted entry
    let contents: serde_json::Value =
        serde_json::from_slice(&std::fs::read(h.state_file()).unwrap()).unwrap();
    assert!(contents.get("stale").is_none());
    assert!(contents.get("kept").is_some());
}

#[tokio::test]
async fn restore_then_persist_is_a_fixed_point() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b1")).await.unwrap();
    h.driver.mount("v1").await.unwrap();
    h.driver.create("v2", opts("b2")).await.unwrap();

    let before: serde_json::Value =
        serde_json::from_slice(&std::fs::read(h.state_file()).unwrap()).unwrap();

    let (restarted, _) = h.restarted();
    restarted.restore_state().await;

    let after: serde_json::Value =
        serde_json::from_slice(&std::fs::read(h.state_file()).unwrap()).unwrap();
    assert_eq!(before, after);
}

#[tokio::test]
async fn drain_converges_everything() {
    let h = TestHarness::new();
    h.driver.create("v1", opts("b1")).await.unwrap();
    h.driver.create("v2", opts("b2")).await.unwrap();
    let m1 = h.driver.mount("v1").await.unwrap();
    let m2 = h.driver.mount("v2").await.unwrap();

    h.driver.drain().await;

    assert!(h.driver.list().await.is_empty());
    assert!(h.driver.get("v1").await.is_err());
    assert!(!m1.exists());
    assert!(!m2.exists());
    assert!(h.table.is_empty());
    assert!(!h.state_file().exists());

    // a volume drained away must be created again before mounting
    let err = h.driver.mount("v1").await.unwrap_err();
    assert_eq!(
        err.to_string(),
        "Volume 'v1' must be created before being mounted"
    );

    // drain is idempotent
    h.driver.drain().await;
}

#[tokio::test]
async fn drain_purges_mounts_the_registry_lost() {
    let h = TestHarness::new();

    // a mount under the root that no registry entry knows about
    let orphan = h.root.path().join("orphan");
    std::fs::create_dir_all(&orphan).unwrap();
    h.table.insert(&orphan);

    h.driver.drain().await;

    assert!(h.table.is_empty());
    assert!(!orphan.exists());
}
