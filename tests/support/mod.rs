//! Shared fakes for driving the registry without privileges: an in-memory
//! kernel mount table and capability fakes wired to it.

// Each integration-test binary compiles its own copy; not every binary uses
// every fake.
#![allow(dead_code)]

use std::collections::HashSet;
use std::io;
use std::os::unix::process::ExitStatusExt;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

use s3_volume_driver::driver::{SafeError, VolumeDriver};
use s3_volume_driver::mounter::{MountParams, Mounter, MounterError};
use s3_volume_driver::sys::{
    Clock, InvokeError, Invoker, MountChecker, OsHelper, Unmounter,
};

/// Stand-in for the kernel mount table, shared by all fakes of one test.
#[derive(Default)]
pub struct MountTable {
    mounted: Mutex<HashSet<PathBuf>>,
}

impl MountTable {
    pub fn insert(&self, path: &Path) {
        self.mounted.lock().unwrap().insert(path.to_path_buf());
    }

    pub fn remove(&self, path: &Path) {
        self.mounted.lock().unwrap().remove(path);
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.mounted.lock().unwrap().contains(path)
    }

    pub fn paths(&self) -> Vec<PathBuf> {
        self.mounted.lock().unwrap().iter().cloned().collect()
    }

    pub fn is_empty(&self) -> bool {
        self.mounted.lock().unwrap().is_empty()
    }
}

pub enum MountBehavior {
    Succeed,
    Fail,
    FailSafe(String),
}

/// Records launches and marks the path mounted on success.
pub struct FakeMounter {
    table: Arc<MountTable>,
    pub behavior: Mutex<MountBehavior>,
    pub launches: Mutex<Vec<MountParams>>,
    pub terminated: Mutex<Vec<String>>,
}

impl FakeMounter {
    pub fn new(table: Arc<MountTable>) -> Self {
        Self {
            table,
            behavior: Mutex::new(MountBehavior::Succeed),
            launches: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }

    pub fn set_behavior(&self, behavior: MountBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().unwrap().len()
    }
}

#[async_trait]
impl Mounter for FakeMounter {
    async fn mount(&self, _volume_name: &str, params: MountParams) -> Result<(), MounterError> {
        let mount_point = params.mount_point.clone();
        self.launches.lock().unwrap().push(params);

        match &*self.behavior.lock().unwrap() {
            MountBehavior::Succeed => {
                self.table.insert(&mount_point);
                Ok(())
            }
            MountBehavior::Fail => Err(MounterError::MountFailed),
            MountBehavior::FailSafe(description) => {
                Err(MounterError::Safe(SafeError::new(description.clone())))
            }
        }
    }

    async fn terminate(&self, volume_name: &str) {
        self.terminated.lock().unwrap().push(volume_name.to_string());
    }
}

pub struct FakeChecker {
    table: Arc<MountTable>,
}

impl FakeChecker {
    pub fn new(table: Arc<MountTable>) -> Self {
        Self { table }
    }
}

#[async_trait]
impl MountChecker for FakeChecker {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.table.contains(path))
    }

    async fn list(&self, pattern: &Regex) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .table
            .paths()
            .into_iter()
            .filter(|p| pattern.is_match(&p.to_string_lossy()))
            .collect())
    }
}

/// `mountpoint -q` succeeds when the table holds the path; `umount` drops
/// it.
pub struct FakeInvoker {
    table: Arc<MountTable>,
}

impl FakeInvoker {
    pub fn new(table: Arc<MountTable>) -> Self {
        Self { table }
    }
}

fn empty_output() -> Output {
    Output {
        status: ExitStatus::from_raw(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

#[async_trait]
impl Invoker for FakeInvoker {
    async fn invoke(
        &self,
        cmd: &str,
        args: &[&str],
        _timeout: Duration,
    ) -> Result<Output, InvokeError> {
        match cmd {
            "mountpoint" => {
                let path = Path::new(args[1]);
                if self.table.contains(path) {
                    Ok(empty_output())
                } else {
                    Err(InvokeError::Failed {
                        cmd: cmd.to_string(),
                        status: ExitStatus::from_raw(256),
                        stderr: String::new(),
                    })
                }
            }
            "umount" => {
                let path = Path::new(args[args.len() - 1]);
                self.table.remove(path);
                Ok(empty_output())
            }
            _ => Ok(empty_output()),
        }
    }
}

pub struct FakeUnmounter {
    table: Arc<MountTable>,
}

impl FakeUnmounter {
    pub fn new(table: Arc<MountTable>) -> Self {
        Self { table }
    }
}

impl Unmounter for FakeUnmounter {
    fn unmount(&self, path: &Path) -> io::Result<()> {
        if !self.table.contains(path) {
            return Err(io::Error::other("not mounted"));
        }
        self.table.remove(path);
        Ok(())
    }
}

/// Tests must not flip the process-wide umask; parallel tests would race.
pub struct NoopOsHelper;

impl OsHelper for NoopOsHelper {
    fn umask(&self, _mask: u32) -> u32 {
        0
    }
}

pub struct TestClock;

impl Clock for TestClock {
    fn now(&self) -> std::time::Instant {
        std::time::Instant::now()
    }
}

pub struct TestHarness {
    pub driver: Arc<VolumeDriver>,
    pub mounter: Arc<FakeMounter>,
    pub table: Arc<MountTable>,
    pub root: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        let root = tempfile::tempdir().unwrap();
        let table = Arc::new(MountTable::default());
        let mounter = Arc::new(FakeMounter::new(table.clone()));
        let driver = Arc::new(build_driver(root.path(), &table, &mounter));

        Self {
            driver,
            mounter,
            table,
            root,
        }
    }

    /// A second driver over the same mount root and fake kernel table,
    /// simulating a daemon restart.
    pub fn restarted(&self) -> (Arc<VolumeDriver>, Arc<FakeMounter>) {
        let mounter = Arc::new(FakeMounter::new(self.table.clone()));
        let driver = Arc::new(build_driver(self.root.path(), &self.table, &mounter));
        (driver, mounter)
    }

    pub fn state_file(&self) -> PathBuf {
        self.root.path().join("driver-state.json")
    }
}

fn build_driver(
    root: &Path,
    table: &Arc<MountTable>,
    mounter: &Arc<FakeMounter>,
) -> VolumeDriver {
    VolumeDriver::new(
        root,
        mounter.clone(),
        Arc::new(FakeChecker::new(table.clone())),
        Arc::new(FakeInvoker::new(table.clone())),
        Arc::new(FakeUnmounter::new(table.clone())),
        Arc::new(NoopOsHelper),
        Arc::new(TestClock),
    )
    .unwrap()
}

/// Standard well-formed Create opts.
pub fn opts(bucket: &str) -> serde_json::Value {
    serde_json::json!({
        "bucket": bucket,
        "access_key_id": "AKIATEST",
        "secret_access_key": "secret",
    })
}
