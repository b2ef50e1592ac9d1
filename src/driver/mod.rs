//! Volume registry and lifecycle.
//!
//! The registry is the sole mutable state of the daemon: a name→volume map
//! behind one reader-writer lock. Everything else — the state file, the
//! kernel mount table, the helper processes — is a projection of it and is
//! re-converged through the operations in this module and its submodules.

mod drain;
mod error;
mod mount;
mod state;
mod unmount;
mod volume;

pub use error::{DriverError, SafeError};
pub use volume::{ConnectionInfo, ConnectionOpts, Volume};

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::mounter::Mounter;
use crate::sys::{Clock, Invoker, MountChecker, OsHelper, Unmounter};

/// Capability token returned by Activate.
pub const DRIVER_CAPABILITY: &str = "VolumeDriver";

/// Volumes are local to this node; they are never shared across hosts.
pub const SCOPE: &str = "local";

/// A volume as reported to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VolumeSummary {
    pub name: String,
    pub mountpoint: PathBuf,
}

pub struct VolumeDriver {
    volumes: RwLock<HashMap<String, Volume>>,
    mount_root: PathBuf,
    mounter: Arc<dyn Mounter>,
    mount_checker: Arc<dyn MountChecker>,
    invoker: Arc<dyn Invoker>,
    unmounter: Arc<dyn Unmounter>,
    os_helper: Arc<dyn OsHelper>,
    clock: Arc<dyn Clock>,
}

impl VolumeDriver {
    /// Builds a driver rooted at `mount_root`. The root is made absolute
    /// here; failure to do so is unrecoverable misconfiguration and is
    /// surfaced to the caller to abort on.
    ///
    /// Call [`VolumeDriver::restore_state`] afterwards to reload the
    /// registry persisted by a previous run.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        mount_root: impl AsRef<Path>,
        mounter: Arc<dyn Mounter>,
        mount_checker: Arc<dyn MountChecker>,
        invoker: Arc<dyn Invoker>,
        unmounter: Arc<dyn Unmounter>,
        os_helper: Arc<dyn OsHelper>,
        clock: Arc<dyn Clock>,
    ) -> io::Result<Self> {
        let mount_root = std::path::absolute(mount_root)?;

        Ok(Self {
            volumes: RwLock::new(HashMap::new()),
            mount_root,
            mounter,
            mount_checker,
            invoker,
            unmounter,
            os_helper,
            clock,
        })
    }

    pub fn mount_root(&self) -> &Path {
        &self.mount_root
    }

    /// Static capability announcement for the orchestrator's plugin
    /// discovery.
    pub fn activate(&self) -> Vec<String> {
        vec![DRIVER_CAPABILITY.to_string()]
    }

    pub fn capabilities(&self) -> &'static str {
        SCOPE
    }

    /// Registers `name`, or re-binds its connection if it already exists.
    /// Mount state of an existing volume is preserved.
    pub async fn create(&self, name: &str, opts: serde_json::Value) -> Result<(), DriverError> {
        if name.is_empty() {
            return Err(DriverError::MissingVolumeName);
        }

        // A request without Opts decodes as null; treat it as an empty map so
        // it fails on the missing fields rather than on the decode.
        let opts = match opts {
            serde_json::Value::Null => serde_json::Value::Object(Default::default()),
            other => other,
        };
        let opts: ConnectionOpts =
            serde_json::from_value(opts).map_err(|err| DriverError::InvalidOpts(err.to_string()))?;

        if opts.bucket.is_empty() {
            return Err(DriverError::MissingOptsField("bucket"));
        }
        if opts.access_key_id.is_empty() {
            return Err(DriverError::MissingOptsField("access_key_id"));
        }
        if opts.secret_access_key.is_empty() {
            return Err(DriverError::MissingOptsField("secret_access_key"));
        }

        let connection = ConnectionInfo::from(opts);

        let mut volumes = self.volumes.write().await;
        match volumes.get_mut(name) {
            Some(existing) => {
                tracing::info!(volume = name, "updating-volume-connection");
                existing.connection = connection;
            }
            None => {
                tracing::info!(volume = name, "creating-volume");
                volumes.insert(name.to_string(), Volume::new(name, connection));
            }
        }

        self.persist_locked(&volumes)
            .map_err(|err| DriverError::PersistOnCreate(err.to_string()))?;

        Ok(())
    }

    pub async fn get(&self, name: &str) -> Result<VolumeSummary, DriverError> {
        let volume = self.get_volume(name).await?;
        Ok(VolumeSummary {
            name: volume.name,
            mountpoint: volume.mountpoint,
        })
    }

    /// Every volume with an outstanding mount reference. Registered volumes
    /// with no mounts have no mountpoint to advertise and are omitted.
    pub async fn list(&self) -> Vec<VolumeSummary> {
        let volumes = self.volumes.read().await;
        volumes
            .values()
            .filter(|v| v.mount_count >= 1)
            .map(|v| VolumeSummary {
                name: v.name.clone(),
                mountpoint: v.mountpoint.clone(),
            })
            .collect()
    }

    pub async fn path(&self, name: &str) -> Result<PathBuf, DriverError> {
        if name.is_empty() {
            return Err(DriverError::MissingVolumeName);
        }

        let volume = self
            .get_volume(name)
            .await
            .map_err(|_| DriverError::VolumeNotFound(name.to_string()))?;

        if !volume.has_mountpoint() {
            return Err(DriverError::NotPreviouslyMounted);
        }

        Ok(volume.mountpoint)
    }

    /// Deletes `name`, unmounting first if it has a mountpoint. Removing an
    /// unknown volume succeeds silently so that a Remove arriving after a
    /// drain is a no-op.
    pub async fn remove(&self, name: &str) -> Result<(), DriverError> {
        if name.is_empty() {
            return Err(DriverError::MissingVolumeName);
        }

        let mountpoint = {
            let volumes = self.volumes.read().await;
            match volumes.get(name) {
                Some(volume) => volume.mountpoint.clone(),
                None => {
                    tracing::info!(volume = name, "remove-volume-not-found");
                    return Ok(());
                }
            }
        };

        if !mountpoint.as_os_str().is_empty() {
            self.unmount_volume(name, &mountpoint).await?;
        }

        tracing::info!(volume = name, "removing-volume");

        let mut volumes = self.volumes.write().await;
        volumes.remove(name);

        self.persist_locked(&volumes)
            .map_err(|err| DriverError::PersistOnRemove(err.to_string()))?;

        Ok(())
    }

    async fn get_volume(&self, name: &str) -> Result<Volume, DriverError> {
        let volumes = self.volumes.read().await;
        volumes.get(name).cloned().ok_or(DriverError::NotFound)
    }
}
