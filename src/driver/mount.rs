use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::mounter::{MountParams, MounterError};
use crate::sys::{self, UmaskGuard};

use super::{ConnectionInfo, DriverError, VolumeDriver};

/// Mounts taking longer than this risk container-creation timeouts in the
/// orchestrator; they are logged but not aborted.
const MOUNT_DURATION_WARN: Duration = Duration::from_secs(8);

/// Deadline for the `mountpoint -q` liveness probe.
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

impl VolumeDriver {
    /// Mounts `name`, launching the FUSE helper when this is the first
    /// outstanding reference.
    ///
    /// The operation runs as three critical sections with the helper launch
    /// in between, outside the lock, so that a slow FUSE handshake for one
    /// volume does not block requests for others. Only the caller that takes
    /// the reference count from zero to one launches; concurrent callers for
    /// the same volume fall through to the liveness re-probe at the end.
    pub async fn mount(&self, name: &str) -> Result<PathBuf, DriverError> {
        if name.is_empty() {
            return Err(DriverError::MissingVolumeName);
        }

        let must_launch;
        let connection;
        let mount_path;

        {
            let mut volumes = self.volumes.write().await;
            let volume = volumes
                .get_mut(name)
                .ok_or_else(|| DriverError::NotCreated(name.to_string()))?;

            let path = self.mount_path(&volume.name);
            tracing::info!(volume = name, mountpoint = %path.display(), bucket = %volume.connection.bucket, "mounting-volume");

            must_launch = volume.mount_count < 1;
            connection = volume.connection.clone();
            mount_path = path.clone();

            volume.mountpoint = path;
            volume.mount_count += 1;
            tracing::info!(volume = name, count = volume.mount_count, "volume-ref-count-incremented");

            self.persist_locked(&volumes)
                .map_err(|err| DriverError::PersistOnMount(err.to_string()))?;
        }

        if must_launch {
            let started = self.clock.now();
            let result = self.mount_volume(&connection, &mount_path, name).await;
            let elapsed = self.clock.now().saturating_duration_since(started);

            if elapsed > MOUNT_DURATION_WARN {
                tracing::warn!(
                    volume = name,
                    mount_duration_in_seconds = elapsed.as_secs(),
                    "mount-duration-too-high: this may result in container creation failure"
                );
            }

            let mut volumes = self.volumes.write().await;
            match volumes.get_mut(name) {
                None => return Err(DriverError::VolumeNotFound(name.to_string())),
                Some(volume) => match result {
                    Ok(()) => volume.mount_error = None,
                    Err(err) => volume.mount_error = Some(err.stored_form()),
                },
            }
        }

        let volumes = self.volumes.write().await;
        let volume = volumes
            .get(name)
            .ok_or_else(|| DriverError::VolumeNotFound(name.to_string()))?;

        if let Some(err) = &volume.mount_error {
            return Err(DriverError::MountFailed(err.clone()));
        }

        // A helper can die between two Mount calls without the registry
        // noticing; verify the kernel still has the mount before handing the
        // path out again, and repair it inline if not. This is a rare
        // recovery branch, so mounting under the lock is acceptable.
        if !must_launch && !self.check(name, &volume.mountpoint).await {
            if let Err(err) = self.mount_volume(&volume.connection, &mount_path, name).await {
                tracing::error!(volume = name, error = %err, "remount-volume-failed");
                return Err(DriverError::Remount(err.to_string()));
            }
        }

        Ok(volume.mountpoint.clone())
    }

    /// Resolves the mount path for a volume, creating the mount root if it
    /// has gone missing. An unusable mount root means every volume operation
    /// is doomed, so failure here aborts the process.
    pub(super) fn mount_path(&self, volume_id: &str) -> PathBuf {
        let _umask = UmaskGuard::clear(&*self.os_helper);

        if let Err(err) = std::fs::create_dir_all(&self.mount_root) {
            sys::fatal("mkdir-rootpath-failed", &err);
        }

        self.mount_root.join(volume_id)
    }

    /// Prepares the mount directory and drives the helper launch.
    pub(super) async fn mount_volume(
        &self,
        connection: &ConnectionInfo,
        mount_path: &Path,
        volume_name: &str,
    ) -> Result<(), MountVolumeError> {
        if connection.bucket.is_empty() {
            return Err(MountVolumeError::MissingBucket);
        }
        if connection.access_key_id.is_empty() {
            return Err(MountVolumeError::MissingAccessKey);
        }
        if connection.secret_access_key.is_empty() {
            return Err(MountVolumeError::MissingSecretKey);
        }

        let (uid, gid) = sys::current_user_and_group();

        if !mount_path.exists() {
            let _umask = UmaskGuard::clear(&*self.os_helper);

            std::fs::create_dir_all(mount_path)?;
            nix::unistd::chown(
                mount_path,
                Some(nix::unistd::Uid::from_raw(uid)),
                Some(nix::unistd::Gid::from_raw(gid)),
            )
            .map_err(std::io::Error::from)?;
        }

        let params = MountParams::new(connection, mount_path, uid, gid);
        self.mounter.mount(volume_name, params).await?;
        Ok(())
    }

    /// Probes whether `mountpoint` is still a live kernel mount. The result
    /// is a hint: failures (including probe timeouts) read as "not mounted"
    /// and push the caller into the remount branch.
    pub(super) async fn check(&self, name: &str, mountpoint: &Path) -> bool {
        let path = mountpoint.to_string_lossy();
        match self
            .invoker
            .invoke("mountpoint", &["-q", &path], CHECK_TIMEOUT)
            .await
        {
            Ok(_) => true,
            Err(err) => {
                tracing::info!(volume = name, error = %err, "unable to verify volume");
                false
            }
        }
    }
}

/// Failure preparing or launching a mount.
#[derive(Debug, thiserror::Error)]
pub enum MountVolumeError {
    #[error("no source information")]
    MissingBucket,
    #[error("no access key id")]
    MissingAccessKey,
    #[error("no secret access key")]
    MissingSecretKey,
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Mounter(#[from] MounterError),
}

impl MountVolumeError {
    /// The form stored in `last_mount_error` and replayed to clients. Safe
    /// errors keep their structure by serializing to JSON; everything else
    /// is flattened to its message.
    pub(super) fn stored_form(&self) -> String {
        if let MountVolumeError::Mounter(err) = self {
            if let Some(safe) = err.as_safe() {
                if let Ok(json) = serde_json::to_string(safe) {
                    return json;
                }
                tracing::error!(error = %err, "failed-to-serialize-safe-error");
            }
        }
        self.to_string()
    }
}
