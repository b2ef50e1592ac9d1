use std::path::Path;

use super::{DriverError, VolumeDriver};

impl VolumeDriver {
    /// Releases one mount reference for `name`, tearing the mount down when
    /// the last reference goes away. The volume record itself is removed at
    /// count zero; re-mounting requires a fresh Create.
    pub async fn unmount(&self, name: &str) -> Result<(), DriverError> {
        if name.is_empty() {
            return Err(DriverError::MissingVolumeName);
        }

        let mut volumes = self.volumes.write().await;

        let volume = volumes
            .get_mut(name)
            .ok_or_else(|| DriverError::VolumeNotFound(name.to_string()))?;

        if !volume.has_mountpoint() {
            return Err(DriverError::NotPreviouslyMounted);
        }

        if volume.mount_count == 1 {
            let mountpoint = volume.mountpoint.clone();
            self.unmount_volume(name, &mountpoint).await?;
        }

        let volume = volumes
            .get_mut(name)
            .ok_or_else(|| DriverError::VolumeNotFound(name.to_string()))?;
        volume.mount_count = volume.mount_count.saturating_sub(1);
        tracing::info!(volume = name, count = volume.mount_count, "volume-ref-count-decremented");

        if volume.mount_count < 1 {
            volumes.remove(name);
        }

        self.persist_locked(&volumes)
            .map_err(|err| DriverError::PersistOnUnmount(err.to_string()))?;

        Ok(())
    }

    /// The unmount procedure: converge the kernel mount table, the helper
    /// process, and the mount directory for one volume.
    ///
    /// A mountpoint missing from the kernel table is reported as an error —
    /// the mount is already gone and the caller must retire the record — but
    /// the directory is still cleaned up on the way out.
    pub(super) async fn unmount_volume(
        &self,
        name: &str,
        mount_path: &Path,
    ) -> Result<(), DriverError> {
        let exists = self
            .mount_checker
            .exists(mount_path)
            .await
            .map_err(|err| {
                tracing::error!(mountpoint = %mount_path.display(), error = %err, "failed-proc-mounts-check");
                DriverError::MountCheck(err.to_string())
            })?;

        if !exists {
            return match std::fs::remove_dir(mount_path) {
                Ok(()) => {
                    tracing::info!(volume = name, mountpoint = %mount_path.display(), "mountpoint-not-found");
                    Err(DriverError::MountpointGone {
                        name: name.to_string(),
                        path: mount_path.to_string_lossy().into_owned(),
                    })
                }
                Err(_) => Err(DriverError::MountpointGoneUnremovable {
                    name: name.to_string(),
                    path: mount_path.to_string_lossy().into_owned(),
                }),
            };
        }

        tracing::info!(mountpath = %mount_path.display(), "unmount-volume-folder");

        if let Err(err) = self.unmounter.unmount(mount_path) {
            tracing::error!(error = %err, "unmount-failed");
            return Err(DriverError::Unmount(err.to_string()));
        }

        self.mounter.terminate(name).await;

        if let Err(err) = std::fs::remove_dir(mount_path) {
            tracing::error!(error = %err, "remove-mountpoint-failed");
            return Err(DriverError::RemoveMountpoint(err.to_string()));
        }

        tracing::info!(volume = name, "unmounted-volume");

        Ok(())
    }
}
