use std::path::Path;
use std::time::Duration;

use regex::Regex;

use super::VolumeDriver;

/// Deadline for each forced `umount -l -f` during the purge sweep.
const PURGE_UMOUNT_TIMEOUT: Duration = Duration::from_secs(30);

impl VolumeDriver {
    /// Tears down every known mount and scrubs the mount root.
    ///
    /// Every step is best-effort with logged errors: drain runs at shutdown
    /// and must converge as far as it can rather than wedge. After it
    /// returns the registry is empty and the state file is gone; any mount
    /// the orderly teardown missed has been hit by the forced sweep.
    pub async fn drain(&self) {
        tracing::info!("drain-start");

        {
            let mut volumes = self.volumes.write().await;

            let mounted: Vec<(String, std::path::PathBuf)> = volumes
                .values()
                .filter(|v| v.has_mountpoint() && v.mount_count > 0)
                .map(|v| (v.name.clone(), v.mountpoint.clone()))
                .collect();

            for (name, mountpoint) in mounted {
                if let Err(err) = self.unmount_volume(&name, &mountpoint).await {
                    tracing::error!(volume = %name, mountpoint = %mountpoint.display(), error = %err, "drain-unmount-failed");
                }
            }

            volumes.clear();
        }

        self.purge(self.mount_root()).await;
        self.remove_state();

        tracing::info!("drain-end");
    }

    /// Forced sweep of every kernel mount under `path`: lazy-force unmount
    /// each one and remove its directory. The last line of defence against
    /// mounts the registry lost track of.
    pub(super) async fn purge(&self, path: &Path) {
        tracing::info!(path = %path.display(), "purge-start");

        let pattern = match Regex::new(&format!("^{}.*$", path.display())) {
            Ok(pattern) => pattern,
            Err(err) => {
                tracing::error!(error = %err, "unable-to-list-mounts");
                return;
            }
        };

        let mounts = match self.mount_checker.list(&pattern).await {
            Ok(mounts) => mounts,
            Err(err) => {
                tracing::error!(path = %path.display(), error = %err, "check-proc-mounts-failed");
                return;
            }
        };

        tracing::info!(mounts = ?mounts, "mount-directory-list");

        for mount_dir in mounts {
            let dir = mount_dir.to_string_lossy();
            if let Err(err) = self
                .invoker
                .invoke("umount", &["-l", "-f", &dir], PURGE_UMOUNT_TIMEOUT)
                .await
            {
                tracing::error!(path = %dir, error = %err, "warning-umount-intermediate-failed");
            } else {
                tracing::info!(path = %dir, "unmount-successful");
            }

            if let Err(err) = std::fs::remove_dir(&mount_dir) {
                tracing::error!(path = %dir, error = %err, "purge-cannot-remove-directory");
            } else {
                tracing::info!(path = %dir, "remove-directory-successful");
            }
        }

        tracing::info!("purge-end");
    }
}
