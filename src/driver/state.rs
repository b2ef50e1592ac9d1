use std::collections::HashMap;
use std::io;
use std::io::Write;
use std::os::unix::fs::PermissionsExt;

use super::{Volume, VolumeDriver};
use crate::sys::UmaskGuard;

/// Registry snapshot persisted under the mount root.
pub const STATE_FILE_NAME: &str = "driver-state.json";

impl VolumeDriver {
    /// Writes the registry snapshot to the state file. Called with the
    /// registry lock held so the on-disk snapshot matches the in-memory
    /// commit point.
    ///
    /// The write goes to a sibling temp file which is then renamed over the
    /// state file, so a crash mid-write leaves the previous snapshot intact.
    pub(super) fn persist_locked(&self, volumes: &HashMap<String, Volume>) -> io::Result<()> {
        let _umask = UmaskGuard::clear(&*self.os_helper);

        let state_file = self.mount_path(STATE_FILE_NAME);
        let data = serde_json::to_vec(volumes)?;

        let tmp = tempfile::NamedTempFile::new_in(&self.mount_root)?;
        tmp.as_file().write_all(&data)?;
        // NamedTempFile opens 0600; the mount root contract is world-access.
        tmp.as_file()
            .set_permissions(std::fs::Permissions::from_mode(0o777))?;
        tmp.persist(&state_file).map_err(|err| err.error)?;

        tracing::debug!(state_file = %state_file.display(), "state-saved");
        Ok(())
    }

    /// Reloads the registry from the state file written by a previous run.
    ///
    /// Best effort: an unreadable or unparseable file leaves the registry
    /// empty. Restored entries that claim to be mounted but have no bucket
    /// are unrecoverable — their credentials cannot be re-resolved — so they
    /// are evicted and their mount directory removed. The surviving state is
    /// re-persisted immediately to normalize the file.
    pub async fn restore_state(&self) {
        let state_file = self.mount_root.join(STATE_FILE_NAME);

        let data = match std::fs::read(&state_file) {
            Ok(data) => data,
            Err(err) => {
                tracing::info!(state_file = %state_file.display(), error = %err, "failed-to-read-state-file");
                return;
            }
        };

        let state: HashMap<String, Volume> = match serde_json::from_slice(&data) {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(state_file = %state_file.display(), error = %err, "failed-to-unmarshal-state");
                return;
            }
        };

        tracing::info!(state_file = %state_file.display(), volumes = state.len(), "state-restored");

        let mut volumes = self.volumes.write().await;
        *volumes = state;

        let evicted: Vec<String> = volumes
            .values()
            .filter(|v| v.mount_count > 0 && v.connection.bucket.is_empty())
            .map(|v| v.name.clone())
            .collect();

        for name in evicted {
            if let Some(volume) = volumes.remove(&name) {
                tracing::info!(volume = %name, "evicting-unrecoverable-volume");
                if volume.has_mountpoint() {
                    let _ = std::fs::remove_dir(&volume.mountpoint);
                }
            }
        }

        if let Err(err) = self.persist_locked(&volumes) {
            tracing::error!(error = %err, "persist-state-failed");
        }
    }

    /// Deletes the state file; the final step of a drain.
    pub(super) fn remove_state(&self) {
        let state_file = self.mount_path(STATE_FILE_NAME);
        if let Err(err) = std::fs::remove_file(&state_file) {
            if err.kind() != io::ErrorKind::NotFound {
                tracing::error!(state_file = %state_file.display(), error = %err, "remove-state-failed");
            }
        }
    }
}
