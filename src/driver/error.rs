use serde::{Deserialize, Serialize};

/// Errors surfaced to the orchestrator through the `Err` response field.
///
/// The display strings are part of the protocol: orchestrators match on them
/// to decide retry behavior, so they are kept stable.
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("Missing mandatory 'volume_name'")]
    MissingVolumeName,
    #[error("Missing mandatory '{0}' field in 'Opts'")]
    MissingOptsField(&'static str),
    #[error("{0}")]
    InvalidOpts(String),
    #[error("Volume not found")]
    NotFound,
    #[error("Volume '{0}' not found")]
    VolumeNotFound(String),
    #[error("Volume '{0}' must be created before being mounted")]
    NotCreated(String),
    #[error("Volume not previously mounted")]
    NotPreviouslyMounted,
    #[error("persist state failed when creating: {0}")]
    PersistOnCreate(String),
    #[error("persist state failed when mounting: {0}")]
    PersistOnMount(String),
    #[error("failed to persist state when unmounting: {0}")]
    PersistOnUnmount(String),
    #[error("failed to persist state when removing: {0}")]
    PersistOnRemove(String),
    /// The stored `last_mount_error`, returned verbatim. May already be the
    /// JSON serialization of a safe error.
    #[error("{0}")]
    MountFailed(String),
    #[error("Error remounting volume: {0}")]
    Remount(String),
    #[error("Error unmounting volume: {0}")]
    Unmount(String),
    #[error("Error removing mountpoint: {0}")]
    RemoveMountpoint(String),
    #[error("Volume {name} does not exist (path: {path})")]
    MountpointGone { name: String, path: String },
    #[error("Volume {name} does not exist (path: {path}) and unable to remove mount directory")]
    MountpointGoneUnremovable { name: String, path: String },
    #[error("{0}")]
    MountCheck(String),
}

/// An error structured such that its serialized form is safe to hand to the
/// client verbatim, with no risk of leaking credentials or internal paths.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafeError {
    #[serde(rename = "SafeDescription")]
    pub safe_description: String,
}

impl SafeError {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            safe_description: description.into(),
        }
    }
}

impl std::fmt::Display for SafeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.safe_description)
    }
}

impl std::error::Error for SafeError {}
