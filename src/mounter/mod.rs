//! Supervision of the out-of-process FUSE helper.
//!
//! The helper is spawned in its own process group with the mount parameters
//! on stdin and reports the mount outcome back with a signal: SIGUSR1 for
//! ready, SIGUSR2 for failure. It stays resident for the life of the mount
//! and is terminated with SIGINT on unmount.

mod params;
mod paths;

pub use params::MountParams;
pub use paths::{mounter_log_file, mounter_pid, mounter_pid_file};

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::signal::unix::{signal, SignalKind};

use crate::driver::SafeError;

/// Launches and terminates helper processes for the registry.
#[async_trait]
pub trait Mounter: Send + Sync {
    /// Spawns the helper for `volume_name` and blocks until it reports the
    /// mount outcome.
    async fn mount(&self, volume_name: &str, params: MountParams) -> Result<(), MounterError>;

    /// Signals the recorded helper to exit. Best effort: failures are
    /// logged, never propagated.
    async fn terminate(&self, volume_name: &str);
}

#[derive(Debug, thiserror::Error)]
pub enum MounterError {
    /// The helper signalled SIGUSR2, or exited before signalling at all.
    #[error("something went wrong with mounter")]
    MountFailed,
    /// A structured failure whose serialized form may be forwarded to the
    /// client verbatim.
    #[error("{0}")]
    Safe(SafeError),
    #[error(transparent)]
    Params(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl MounterError {
    pub fn as_safe(&self) -> Option<&SafeError> {
        match self {
            MounterError::Safe(safe) => Some(safe),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct MounterConfig {
    /// Path to the helper binary.
    pub mounter_path: PathBuf,
    /// Directory for per-volume helper logs.
    pub log_dir: PathBuf,
    /// Directory for per-volume helper pid files.
    pub pid_dir: PathBuf,
}

/// Production supervisor spawning the helper binary.
pub struct ProcessMounter {
    config: MounterConfig,
}

impl ProcessMounter {
    pub fn new(config: MounterConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Mounter for ProcessMounter {
    async fn mount(&self, volume_name: &str, params: MountParams) -> Result<(), MounterError> {
        // Register for the outcome signals before the helper can possibly
        // deliver them.
        let mut ready = signal(SignalKind::user_defined1())?;
        let mut failed = signal(SignalKind::user_defined2())?;

        let log_path = mounter_log_file(&self.config.log_dir, volume_name);
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        let mut command = Command::new(&self.config.mounter_path);
        command
            .arg(volume_name)
            .process_group(0)
            .stdin(Stdio::piped())
            .stdout(Stdio::from(log.try_clone()?))
            .stderr(Stdio::from(log));

        let payload = serde_json::to_vec(&params)?;

        let mut child = command.spawn()?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| std::io::Error::other("mounter stdin was not captured"))?;
        stdin.write_all(&payload).await?;
        drop(stdin);

        let pid_file = mounter_pid_file(&self.config.pid_dir, volume_name);
        match child.id() {
            Some(pid) => {
                if let Err(err) = std::fs::write(&pid_file, format!("{pid}\n")) {
                    tracing::warn!(volume = volume_name, error = %err, "write-pid-file-failed");
                }
            }
            None => tracing::warn!(volume = volume_name, "mounter-pid-unavailable"),
        }

        tracing::info!(volume = volume_name, mounter = %self.config.mounter_path.display(), "mounter-started");

        // The handshake has no hard timeout; the caller owns the elapsed-time
        // warning. A helper that dies without signalling counts as a failure.
        tokio::select! {
            _ = ready.recv() => Ok(()),
            _ = failed.recv() => Err(MounterError::MountFailed),
            status = child.wait() => {
                tracing::error!(volume = volume_name, status = ?status, "mounter-exited-before-handshake");
                Err(MounterError::MountFailed)
            }
        }
    }

    async fn terminate(&self, volume_name: &str) {
        let Some(pid) = mounter_pid(&self.config.pid_dir, volume_name) else {
            return;
        };

        if let Err(err) = kill(Pid::from_raw(pid), Signal::SIGINT) {
            tracing::error!(volume = volume_name, pid, error = %err, "sigint-mounter-failed");
        }
    }
}
