use std::process::Output;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;

/// Runs short-lived external commands (`umount`, `mountpoint`) under a
/// deadline, capturing their exit status.
#[async_trait]
pub trait Invoker: Send + Sync {
    async fn invoke(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output, InvokeError>;
}

#[derive(Debug, thiserror::Error)]
pub enum InvokeError {
    #[error("command '{cmd}' exited with {status}: {stderr}")]
    Failed {
        cmd: String,
        status: std::process::ExitStatus,
        stderr: String,
    },
    #[error("command '{cmd}' timed out after {timeout:?}")]
    Timeout { cmd: String, timeout: Duration },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub struct RealInvoker;

#[async_trait]
impl Invoker for RealInvoker {
    async fn invoke(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<Output, InvokeError> {
        let mut command = Command::new(cmd);
        command.args(args).kill_on_drop(true);

        let output = tokio::time::timeout(timeout, command.output())
            .await
            .map_err(|_| InvokeError::Timeout {
                cmd: cmd.to_string(),
                timeout,
            })??;

        if !output.status.success() {
            return Err(InvokeError::Failed {
                cmd: cmd.to_string(),
                status: output.status,
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}
