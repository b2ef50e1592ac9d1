//! Injected OS capabilities: umask, clock, process invocation, mount-table
//! probing and the FUSE unmount primitive. Each is a trait with a production
//! implementation here and fakes in the test suites.

mod fuse;
mod invoker;
mod mount_table;

pub use fuse::{FuseUnmounter, Unmounter};
pub use invoker::{InvokeError, Invoker, RealInvoker};
pub use mount_table::{MountChecker, ProcMountChecker};

use std::time::Instant;

/// Wraps `umask(2)` so tests can run without touching process-wide state.
pub trait OsHelper: Send + Sync {
    /// Sets the process umask, returning the previous value.
    fn umask(&self, mask: u32) -> u32;
}

/// Production umask via nix.
pub struct SystemOsHelper;

impl OsHelper for SystemOsHelper {
    fn umask(&self, mask: u32) -> u32 {
        nix::sys::stat::umask(nix::sys::stat::Mode::from_bits_truncate(mask)).bits()
    }
}

/// Clears the umask for a scope and restores the previous mask on drop.
///
/// Mount directories and the state file must come out world-accessible, so
/// every filesystem mutation under the mount root runs inside one of these.
pub struct UmaskGuard<'a> {
    helper: &'a dyn OsHelper,
    orig: u32,
}

impl<'a> UmaskGuard<'a> {
    pub fn clear(helper: &'a dyn OsHelper) -> Self {
        let orig = helper.umask(0);
        Self { helper, orig }
    }
}

impl Drop for UmaskGuard<'_> {
    fn drop(&mut self) {
        self.helper.umask(self.orig);
    }
}

/// Monotonic clock, injected so the mount-duration warning is testable.
pub trait Clock: Send + Sync {
    fn now(&self) -> Instant;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Effective uid/gid of the daemon, handed to the mounter helper and used to
/// chown freshly created mount directories.
pub fn current_user_and_group() -> (u32, u32) {
    (
        nix::unistd::geteuid().as_raw(),
        nix::unistd::getegid().as_raw(),
    )
}

/// Unrecoverable misconfiguration (mount root cannot be absolutized or
/// created). Logs and exits; per-request errors never come through here.
pub fn fatal(context: &str, err: &dyn std::error::Error) -> ! {
    tracing::error!(error = %err, "{context}");
    std::process::exit(1);
}
