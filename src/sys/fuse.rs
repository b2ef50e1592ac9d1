use std::io;
use std::path::Path;

/// In-process FUSE unmount, distinct from the external `umount` sweep used
/// by the purge pass.
pub trait Unmounter: Send + Sync {
    fn unmount(&self, path: &Path) -> io::Result<()>;
}

/// Production unmount via `umount(2)`. The daemon runs privileged, so the
/// syscall is available directly and no `fusermount` round-trip is needed.
pub struct FuseUnmounter;

impl Unmounter for FuseUnmounter {
    #[cfg(target_os = "linux")]
    fn unmount(&self, path: &Path) -> io::Result<()> {
        nix::mount::umount(path).map_err(io::Error::from)
    }

    #[cfg(not(target_os = "linux"))]
    fn unmount(&self, path: &Path) -> io::Result<()> {
        let output = std::process::Command::new("umount").arg(path).output()?;
        if !output.status.success() {
            return Err(io::Error::other(
                String::from_utf8_lossy(&output.stderr).trim().to_string(),
            ));
        }
        Ok(())
    }
}
