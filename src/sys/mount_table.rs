use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;

/// How long a mount-table read may block before we give up. The probe is a
/// hint; callers re-synchronize through the registry.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Read-only view of the kernel mount table.
#[async_trait]
pub trait MountChecker: Send + Sync {
    /// Whether `path` appears as an active mount.
    async fn exists(&self, path: &Path) -> io::Result<bool>;

    /// Every active mount whose path matches `pattern`.
    async fn list(&self, pattern: &Regex) -> io::Result<Vec<PathBuf>>;
}

/// Production checker backed by `/proc/mounts`.
pub struct ProcMountChecker {
    mounts_path: PathBuf,
}

impl ProcMountChecker {
    pub fn new() -> Self {
        Self {
            mounts_path: PathBuf::from("/proc/mounts"),
        }
    }

    async fn read_mounts(&self) -> io::Result<Vec<PathBuf>> {
        let contents = tokio::time::timeout(
            PROBE_TIMEOUT,
            tokio::fs::read_to_string(&self.mounts_path),
        )
        .await
        .map_err(|_| io::Error::new(io::ErrorKind::TimedOut, "mount table read timed out"))??;

        Ok(parse_mount_points(&contents))
    }
}

impl Default for ProcMountChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MountChecker for ProcMountChecker {
    async fn exists(&self, path: &Path) -> io::Result<bool> {
        Ok(self.read_mounts().await?.iter().any(|m| m == path))
    }

    async fn list(&self, pattern: &Regex) -> io::Result<Vec<PathBuf>> {
        Ok(self
            .read_mounts()
            .await?
            .into_iter()
            .filter(|m| pattern.is_match(&m.to_string_lossy()))
            .collect())
    }
}

/// Extracts the mount-point column from `/proc/mounts` content.
fn parse_mount_points(contents: &str) -> Vec<PathBuf> {
    contents
        .lines()
        .filter_map(|line| line.split_whitespace().nth(1))
        .map(|field| PathBuf::from(unescape_mount_field(field)))
        .collect()
}

/// `/proc/mounts` escapes whitespace and backslashes as three-digit octal
/// sequences (`\040` for space, `\011` tab, `\012` newline, `\134` backslash).
fn unescape_mount_field(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let bytes = field.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' {
            if let (Some(&a), Some(&b), Some(&c)) =
                (bytes.get(i + 1), bytes.get(i + 2), bytes.get(i + 3))
            {
                if a.is_ascii_digit() && b.is_ascii_digit() && c.is_ascii_digit() {
                    let code = (a - b'0') as u32 * 64 + (b - b'0') as u32 * 8 + (c - b'0') as u32;
                    if let Some(ch) = char::from_u32(code) {
                        out.push(ch);
                        i += 4;
                        continue;
                    }
                }
            }
        }
        out.push(bytes[i] as char);
        i += 1;
    }
    out
}
