use std::path::{Path, PathBuf};

/// Pid file recording the helper process for a volume; the durable handle
/// across daemon restarts.
pub fn mounter_pid_file(pid_dir: &Path, volume_name: &str) -> PathBuf {
    pid_dir.join(format!("mounter-{volume_name}.pid"))
}

/// Per-volume helper log file.
pub fn mounter_log_file(log_dir: &Path, volume_name: &str) -> PathBuf {
    log_dir.join(format!("mounter-{volume_name}.log"))
}

/// Reads the recorded helper pid, if any. Missing or malformed pid files
/// simply mean there is no helper to signal.
pub fn mounter_pid(pid_dir: &Path, volume_name: &str) -> Option<i32> {
    let contents = std::fs::read_to_string(mounter_pid_file(pid_dir, volume_name)).ok()?;
    contents.trim().parse::<i32>().ok().filter(|pid| *pid > 0)
}
