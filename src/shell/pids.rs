//! Tracked descendant processes.
//!
//! Helpers that detach background work (port-forwards and the like) append
//! their pid to the workspace `.killpids` file. After the session shell has
//! exited every recorded pid is sent SIGTERM and the file is removed.

use std::fs;
use std::io;
use std::path::Path;

use nix::errno::Errno;
use nix::sys::signal::{Signal, kill, killpg};
use nix::unistd::Pid;
use tracing::{debug, info, warn};

fn parse_pid(line: &str) -> Option<Pid> {
    match line.parse::<i32>() {
        // 0 and negatives address whole process groups in kill(2).
        Ok(pid) if pid > 0 => Some(Pid::from_raw(pid)),
        _ => None,
    }
}

fn terminate(pid: Pid) {
    match kill(pid, Signal::SIGTERM) {
        Ok(()) => info!("Terminated tracked process {}", pid),
        Err(Errno::ESRCH) => debug!("Tracked process {} already exited", pid),
        Err(e) => warn!("Failed to terminate tracked process {}: {}", pid, e),
    }
}

/// Terminate every pid recorded in `pids_path`, then remove the file.
///
/// A missing file is a no-op. Signal failures are logged and never retried.
pub fn kill_children(pids_path: &Path) {
    // Helpers append from the shell, so a stray byte must not hide the rest.
    let bytes = match fs::read(pids_path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return,
        Err(e) => {
            warn!("Failed to read {}: {}", pids_path.display(), e);
            Vec::new()
        }
    };
    let content = String::from_utf8_lossy(&bytes);

    for line in content.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match parse_pid(line) {
            Some(pid) => terminate(pid),
            None => warn!("Ignoring malformed pid entry '{}'", line),
        }
    }

    match fs::remove_file(pids_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!("Failed to remove {}: {}", pids_path.display(), e),
    }
}

/// Send SIGTERM to whatever is left of the session's process group.
pub fn kill_group(pgid: Pid) {
    match killpg(pgid, Signal::SIGTERM) {
        Ok(()) => debug!("Terminated process group {}", pgid),
        Err(Errno::ESRCH) => {}
        Err(e) => warn!("Failed to terminate process group {}: {}", pgid, e),
    }
}
