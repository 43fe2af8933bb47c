//! Recorder process plumbing: spawn, signal, and wait for the bundle.

use crate::utils::error::ProfilerError;
use log::{debug, info, warn};
use std::path::Path;
use std::process::Stdio;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::time::Instant;

/// Signal-only reference to a recorder process
///
/// Holds the pid and an exit flag. It never owns, waits on, or reaps the
/// process; a background task spawned next to it does the reaping and sets
/// the flag once the pid has been released.
#[derive(Debug, Clone)]
pub struct ProcessHandle {
    pid: u32,
    exited: Arc<AtomicBool>,
}

impl ProcessHandle {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            exited: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// Whether the reaper has seen the recorder exit
    pub fn has_exited(&self) -> bool {
        self.exited.load(Ordering::Acquire)
    }

    fn mark_exited(&self) {
        self.exited.store(true, Ordering::Release);
    }

    /// Ask the recorder to finalize its bundle and exit (SIGINT)
    ///
    /// A no-op once the recorder has exited: its pid may belong to another
    /// process by then.
    #[cfg(unix)]
    pub fn interrupt(&self) -> std::io::Result<()> {
        if self.has_exited() {
            debug!("Recorder {} already exited, not signalling", self.pid);
            return Ok(());
        }
        let pid = libc::pid_t::try_from(self.pid)
            .map_err(|_| std::io::Error::new(std::io::ErrorKind::InvalidInput, "pid out of range"))?;
        // SAFETY: kill(2) has no memory-safety preconditions
        let rc = unsafe { libc::kill(pid, libc::SIGINT) };
        if rc == 0 {
            Ok(())
        } else {
            Err(std::io::Error::last_os_error())
        }
    }

    #[cfg(not(unix))]
    pub fn interrupt(&self) -> std::io::Result<()> {
        Err(std::io::Error::new(
            std::io::ErrorKind::Unsupported,
            "graceful interrupt needs a unix host",
        ))
    }
}

/// Spawn the recorder detached from the caller's lifetime
///
/// The child gets its own process group so a Ctrl-C aimed at us does not
/// reach it, and is not killed when its tokio handle goes away. Stderr lines
/// are forwarded to the debug log until the recorder exits.
///
/// # Errors
/// * `ProfilerError::ToolUnavailable` - the program does not exist
/// * `ProfilerError::SpawnFailed` - any other spawn failure
pub fn spawn_recorder(program: &Path, args: &[String]) -> Result<ProcessHandle, ProfilerError> {
    let mut command = Command::new(program);
    command
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .kill_on_drop(false);
    configure_process_group(&mut command);

    let mut child = command.spawn().map_err(|source| {
        if source.kind() == std::io::ErrorKind::NotFound {
            ProfilerError::ToolUnavailable(program.display().to_string())
        } else {
            ProfilerError::SpawnFailed {
                program: program.display().to_string(),
                source,
            }
        }
    })?;

    let pid = child.id().ok_or_else(|| ProfilerError::SpawnFailed {
        program: program.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::Other, "recorder exited immediately"),
    })?;

    info!("Recorder started with pid {}", pid);

    let handle = ProcessHandle::new(pid);
    let reaped = handle.clone();
    let stderr = child.stderr.take();
    tokio::spawn(async move {
        if let Some(stderr) = stderr {
            let mut lines = BufReader::new(stderr).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                debug!("[recorder {}] {}", pid, line);
            }
        }
        match child.wait().await {
            Ok(status) => info!("Recorder {} exited with {}", pid, status),
            Err(e) => warn!("Failed to reap recorder {}: {}", pid, e),
        }
        reaped.mark_exited();
    });

    Ok(handle)
}

#[cfg(unix)]
fn configure_process_group(command: &mut Command) {
    command.process_group(0);
}

#[cfg(not(unix))]
fn configure_process_group(_command: &mut Command) {}

/// Total size in bytes of a file or directory tree, `None` if it is missing
///
/// Trace bundles are directories, so sizes are summed recursively. Entries
/// that vanish or cannot be read while walking are skipped.
pub fn artifact_size(path: &Path) -> Option<u64> {
    let metadata = std::fs::symlink_metadata(path).ok()?;
    if !metadata.is_dir() {
        return Some(metadata.len());
    }

    let mut total = 0;
    let mut pending = vec![path.to_path_buf()];
    while let Some(dir) = pending.pop() {
        let Ok(entries) = std::fs::read_dir(&dir) else {
            continue;
        };
        for entry in entries.flatten() {
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if meta.is_dir() {
                pending.push(entry.path());
            } else {
                total += meta.len();
            }
        }
    }
    Some(total)
}

/// Wait until the artifact exists, is non-empty and keeps the same size
/// across two consecutive polls
///
/// Returns the settled size in bytes. Only the timeout ends the wait early.
///
/// # Errors
/// * `ProfilerError::FinalizeTimeout` - the artifact did not settle in time
pub async fn wait_for_finalize(
    session_id: &str,
    trace_path: &Path,
    poll_interval: Duration,
    timeout: Duration,
) -> Result<u64, ProfilerError> {
    let deadline = Instant::now() + timeout;
    let mut last_size: Option<u64> = None;

    loop {
        let size = artifact_size(trace_path);
        debug!("Finalize poll for {}: {:?} bytes", session_id, size);

        match (size, last_size) {
            (Some(current), Some(previous)) if current > 0 && current == previous => {
                return Ok(current);
            }
            _ => last_size = size,
        }

        if Instant::now() + poll_interval > deadline {
            return Err(ProfilerError::FinalizeTimeout {
                session_id: session_id.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
        tokio::time::sleep(poll_interval).await;
    }
}
