//! Pre-flight checks for a recording session
//!
//! Validates the recording tool and the target device before any process is
//! spawned, so a failed check never leaves an orphaned recorder or a half
//! registered session behind.

pub mod inventory;

pub use inventory::{Device, DeviceInventory, SimctlInventory, StaticInventory};

use crate::utils::error::ProfilerError;
use log::debug;
use std::path::{Path, PathBuf};

/// Device states that can host a recording
const RUNNABLE_STATES: &[&str] = &["booted", "running"];

/// Run both checks in order: tool first, then device
pub async fn run_preflight_checks<I: DeviceInventory>(
    tool: &Path,
    inventory: &I,
    device_udid: &str,
) -> Result<(PathBuf, Device), ProfilerError> {
    let resolved = resolve_tool(tool)?;
    let device = check_device_ready(inventory, device_udid).await?;
    Ok((resolved, device))
}

/// Resolve the recording tool to an executable path
///
/// A bare name is searched on `PATH`; anything with a directory component is
/// checked where it points.
pub fn resolve_tool(tool: &Path) -> Result<PathBuf, ProfilerError> {
    let unavailable = || ProfilerError::ToolUnavailable(tool.display().to_string());

    if tool.components().count() > 1 {
        return if is_executable(tool) {
            Ok(tool.to_path_buf())
        } else {
            Err(unavailable())
        };
    }

    let path_var = std::env::var_os("PATH").ok_or_else(unavailable)?;
    let found = std::env::split_paths(&path_var)
        .map(|dir| dir.join(tool))
        .find(|candidate| is_executable(candidate))
        .ok_or_else(unavailable)?;

    debug!("Resolved {} to {}", tool.display(), found.display());
    Ok(found)
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Check the device exists and is booted
pub async fn check_device_ready<I: DeviceInventory>(
    inventory: &I,
    device_udid: &str,
) -> Result<Device, ProfilerError> {
    let devices = inventory.list_devices().await?;

    let device = devices
        .into_iter()
        .find(|d| d.udid == device_udid)
        .ok_or_else(|| ProfilerError::DeviceNotReady {
            udid: device_udid.to_string(),
            reason: "no device with this udid in the inventory".to_string(),
        })?;

    if !is_runnable_state(&device.state) {
        return Err(ProfilerError::DeviceNotReady {
            udid: device_udid.to_string(),
            reason: format!("{} is {}", device.name, device.state),
        });
    }

    Ok(device)
}

pub fn is_runnable_state(state: &str) -> bool {
    let state = state.trim().to_lowercase();
    RUNNABLE_STATES.contains(&state.as_str())
}
