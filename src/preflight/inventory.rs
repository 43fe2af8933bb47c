//! Device inventory: which simulators exist and what state they are in.

use crate::utils::config::SIMCTL_RUNTIME_PREFIX;
use crate::utils::error::ProfilerError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::future::Future;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;

/// A device as seen by the validator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub udid: String,
    pub name: String,
    pub state: String,
    pub runtime: String,
}

/// Source of the current device list
///
/// Implementations must be `Send + Sync`; the profiler shares one across tasks.
pub trait DeviceInventory: Send + Sync {
    fn list_devices(&self) -> impl Future<Output = Result<Vec<Device>, ProfilerError>> + Send;
}

/// Fixed device list, for callers that already know their devices
#[derive(Debug, Clone, Default)]
pub struct StaticInventory {
    devices: Vec<Device>,
}

impl StaticInventory {
    pub fn new(devices: Vec<Device>) -> Self {
        Self { devices }
    }
}

impl DeviceInventory for StaticInventory {
    async fn list_devices(&self) -> Result<Vec<Device>, ProfilerError> {
        Ok(self.devices.clone())
    }
}

/// Inventory backed by `xcrun simctl list devices --json`
#[derive(Debug, Clone)]
pub struct SimctlInventory {
    xcrun: PathBuf,
}

impl SimctlInventory {
    pub fn new(xcrun: impl Into<PathBuf>) -> Self {
        Self {
            xcrun: xcrun.into(),
        }
    }
}

impl DeviceInventory for SimctlInventory {
    async fn list_devices(&self) -> Result<Vec<Device>, ProfilerError> {
        let output = Command::new(&self.xcrun)
            .args(["simctl", "list", "devices", "--json"])
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    ProfilerError::ToolUnavailable(self.xcrun.display().to_string())
                } else {
                    ProfilerError::SpawnFailed {
                        program: self.xcrun.display().to_string(),
                        source: e,
                    }
                }
            })?;

        if !output.status.success() {
            return Err(ProfilerError::ToolUnavailable(format!(
                "simctl list devices exited with {}",
                output.status
            )));
        }

        parse_simctl_devices(&output.stdout)
    }
}

/// `simctl list devices --json` top level
#[derive(Debug, Deserialize)]
struct SimctlDeviceList {
    #[serde(default)]
    devices: BTreeMap<String, Vec<SimctlDevice>>,
}

/// One simctl device entry; every field but the udid is optional
#[derive(Debug, Deserialize)]
struct SimctlDevice {
    udid: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default, rename = "deviceTypeIdentifier")]
    device_type_identifier: Option<String>,
    #[serde(default)]
    state: Option<String>,
}

/// Parse simctl's JSON into devices
///
/// Fallback order per field:
/// * name: `name`, then `deviceTypeIdentifier`, then the udid
/// * state: `state`, then `"Unknown"`
/// * runtime: the runtime key with the CoreSimulator prefix stripped
pub fn parse_simctl_devices(raw: &[u8]) -> Result<Vec<Device>, ProfilerError> {
    let list: SimctlDeviceList = serde_json::from_slice(raw).map_err(|e| {
        ProfilerError::ToolUnavailable(format!("unreadable simctl device list: {}", e))
    })?;

    let devices: Vec<Device> = list
        .devices
        .into_iter()
        .flat_map(|(runtime_key, entries)| {
            let runtime = runtime_label(&runtime_key);
            entries.into_iter().map(move |entry| Device {
                name: entry
                    .name
                    .or(entry.device_type_identifier)
                    .unwrap_or_else(|| entry.udid.clone()),
                state: entry.state.unwrap_or_else(|| "Unknown".to_string()),
                runtime: runtime.clone(),
                udid: entry.udid,
            })
        })
        .collect();

    debug!("simctl reported {} devices", devices.len());
    Ok(devices)
}

/// `com.apple.CoreSimulator.SimRuntime.iOS-17-0` -> `iOS 17.0`
fn runtime_label(key: &str) -> String {
    let short = key.strip_prefix(SIMCTL_RUNTIME_PREFIX).unwrap_or(key);
    match short.split_once('-') {
        Some((platform, version)) => format!("{} {}", platform, version.replace('-', ".")),
        None => short.to_string(),
    }
}
