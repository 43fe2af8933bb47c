//! Configuration and constants for the profiler.

use std::path::PathBuf;
use std::time::Duration;

/// Current output schema version
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Binary that fronts both `xctrace` and `simctl`
pub const DEFAULT_XCRUN: &str = "xcrun";

/// Directory name (under the system temp dir) holding one folder per session
pub const DEFAULT_TRACE_DIR_NAME: &str = "ios-trace-studio";

/// File name of the recording bundle inside a session directory
pub const TRACE_BUNDLE_NAME: &str = "recording.trace";

/// Session directories older than this are swept before a new session starts
pub const TRACE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// How often stop() checks whether the trace bundle has settled
pub const FINALIZE_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Upper bound on the finalize wait in stop()
pub const FINALIZE_TIMEOUT: Duration = Duration::from_secs(30);

/// Ranked lists never hold more entries than this
pub const TOP_N: usize = 10;

/// Individually parsed leak records kept per report
pub const MAX_LEAK_RECORDS: usize = 25;

pub const BYTES_PER_MB: f64 = 1_048_576.0;

/// Export stdout is read up to this many bytes
pub const MAX_EXPORT_BYTES: u64 = 8 * 1024 * 1024;

/// Templates recorded and analyzed when the caller names none
pub const DEFAULT_TEMPLATES: &[&str] = &["time", "alloc", "leaks"];

/// Short template names and the collector names xctrace knows them by
pub const TEMPLATE_ALIASES: &[(&str, &str)] = &[
    ("time", "Time Profiler"),
    ("cpu", "Time Profiler"),
    ("time-profiler", "Time Profiler"),
    ("alloc", "Allocations"),
    ("allocations", "Allocations"),
    ("leaks", "Leaks"),
    ("energy", "Energy Log"),
    ("network", "Network"),
    ("syscalls", "System Trace"),
    ("animation", "Animation Hitches"),
    ("swiftui", "SwiftUI"),
];

// Field names for export row parsing, tried in order
pub const SYMBOL_FIELD_NAMES: &[&str] = &["symbol", "frame", "name"];
pub const SELF_TIME_FIELD_NAMES: &[&str] = &["self-time", "self-weight"];
pub const TOTAL_TIME_FIELD_NAMES: &[&str] = &["total-time", "weight"];
pub const CATEGORY_FIELD_NAMES: &[&str] = &["category", "type"];
pub const SIZE_FIELD_NAMES: &[&str] = &["size", "bytes"];
pub const COUNT_FIELD_NAMES: &[&str] = &["count", "allocations"];

/// Prefix stripped from simctl runtime identifiers
pub const SIMCTL_RUNTIME_PREFIX: &str = "com.apple.CoreSimulator.SimRuntime.";

pub const INSTALL_TOOL_HINT: &str =
    "Install Xcode and its command line tools (xcode-select --install), then make sure `xcrun xctrace version` works.";
pub const BOOT_DEVICE_HINT: &str =
    "Boot the simulator first (xcrun simctl boot <udid>) and check `xcrun simctl list devices`.";
pub const FINALIZE_HINT: &str =
    "The recorder may have exited early. Check that the app launched, then retry analyze with the trace path or start a new session.";
pub const ANALYZE_AFTER_STOP_HINT: &str =
    "Call stop with this session id and wait for it to return before analyzing.";

/// Runtime configuration for a [`crate::supervisor::Profiler`]
#[derive(Debug, Clone)]
pub struct ProfilerConfig {
    /// `xcrun` binary name or path
    pub xcrun: PathBuf,

    /// Root directory holding one folder per session
    pub trace_root: PathBuf,

    pub trace_ttl: Duration,
    pub poll_interval: Duration,
    pub finalize_timeout: Duration,
    pub max_export_bytes: u64,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            xcrun: PathBuf::from(DEFAULT_XCRUN),
            trace_root: std::env::temp_dir().join(DEFAULT_TRACE_DIR_NAME),
            trace_ttl: TRACE_TTL,
            poll_interval: FINALIZE_POLL_INTERVAL,
            finalize_timeout: FINALIZE_TIMEOUT,
            max_export_bytes: MAX_EXPORT_BYTES,
        }
    }
}

impl ProfilerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_xcrun(mut self, xcrun: impl Into<PathBuf>) -> Self {
        self.xcrun = xcrun.into();
        self
    }

    pub fn with_trace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.trace_root = root.into();
        self
    }

    pub fn with_trace_ttl(mut self, ttl: Duration) -> Self {
        self.trace_ttl = ttl;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_finalize_timeout(mut self, timeout: Duration) -> Self {
        self.finalize_timeout = timeout;
        self
    }

    pub fn with_max_export_bytes(mut self, max: u64) -> Self {
        self.max_export_bytes = max;
        self
    }
}
