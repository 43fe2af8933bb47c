//! Error types for the entire application.
//!
//! We use `thiserror` for library-style errors with custom types,
//! and `anyhow` for application-level error propagation in main.rs and commands.

use super::config::{ANALYZE_AFTER_STOP_HINT, BOOT_DEVICE_HINT, FINALIZE_HINT, INSTALL_TOOL_HINT};
use crate::session::SessionStatus;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the profiling session lifecycle
#[derive(Error, Debug)]
pub enum ProfilerError {
    #[error("Recording tool not found: {0}")]
    ToolUnavailable(String),

    #[error("Device {udid} is not ready: {reason}")]
    DeviceNotReady { udid: String, reason: String },

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Trace for session {session_id} did not finalize within {timeout_secs}s")]
    FinalizeTimeout { session_id: String, timeout_secs: u64 },

    #[error("Failed to parse {template} export: {reason}")]
    ParseFailure { template: String, reason: String },

    #[error("Trace storage error at {}: {source}", path.display())]
    Storage {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Trace not found: {}", .0.display())]
    TraceNotFound(PathBuf),

    #[error("Export of {template} failed: {reason}")]
    ExportFailed { template: String, reason: String },

    #[error("Session {session_id} cannot move from {from} to {to}")]
    InvalidTransition {
        session_id: String,
        from: SessionStatus,
        to: SessionStatus,
    },

    #[error("Session {0} is still recording or finalizing")]
    SessionBusy(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to spawn {program}: {source}")]
    SpawnFailed {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ProfilerError {
    /// Machine-readable code reported to tool callers
    pub fn code(&self) -> &'static str {
        match self {
            Self::ToolUnavailable(_) => "TOOL_UNAVAILABLE",
            Self::DeviceNotReady { .. } => "DEVICE_NOT_READY",
            Self::SessionNotFound(_) => "SESSION_NOT_FOUND",
            Self::FinalizeTimeout { .. } => "FINALIZE_TIMEOUT",
            Self::ParseFailure { .. } => "PARSE_FAILURE",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::TraceNotFound(_) => "TRACE_NOT_FOUND",
            Self::ExportFailed { .. } => "EXPORT_FAILED",
            Self::InvalidTransition { .. } => "INVALID_TRANSITION",
            Self::SessionBusy(_) => "SESSION_BUSY",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::SpawnFailed { .. } => "SPAWN_FAILED",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Remediation hint, when there is something the caller can do
    pub fn hint(&self) -> Option<String> {
        match self {
            Self::ToolUnavailable(_) | Self::SpawnFailed { .. } => {
                Some(INSTALL_TOOL_HINT.to_string())
            }
            Self::DeviceNotReady { .. } => Some(BOOT_DEVICE_HINT.to_string()),
            Self::FinalizeTimeout { .. } => Some(FINALIZE_HINT.to_string()),
            Self::SessionBusy(_) => Some(ANALYZE_AFTER_STOP_HINT.to_string()),
            Self::SessionNotFound(_) => {
                Some("Start a new session; sessions do not survive a restart and are removed after analyze.".to_string())
            }
            Self::Storage { path, .. } => Some(format!(
                "Check that {} is writable or point --trace-root elsewhere.",
                path.display()
            )),
            _ => None,
        }
    }

    /// Convert into the shape returned to tool callers
    pub fn to_tool_error(&self) -> ToolError {
        ToolError {
            code: self.code().to_string(),
            message: self.to_string(),
            hint: self.hint(),
        }
    }
}

/// Error payload returned by the tool loop
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Errors that can occur during file output
#[derive(Error, Debug)]
pub enum OutputError {
    #[error("Failed to write file: {0}")]
    WriteFailed(#[from] std::io::Error),

    #[error("Failed to serialize JSON: {0}")]
    SerializationFailed(#[from] serde_json::Error),

    #[error("Invalid output path: {0}")]
    InvalidPath(String),
}
