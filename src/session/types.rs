//! Session records and their lifecycle states.

use crate::supervisor::process::ProcessHandle;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Lifecycle state of a profiling session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Recording,
    Stopped,
    Completed,
    Failed,
}

impl SessionStatus {
    /// Whether moving from `self` to `next` goes forward
    ///
    /// `recording -> stopped -> completed`, `recording | stopped -> failed`,
    /// and `failed -> completed` when a retried analysis succeeds.
    pub fn can_transition_to(self, next: SessionStatus) -> bool {
        use SessionStatus::*;
        matches!(
            (self, next),
            (Recording, Stopped)
                | (Recording, Failed)
                | (Stopped, Completed)
                | (Stopped, Failed)
                | (Failed, Completed)
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Recording => "recording",
            Self::Stopped => "stopped",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One recording process, one trace bundle, one lifecycle
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: String,
    pub device_udid: String,
    pub bundle_id: String,

    /// Templates as requested, in order
    pub templates: Vec<String>,

    pub trace_path: PathBuf,
    pub pid: u32,
    pub status: SessionStatus,
    pub start_time: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,

    /// Set while stop() waits for the bundle to settle
    #[serde(default)]
    pub finalizing: bool,

    /// Signal-only reference to the recorder; cleared once stopped
    #[serde(skip)]
    pub process: Option<ProcessHandle>,
}

impl Session {
    /// Recording, or stopped with the bundle still being written
    pub fn is_busy(&self) -> bool {
        self.status == SessionStatus::Recording || self.finalizing
    }

    /// Seconds between start and end (or now, while recording)
    pub fn elapsed_seconds(&self) -> f64 {
        let end = self.end_time.unwrap_or_else(Utc::now);
        (end - self.start_time).num_milliseconds().max(0) as f64 / 1000.0
    }
}

/// Fields to merge into an existing session
///
/// Unset fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct SessionUpdate {
    pub status: Option<SessionStatus>,
    pub end_time: Option<DateTime<Utc>>,
    pub finalizing: Option<bool>,
    pub clear_process: bool,
}

impl SessionUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_status(mut self, status: SessionStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_end_time(mut self, end_time: DateTime<Utc>) -> Self {
        self.end_time = Some(end_time);
        self
    }

    pub fn with_finalizing(mut self, finalizing: bool) -> Self {
        self.finalizing = Some(finalizing);
        self
    }

    pub fn clearing_process(mut self) -> Self {
        self.clear_process = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forward_transitions() {
        assert!(SessionStatus::Recording.can_transition_to(SessionStatus::Stopped));
        assert!(SessionStatus::Stopped.can_transition_to(SessionStatus::Completed));
        assert!(SessionStatus::Recording.can_transition_to(SessionStatus::Failed));
        assert!(SessionStatus::Failed.can_transition_to(SessionStatus::Completed));
    }

    #[test]
    fn test_backward_transitions_rejected() {
        assert!(!SessionStatus::Completed.can_transition_to(SessionStatus::Recording));
        assert!(!SessionStatus::Stopped.can_transition_to(SessionStatus::Recording));
        assert!(!SessionStatus::Completed.can_transition_to(SessionStatus::Failed));
        assert!(!SessionStatus::Recording.can_transition_to(SessionStatus::Recording));
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&SessionStatus::Recording).unwrap();
        assert_eq!(json, "\"recording\"");
    }
}
