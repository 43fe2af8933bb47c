//! Recorder supervision and the session lifecycle built on top of it.

pub mod process;
pub mod profiler;

pub use process::{artifact_size, spawn_recorder, wait_for_finalize, ProcessHandle};
pub use profiler::{AnalyzeTarget, Profiler, StartRequest, StartResponse, StopResponse};
