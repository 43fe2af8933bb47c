//! Profiling sessions: records, lifecycle states and the in-memory store.

pub mod store;
pub mod types;

pub use store::{trace_path_for, SessionStore};
pub use types::{Session, SessionStatus, SessionUpdate};
