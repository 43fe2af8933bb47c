//! In-memory registry of profiling sessions.
//!
//! The store is the only way session state is read or changed. Each call
//! holds the lock for a single map operation, so calls on different ids never
//! wait on each other for long, and two calls racing on the same id see a
//! clean `SessionNotFound` instead of a half-written record.

use super::types::{Session, SessionUpdate};
use crate::utils::config::TRACE_BUNDLE_NAME;
use crate::utils::error::ProfilerError;
use log::debug;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Trace bundle location for a session id under `root`
///
/// Pure: the same id always maps to the same path.
pub fn trace_path_for(root: &Path, session_id: &str) -> PathBuf {
    root.join(session_id).join(TRACE_BUNDLE_NAME)
}

/// Session registry, created once per process and shared by reference
#[derive(Debug)]
pub struct SessionStore {
    trace_root: PathBuf,
    sessions: Mutex<HashMap<String, Session>>,
}

impl SessionStore {
    pub fn new(trace_root: impl Into<PathBuf>) -> Self {
        Self {
            trace_root: trace_root.into(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn trace_root(&self) -> &Path {
        &self.trace_root
    }

    /// Fresh, collision-resistant session id
    pub fn create_session_id(&self) -> String {
        format!("session-{}", Uuid::new_v4().simple())
    }

    /// Insert a session, replacing any record with the same id
    pub fn register_session(&self, session: Session) {
        debug!("Registering session {}", session.session_id);
        self.sessions
            .lock()
            .insert(session.session_id.clone(), session);
    }

    /// Merge `update` into an existing session and return the merged record
    ///
    /// # Errors
    /// * `ProfilerError::SessionNotFound` - no such id; nothing is created
    /// * `ProfilerError::InvalidTransition` - the status would move backwards
    pub fn update_session(
        &self,
        session_id: &str,
        update: SessionUpdate,
    ) -> Result<Session, ProfilerError> {
        let mut sessions = self.sessions.lock();
        let session = sessions
            .get_mut(session_id)
            .ok_or_else(|| ProfilerError::SessionNotFound(session_id.to_string()))?;

        if let Some(next) = update.status {
            if !session.status.can_transition_to(next) {
                return Err(ProfilerError::InvalidTransition {
                    session_id: session_id.to_string(),
                    from: session.status,
                    to: next,
                });
            }
            session.status = next;
        }
        if let Some(end_time) = update.end_time {
            session.end_time = Some(end_time);
        }
        if let Some(finalizing) = update.finalizing {
            session.finalizing = finalizing;
        }
        if update.clear_process {
            session.process = None;
        }

        Ok(session.clone())
    }

    pub fn get_session(&self, session_id: &str) -> Option<Session> {
        self.sessions.lock().get(session_id).cloned()
    }

    pub fn has_session(&self, session_id: &str) -> bool {
        self.sessions.lock().contains_key(session_id)
    }

    /// All sessions, oldest first
    pub fn get_all_sessions(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.lock().values().cloned().collect();
        sessions.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.session_id.cmp(&b.session_id))
        });
        sessions
    }

    /// Remove a session; removing an unknown id is a no-op
    pub fn remove_session(&self, session_id: &str) -> Option<Session> {
        let removed = self.sessions.lock().remove(session_id);
        if removed.is_some() {
            debug!("Removed session {}", session_id);
        }
        removed
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Drop every session and hand the records back for teardown
    pub fn clear_all_sessions(&self) -> Vec<Session> {
        self.sessions.lock().drain().map(|(_, s)| s).collect()
    }

    pub fn trace_path(&self, session_id: &str) -> PathBuf {
        trace_path_for(&self.trace_root, session_id)
    }
}
