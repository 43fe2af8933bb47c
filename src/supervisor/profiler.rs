//! Session orchestration: start, stop and analyze.
//!
//! A `Profiler` owns the configuration, the device inventory and a shared
//! handle to the session store. Each operation touches only its own session,
//! so callers may run many of them concurrently.

use super::process::{artifact_size, spawn_recorder, wait_for_finalize};
use crate::aggregator::{AnalysisBuilder, AnalysisResult};
use crate::parser::{
    bytes_to_mb, parse_allocations_output, parse_leaks_output, parse_time_profiler_output,
    AllocationsData, LeaksData, TimeProfilerData,
};
use crate::preflight::{resolve_tool, run_preflight_checks, DeviceInventory};
use crate::retention::{cleanup_old_traces, SweepReport};
use crate::session::{Session, SessionStatus, SessionStore, SessionUpdate};
use crate::utils::config::ProfilerConfig;
use crate::utils::error::ProfilerError;
use crate::xctrace::{
    build_record_args, default_templates, export_table, resolve_analysis_kinds, AnalysisKind,
    RecordRequest,
};
use chrono::Utc;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Parameters of a new recording
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StartRequest {
    pub device_udid: String,
    pub bundle_id: String,

    /// Template names; defaults to time, alloc and leaks
    #[serde(default)]
    pub templates: Option<Vec<String>>,

    #[serde(default)]
    pub launch_args: Option<Vec<String>>,

    #[serde(default)]
    pub env_vars: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartResponse {
    pub session_id: String,
    pub trace_path: PathBuf,
    pub pid: u32,
    pub status: SessionStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopResponse {
    pub session_id: String,
    pub trace_path: PathBuf,
    pub duration_seconds: f64,
    pub file_size_mb: f64,
    pub status: SessionStatus,
}

/// What analyze() reads from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalyzeTarget {
    /// A stopped session; it is removed once analyzed
    Session(String),

    /// Any trace bundle on disk
    TracePath(PathBuf),
}

/// Entry point for the session lifecycle
pub struct Profiler<I: DeviceInventory> {
    config: ProfilerConfig,
    store: Arc<SessionStore>,
    inventory: I,
}

impl<I: DeviceInventory> Profiler<I> {
    pub fn new(config: ProfilerConfig, inventory: I) -> Self {
        let store = Arc::new(SessionStore::new(config.trace_root.clone()));
        Self {
            config,
            store,
            inventory,
        }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Start recording `bundle_id` on `device_udid`
    ///
    /// **Public** - main entry point for a new session
    ///
    /// # Process
    /// 1. Preflight: tool on the path, device booted
    /// 2. Sweep stale traces
    /// 3. Create the session directory
    /// 4. Spawn the recorder
    /// 5. Register the session as recording
    ///
    /// # Errors
    /// * `ProfilerError::InvalidRequest` - empty device or bundle id
    /// * `ProfilerError::ToolUnavailable` / `DeviceNotReady` - preflight failed,
    ///   nothing was spawned
    /// * `ProfilerError::Storage` - the session directory could not be created
    /// * `ProfilerError::SpawnFailed` - the recorder did not start
    pub async fn start(&self, request: StartRequest) -> Result<StartResponse, ProfilerError> {
        if request.device_udid.trim().is_empty() {
            return Err(ProfilerError::InvalidRequest(
                "device_udid must not be empty".to_string(),
            ));
        }
        if request.bundle_id.trim().is_empty() {
            return Err(ProfilerError::InvalidRequest(
                "bundle_id must not be empty".to_string(),
            ));
        }

        info!(
            "Step 1/5: Preflight for {} on {}",
            request.bundle_id, request.device_udid
        );
        let (tool, device) =
            run_preflight_checks(&self.config.xcrun, &self.inventory, &request.device_udid)
                .await?;
        debug!("Device {} ({}) is {}", device.name, device.runtime, device.state);

        info!("Step 2/5: Sweeping traces older than {:?}", self.config.trace_ttl);
        let report = cleanup_old_traces(self.store.trace_root(), self.config.trace_ttl);
        if !report.removed.is_empty() {
            info!("Removed {} stale trace directories", report.removed.len());
        }

        let session_id = self.store.create_session_id();
        let trace_path = self.store.trace_path(&session_id);
        let session_dir = self.store.trace_root().join(&session_id);

        info!("Step 3/5: Creating {}", session_dir.display());
        std::fs::create_dir_all(&session_dir).map_err(|source| ProfilerError::Storage {
            path: session_dir.clone(),
            source,
        })?;

        let templates = match request.templates {
            Some(templates) if !templates.is_empty() => templates,
            _ => default_templates(),
        };
        let record = RecordRequest {
            device_udid: request.device_udid.clone(),
            bundle_id: request.bundle_id.clone(),
            templates: templates.clone(),
            output_path: trace_path.clone(),
            launch_args: request.launch_args.unwrap_or_default(),
            env_vars: request.env_vars.unwrap_or_default(),
        };
        let args = build_record_args(&record);

        info!("Step 4/5: Spawning recorder");
        debug!("{} {}", tool.display(), args.join(" "));
        let process = match spawn_recorder(&tool, &args) {
            Ok(process) => process,
            Err(e) => {
                if let Err(cleanup) = std::fs::remove_dir_all(&session_dir) {
                    debug!("Could not remove {}: {}", session_dir.display(), cleanup);
                }
                return Err(e);
            }
        };

        info!("Step 5/5: Registering session {}", session_id);
        let pid = process.pid();
        self.store.register_session(Session {
            session_id: session_id.clone(),
            device_udid: request.device_udid,
            bundle_id: request.bundle_id,
            templates,
            trace_path: trace_path.clone(),
            pid,
            status: SessionStatus::Recording,
            start_time: Utc::now(),
            end_time: None,
            finalizing: false,
            process: Some(process),
        });

        Ok(StartResponse {
            session_id,
            trace_path,
            pid,
            status: SessionStatus::Recording,
        })
    }

    /// Stop a recording and wait for its bundle to finalize
    ///
    /// The session is `stopped` and flagged finalizing from the signal until
    /// the bundle settles; `end_time` is the signal time.
    ///
    /// # Errors
    /// * `ProfilerError::SessionNotFound` - unknown id, or a session that is no
    ///   longer recording and left no artifact
    /// * `ProfilerError::SessionBusy` - another stop is still finalizing it
    /// * `ProfilerError::FinalizeTimeout` - the bundle never settled; the
    ///   session is marked failed
    pub async fn stop(&self, session_id: &str) -> Result<StopResponse, ProfilerError> {
        let session = self
            .store
            .get_session(session_id)
            .ok_or_else(|| ProfilerError::SessionNotFound(session_id.to_string()))?;

        if session.finalizing {
            return Err(ProfilerError::SessionBusy(session_id.to_string()));
        }
        if session.status != SessionStatus::Recording {
            debug!("Session {} is already {}", session_id, session.status);
            let size = artifact_size(&session.trace_path)
                .ok_or_else(|| ProfilerError::SessionNotFound(session_id.to_string()))?;
            return Ok(stop_response(&session, size));
        }

        info!("Stopping session {} (pid {})", session_id, session.pid);
        match &session.process {
            Some(process) if process.has_exited() => {
                info!("Recorder {} already exited", process.pid());
            }
            Some(process) => {
                if let Err(e) = process.interrupt() {
                    warn!("Could not interrupt recorder {}: {}", process.pid(), e);
                }
            }
            None => {}
        }

        self.store.update_session(
            session_id,
            SessionUpdate::new()
                .with_status(SessionStatus::Stopped)
                .with_end_time(Utc::now())
                .with_finalizing(true)
                .clearing_process(),
        )?;

        match wait_for_finalize(
            session_id,
            &session.trace_path,
            self.config.poll_interval,
            self.config.finalize_timeout,
        )
        .await
        {
            Ok(size) => {
                let completed = self.store.update_session(
                    session_id,
                    SessionUpdate::new()
                        .with_status(SessionStatus::Completed)
                        .with_finalizing(false),
                )?;
                info!(
                    "Session {} finalized: {:.2} MB in {:.1}s",
                    session_id,
                    bytes_to_mb(size),
                    completed.elapsed_seconds()
                );
                Ok(stop_response(&completed, size))
            }
            Err(e) => {
                warn!("{}", e);
                if let Err(update) = self.store.update_session(
                    session_id,
                    SessionUpdate::new()
                        .with_status(SessionStatus::Failed)
                        .with_finalizing(false),
                ) {
                    debug!("Could not mark {} failed: {}", session_id, update);
                }
                Err(e)
            }
        }
    }

    /// Export, parse and aggregate a trace
    ///
    /// **Public** - every requested template is attempted; one that fails to
    /// export or parse comes back zeroed with `partial` set and a warning.
    ///
    /// # Errors
    /// * `ProfilerError::SessionNotFound` - unknown session id
    /// * `ProfilerError::SessionBusy` - the session is still recording, or its
    ///   bundle is still being finalized by stop()
    /// * `ProfilerError::TraceNotFound` - no bundle at the trace path
    /// * `ProfilerError::ToolUnavailable` - the export tool is missing
    pub async fn analyze(
        &self,
        target: AnalyzeTarget,
        templates: Option<Vec<String>>,
    ) -> Result<AnalysisResult, ProfilerError> {
        let (session, trace_path) = match target {
            AnalyzeTarget::Session(id) => {
                let session = self
                    .store
                    .get_session(&id)
                    .ok_or_else(|| ProfilerError::SessionNotFound(id.clone()))?;
                if session.is_busy() {
                    return Err(ProfilerError::SessionBusy(id));
                }
                let path = session.trace_path.clone();
                (Some(session), path)
            }
            AnalyzeTarget::TracePath(path) => (None, path),
        };

        let size = artifact_size(&trace_path)
            .ok_or_else(|| ProfilerError::TraceNotFound(trace_path.clone()))?;
        let tool = resolve_tool(&self.config.xcrun)?;

        let mut builder = AnalysisBuilder::new(trace_path.clone(), bytes_to_mb(size));
        if let Some(session) = &session {
            builder = builder.with_session(session.session_id.clone(), session.elapsed_seconds());
        }

        let (kinds, unsupported) = resolve_analysis_kinds(templates.as_deref());
        for name in unsupported {
            builder.warn(format!("No parser for template {}, skipped", name));
        }

        info!(
            "Analyzing {} ({} templates)",
            trace_path.display(),
            kinds.len()
        );
        for kind in kinds {
            match export_table(&tool, &trace_path, kind, self.config.max_export_bytes).await {
                Ok(output) => {
                    if output.truncated {
                        builder.warn(format!(
                            "{} export exceeded {} bytes and was cut short",
                            kind.template_name(),
                            self.config.max_export_bytes
                        ));
                    }
                    apply_export(&mut builder, kind, &output.text, output.truncated);
                }
                Err(e) => {
                    warn!("{}", e);
                    builder.warn(e.to_string());
                    apply_empty(&mut builder, kind);
                }
            }
        }

        let result = builder.finish();

        if let Some(session) = session {
            if session.status.can_transition_to(SessionStatus::Completed) {
                if let Err(e) = self.store.update_session(
                    &session.session_id,
                    SessionUpdate::new().with_status(SessionStatus::Completed),
                ) {
                    debug!("Could not mark {} completed: {}", session.session_id, e);
                }
            }
            self.store.remove_session(&session.session_id);
        }

        Ok(result)
    }

    /// Every live session, oldest first
    pub fn list_sessions(&self) -> Vec<Session> {
        self.store.get_all_sessions()
    }

    /// Run the retention sweeper on the trace root
    pub fn cleanup_traces(&self) -> SweepReport {
        cleanup_old_traces(self.store.trace_root(), self.config.trace_ttl)
    }

    /// Drop all sessions, interrupting recorders that are still running
    ///
    /// Returns the number of sessions that were cleared.
    pub fn shutdown(&self) -> usize {
        let sessions = self.store.clear_all_sessions();
        for session in &sessions {
            if session.status != SessionStatus::Recording {
                continue;
            }
            if let Some(process) = &session.process {
                info!("Interrupting recorder for {}", session.session_id);
                if let Err(e) = process.interrupt() {
                    warn!("Could not interrupt recorder {}: {}", process.pid(), e);
                }
            }
        }
        sessions.len()
    }
}

fn stop_response(session: &Session, size: u64) -> StopResponse {
    StopResponse {
        session_id: session.session_id.clone(),
        trace_path: session.trace_path.clone(),
        duration_seconds: session.elapsed_seconds(),
        file_size_mb: bytes_to_mb(size),
        status: session.status,
    }
}

fn apply_export(builder: &mut AnalysisBuilder, kind: AnalysisKind, text: &str, truncated: bool) {
    match kind {
        AnalysisKind::TimeProfiler => {
            let mut data = parse_time_profiler_output(text);
            data.partial |= truncated;
            builder.time_profiler(data);
        }
        AnalysisKind::Allocations => {
            let mut data = parse_allocations_output(text);
            data.partial |= truncated;
            builder.allocations(data);
        }
        AnalysisKind::Leaks => {
            let mut data = parse_leaks_output(text);
            data.partial |= truncated;
            builder.leaks(data);
        }
    }
}

fn apply_empty(builder: &mut AnalysisBuilder, kind: AnalysisKind) {
    match kind {
        AnalysisKind::TimeProfiler => builder.time_profiler(TimeProfilerData {
            partial: true,
            ..Default::default()
        }),
        AnalysisKind::Allocations => builder.allocations(AllocationsData {
            partial: true,
            ..Default::default()
        }),
        AnalysisKind::Leaks => builder.leaks(LeaksData {
            partial: true,
            ..Default::default()
        }),
    }
}
