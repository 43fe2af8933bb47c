//! Run `xctrace export` for one table and collect its stdout.
//!
//! Stdout is the only data source and is read up to a byte cap, so a huge
//! trace never has to be held in memory as a whole.

use super::command::build_export_args;
use super::templates::AnalysisKind;
use crate::utils::error::ProfilerError;
use log::{debug, warn};
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncReadExt;
use tokio::process::Command;

/// Stdout of one export run
#[derive(Debug, Clone)]
pub struct ExportOutput {
    pub kind: AnalysisKind,
    pub text: String,

    /// True when the byte cap cut the output short
    pub truncated: bool,
}

/// Export one template's table from a trace bundle
///
/// **Public** - called once per template by the analyzer
///
/// # Errors
/// * `ProfilerError::SpawnFailed` - the tool could not be started
/// * `ProfilerError::ExportFailed` - non-zero exit or unreadable stdout
pub async fn export_table(
    tool: &Path,
    trace_path: &Path,
    kind: AnalysisKind,
    max_bytes: u64,
) -> Result<ExportOutput, ProfilerError> {
    let args = build_export_args(trace_path, kind);
    debug!("Exporting {}: {} {}", kind.template_name(), tool.display(), args.join(" "));

    let mut child = Command::new(tool)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| ProfilerError::SpawnFailed {
            program: tool.display().to_string(),
            source,
        })?;

    let export_failed = |reason: String| ProfilerError::ExportFailed {
        template: kind.template_name().to_string(),
        reason,
    };

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| export_failed("stdout was not captured".to_string()))?;

    // One extra byte tells a full read apart from a cut one
    let mut buf = Vec::new();
    stdout
        .take(max_bytes.saturating_add(1))
        .read_to_end(&mut buf)
        .await
        .map_err(|e| export_failed(format!("reading stdout: {}", e)))?;

    let truncated = buf.len() as u64 > max_bytes;
    if truncated {
        warn!(
            "{} export exceeded {} bytes, keeping the first part",
            kind.template_name(),
            max_bytes
        );
        buf.truncate(max_bytes as usize);
        // The exporter may still be blocked writing, stop it before waiting
        if let Err(e) = child.start_kill() {
            debug!("Could not stop {} exporter: {}", kind.template_name(), e);
        }
    }

    let status = child
        .wait()
        .await
        .map_err(|e| export_failed(format!("waiting for exporter: {}", e)))?;

    if !truncated && !status.success() {
        return Err(export_failed(format!("exporter exited with {}", status)));
    }

    Ok(ExportOutput {
        kind,
        text: String::from_utf8_lossy(&buf).into_owned(),
        truncated,
    })
}
