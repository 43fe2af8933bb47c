//! JSON-lines tool loop.
//!
//! One request per input line:
//!
//! ```text
//! {"id": 1, "tool": "start", "params": {"device_udid": "...", "bundle_id": "..."}}
//! ```
//!
//! One response per request, in completion order:
//!
//! ```text
//! {"id": 1, "ok": true, "result": {...}}
//! {"id": 2, "ok": false, "error": {"code": "SESSION_NOT_FOUND", "message": "...", "hint": "..."}}
//! ```
//!
//! Every request runs on its own task, so a stop that waits for a trace to
//! finalize does not hold up requests for other sessions. At end of input the
//! loop waits for in-flight requests and then shuts the profiler down.

use crate::preflight::DeviceInventory;
use crate::supervisor::{AnalyzeTarget, Profiler, StartRequest};
use crate::utils::error::{ProfilerError, ToolError};
use log::{debug, info, warn};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::JoinSet;

/// One request line
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: Option<Value>,

    pub tool: String,

    #[serde(default)]
    pub params: Value,
}

/// One response line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub id: Value,
    pub ok: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolError>,
}

impl ToolResponse {
    fn success(id: Value, result: Value) -> Self {
        Self {
            id,
            ok: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Value, error: &ProfilerError) -> Self {
        Self {
            id,
            ok: false,
            result: None,
            error: Some(error.to_tool_error()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct StopParams {
    session_id: String,
}

#[derive(Debug, Default, Deserialize)]
struct AnalyzeParams {
    #[serde(default)]
    session_id: Option<String>,
    #[serde(default)]
    trace_path: Option<PathBuf>,
    #[serde(default)]
    templates: Option<Vec<String>>,
}

/// Run one tool call to completion
///
/// **Public** - never fails; every error becomes an `ok: false` response
pub async fn dispatch<I: DeviceInventory>(profiler: &Profiler<I>, call: ToolCall) -> ToolResponse {
    let id = call.id.unwrap_or(Value::Null);
    debug!("Dispatching {} (id {})", call.tool, id);

    match run_tool(profiler, &call.tool, call.params).await {
        Ok(result) => ToolResponse::success(id, result),
        Err(e) => {
            warn!("{} failed: {}", call.tool, e);
            ToolResponse::failure(id, &e)
        }
    }
}

async fn run_tool<I: DeviceInventory>(
    profiler: &Profiler<I>,
    tool: &str,
    params: Value,
) -> Result<Value, ProfilerError> {
    match tool {
        "start" => {
            let request: StartRequest = parse_params(params)?;
            to_value(profiler.start(request).await?)
        }
        "stop" => {
            let StopParams { session_id } = parse_params(params)?;
            to_value(profiler.stop(&session_id).await?)
        }
        "analyze" => {
            let params: AnalyzeParams = if params.is_null() {
                AnalyzeParams::default()
            } else {
                parse_params(params)?
            };
            let target = match (params.session_id, params.trace_path) {
                (Some(id), None) => AnalyzeTarget::Session(id),
                (None, Some(path)) => AnalyzeTarget::TracePath(path),
                (Some(_), Some(_)) => {
                    return Err(ProfilerError::InvalidRequest(
                        "give either session_id or trace_path, not both".to_string(),
                    ))
                }
                (None, None) => {
                    return Err(ProfilerError::InvalidRequest(
                        "analyze needs session_id or trace_path".to_string(),
                    ))
                }
            };
            to_value(profiler.analyze(target, params.templates).await?)
        }
        "list_sessions" => to_value(profiler.list_sessions()),
        "cleanup_traces" => to_value(profiler.cleanup_traces()),
        other => Err(ProfilerError::InvalidRequest(format!(
            "unknown tool '{}'",
            other
        ))),
    }
}

fn parse_params<T: DeserializeOwned>(params: Value) -> Result<T, ProfilerError> {
    serde_json::from_value(params).map_err(|e| ProfilerError::InvalidRequest(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ProfilerError> {
    serde_json::to_value(value)
        .map_err(|e| ProfilerError::Internal(format!("cannot serialize result: {}", e)))
}

/// Serve tool calls read from `reader`, writing responses to `writer`
///
/// Returns once the input ends and every in-flight call has answered.
pub async fn serve<I, R, W>(profiler: Arc<Profiler<I>>, reader: R, mut writer: W) -> std::io::Result<()>
where
    I: DeviceInventory + 'static,
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let writer_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            writer.write_all(line.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        Ok::<(), std::io::Error>(())
    });

    let mut in_flight = JoinSet::new();
    let mut lines = reader.lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }

        let call: ToolCall = match serde_json::from_str(&line) {
            Ok(call) => call,
            Err(e) => {
                let error = ProfilerError::InvalidRequest(format!("malformed request: {}", e));
                send(&tx, &ToolResponse::failure(Value::Null, &error));
                continue;
            }
        };

        let profiler = Arc::clone(&profiler);
        let tx = tx.clone();
        in_flight.spawn(async move {
            let response = dispatch(&profiler, call).await;
            send(&tx, &response);
        });

        // Reap finished calls so the set does not grow without bound
        while in_flight.try_join_next().is_some() {}
    }

    info!("Input closed, waiting for {} in-flight calls", in_flight.len());
    while let Some(joined) = in_flight.join_next().await {
        if let Err(e) = joined {
            warn!("Tool call task failed: {}", e);
        }
    }

    let cleared = profiler.shutdown();
    info!("Profiler shut down, {} sessions cleared", cleared);

    drop(tx);
    match writer_task.await {
        Ok(result) => result,
        Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e)),
    }
}

/// Serve on the process's stdin and stdout
pub async fn serve_stdio<I: DeviceInventory + 'static>(
    profiler: Arc<Profiler<I>>,
) -> std::io::Result<()> {
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    serve(profiler, stdin, tokio::io::stdout()).await
}

fn send(tx: &mpsc::UnboundedSender<String>, response: &ToolResponse) {
    match serde_json::to_string(response) {
        Ok(line) => {
            if tx.send(line).is_err() {
                warn!("Response writer is gone, dropping response {}", response.id);
            }
        }
        Err(e) => warn!("Could not serialize response {}: {}", response.id, e),
    }
}
