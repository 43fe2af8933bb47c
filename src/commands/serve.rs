//! Serve command: run the JSON-lines tool loop on stdin/stdout.

use crate::preflight::SimctlInventory;
use crate::server::serve_stdio;
use crate::supervisor::Profiler;
use crate::utils::config::ProfilerConfig;
use anyhow::{Context, Result};
use log::info;
use std::sync::Arc;

/// Execute the serve command
///
/// **Public** - returns when stdin closes
pub async fn execute_serve(config: ProfilerConfig) -> Result<()> {
    info!("Trace root: {}", config.trace_root.display());
    info!("Recording tool: {}", config.xcrun.display());

    let inventory = SimctlInventory::new(config.xcrun.clone());
    let profiler = Arc::new(Profiler::new(config, inventory));

    info!("Serving tool calls on stdin");
    serve_stdio(profiler)
        .await
        .context("Tool loop failed")?;

    Ok(())
}
