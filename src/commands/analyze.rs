//! Analyze command implementation.
//!
//! The analyze command:
//! 1. Checks the trace bundle and the requested templates
//! 2. Exports and parses each template's table
//! 3. Prints a summary and/or writes the JSON result

use crate::output::write_analysis;
use crate::preflight::SimctlInventory;
use crate::supervisor::{AnalyzeTarget, Profiler};
use crate::utils::config::ProfilerConfig;
use crate::xctrace::resolve_analysis_kinds;
use anyhow::{Context, Result};
use log::info;
use std::path::PathBuf;
use std::time::Instant;

/// Arguments for the analyze command
///
/// **Public** - used by main.rs to construct from CLI args
#[derive(Debug, Clone, Default)]
pub struct AnalyzeArgs {
    /// Trace bundle to analyze
    pub trace_path: PathBuf,

    /// Templates to analyze (empty = all supported)
    pub templates: Vec<String>,

    /// Output path for the JSON result (optional)
    pub output_json: Option<PathBuf>,

    /// Print text summary to stdout
    pub print_summary: bool,
}

/// Execute the analyze command
///
/// **Public** - main entry point called from main.rs
///
/// # Errors
/// * Missing trace bundle or export tool
/// * File write errors
pub async fn execute_analyze(config: ProfilerConfig, args: AnalyzeArgs) -> Result<()> {
    let start_time = Instant::now();

    info!("Analyzing trace: {}", args.trace_path.display());

    let templates = (!args.templates.is_empty()).then(|| args.templates.clone());
    let inventory = SimctlInventory::new(config.xcrun.clone());
    let profiler = Profiler::new(config, inventory);

    let result = profiler
        .analyze(AnalyzeTarget::TracePath(args.trace_path.clone()), templates)
        .await
        .with_context(|| format!("Failed to analyze {}", args.trace_path.display()))?;

    if let Some(output) = &args.output_json {
        write_analysis(&result, output).context("Failed to write analysis JSON")?;
        info!("✓ Analysis written to: {}", output.display());
    }

    if args.print_summary || args.output_json.is_none() {
        println!("\n{}", "=".repeat(80));
        println!("TRACE SUMMARY");
        println!("{}", "=".repeat(80));
        println!("{}", result.text_summary());
        println!("{}", "=".repeat(80));
    }

    if result.summary.partial {
        info!("Some templates returned partial data, see warnings");
    }

    let elapsed = start_time.elapsed();
    info!("Analysis completed in {:.2}s", elapsed.as_secs_f64());

    Ok(())
}

/// Validate analyze arguments
///
/// **Public** - can be called before execute_analyze for early validation
pub fn validate_args(args: &AnalyzeArgs) -> Result<()> {
    if args.trace_path.as_os_str().is_empty() {
        anyhow::bail!("Trace path cannot be empty");
    }

    if !args.trace_path.exists() {
        anyhow::bail!("Trace not found: {}", args.trace_path.display());
    }

    if !args.templates.is_empty() {
        let (kinds, unsupported) = resolve_analysis_kinds(Some(&args.templates));
        if kinds.is_empty() {
            anyhow::bail!(
                "None of the requested templates can be analyzed: {}",
                unsupported.join(", ")
            );
        }
    }

    Ok(())
}
