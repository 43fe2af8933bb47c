use crate::output::read_analysis;
use crate::utils::config::{DEFAULT_TEMPLATES, SCHEMA_VERSION, TEMPLATE_ALIASES};
use crate::xctrace::AnalysisKind;
use anyhow::{Context, Result};
use std::path::PathBuf;

/// Validate a saved analysis JSON file
pub fn validate_analysis_file(file_path: PathBuf) -> Result<()> {
    println!("Validating analysis: {}", file_path.display());

    let result = read_analysis(&file_path)
        .with_context(|| format!("Failed to read {}", file_path.display()))?;
    let summary = &result.summary;

    println!("✓ Valid analysis JSON");
    println!("  Version: {}", summary.version);
    println!("  Trace: {}", summary.trace_path.display());
    if let Some(session_id) = &summary.session_id {
        println!("  Session: {}", session_id);
    }
    println!("  Templates: {}", summary.templates_analyzed.join(", "));
    println!("  Partial: {}", summary.partial);
    println!("  Generated: {}", summary.generated_at);

    Ok(())
}

/// Display the template alias table
pub fn display_templates() {
    println!("Template aliases");
    println!();
    for (alias, canonical) in TEMPLATE_ALIASES {
        let parsed = if AnalysisKind::from_template(canonical).is_some() {
            "analyzable"
        } else {
            "record only"
        };
        println!("  {:<14} {:<18} {}", alias, canonical, parsed);
    }
    println!();
    println!("Default: {}", DEFAULT_TEMPLATES.join(", "));
    println!("Unknown names are passed to xctrace unchanged.");
}

/// Display version information
pub fn display_version() {
    println!("iOS Trace Studio v{}", env!("CARGO_PKG_VERSION"));
    println!("Analysis Schema: v{}", SCHEMA_VERSION);
    println!();
    println!("Profiling sessions and trace analysis for iOS apps via xctrace.");
}
