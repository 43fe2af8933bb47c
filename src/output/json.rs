//! JSON output for analysis results.
//!
//! Writes `AnalysisResult` to pretty-printed JSON files and reads them back.

use crate::aggregator::AnalysisResult;
use crate::utils::error::OutputError;
use log::{debug, info};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Write an analysis result to a JSON file
///
/// **Public** - main entry point for JSON output
///
/// # Arguments
/// * `result` - Analysis to write
/// * `output_path` - Path to output JSON file
///
/// # Errors
/// * `OutputError::WriteFailed` - I/O error during write
/// * `OutputError::SerializationFailed` - JSON serialization error
/// * `OutputError::InvalidPath` - Path cannot be created or is invalid
pub fn write_analysis(
    result: &AnalysisResult,
    output_path: impl AsRef<Path>,
) -> Result<(), OutputError> {
    let output_path = output_path.as_ref();

    info!("Writing analysis to: {}", output_path.display());

    validate_output_path(output_path)?;

    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            debug!("Creating parent directories: {}", parent.display());
            std::fs::create_dir_all(parent).map_err(|e| {
                OutputError::InvalidPath(format!(
                    "Cannot create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
    }

    let file = File::create(output_path).map_err(OutputError::WriteFailed)?;
    let writer = BufWriter::new(file);

    serde_json::to_writer_pretty(writer, result).map_err(OutputError::SerializationFailed)?;

    info!(
        "Analysis written successfully ({} bytes)",
        calculate_file_size(output_path)
    );

    Ok(())
}

/// Serialize an analysis result to a pretty JSON string
pub fn analysis_to_string(result: &AnalysisResult) -> Result<String, OutputError> {
    serde_json::to_string_pretty(result).map_err(OutputError::SerializationFailed)
}

/// Validate that output path is writable
///
/// **Private** - internal validation
fn validate_output_path(path: &Path) -> Result<(), OutputError> {
    if path.as_os_str().is_empty() {
        return Err(OutputError::InvalidPath("Path is empty".to_string()));
    }

    if path.is_dir() {
        return Err(OutputError::InvalidPath(format!(
            "Path is a directory: {}",
            path.display()
        )));
    }

    Ok(())
}

fn calculate_file_size(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Read an analysis result from a JSON file
///
/// **Public** - used to re-display saved analyses and by tests
///
/// # Errors
/// * `OutputError::WriteFailed` - File read error (reusing WriteFailed for I/O)
/// * `OutputError::SerializationFailed` - JSON parse error
pub fn read_analysis(input_path: impl AsRef<Path>) -> Result<AnalysisResult, OutputError> {
    let input_path = input_path.as_ref();

    debug!("Reading analysis from: {}", input_path.display());

    let file = File::open(input_path).map_err(OutputError::WriteFailed)?;
    let result: AnalysisResult =
        serde_json::from_reader(file).map_err(OutputError::SerializationFailed)?;

    debug!(
        "Analysis loaded: version {}, {} templates",
        result.summary.version,
        result.summary.templates_analyzed.len()
    );

    Ok(result)
}
