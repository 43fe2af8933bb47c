//! Output writers for analysis results.
//!
//! This module handles writing data to disk:
//! - JSON analyses (pretty printed)
//! - Text summaries live on `AnalysisResult::text_summary`

pub mod json;

// Re-export main functions
pub use json::{analysis_to_string, read_analysis, write_analysis};
