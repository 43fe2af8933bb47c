//! Aggregation of parsed tables into ranked summaries.
//!
//! This module provides:
//! - Top-N ranking with percentages (shared by every template)
//! - The combined analysis result and its summary block

pub mod analysis;
pub mod metrics;

// Re-export main types and functions
pub use analysis::{AnalysisBuilder, AnalysisResult, AnalysisSummary};
pub use metrics::{percentage_of, rank_top_n, Ranked};
