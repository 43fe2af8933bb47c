//! Combine per-template summaries into one analysis result.

use crate::parser::schema::{AllocationsData, LeaksData, TimeProfilerData};
use crate::utils::config::SCHEMA_VERSION;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Everything analyze() returns
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub summary: AnalysisSummary,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_profiler: Option<TimeProfilerData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allocations: Option<AllocationsData>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub leaks: Option<LeaksData>,
}

/// Top-level facts about the analyzed trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisSummary {
    /// Schema version for compatibility checking
    pub version: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<String>,

    pub trace_path: PathBuf,

    /// Recording length, known only when analyzing a session
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,

    /// Canonical names of the templates that were analyzed, in order
    pub templates_analyzed: Vec<String>,

    pub trace_file_size_mb: f64,

    /// True if any template's data is incomplete
    pub partial: bool,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,

    /// Timestamp when the analysis was produced
    pub generated_at: String,
}

/// Collects template summaries as they are produced
#[derive(Debug, Clone)]
pub struct AnalysisBuilder {
    session_id: Option<String>,
    trace_path: PathBuf,
    duration_seconds: Option<f64>,
    trace_file_size_mb: f64,
    templates_analyzed: Vec<String>,
    warnings: Vec<String>,
    time_profiler: Option<TimeProfilerData>,
    allocations: Option<AllocationsData>,
    leaks: Option<LeaksData>,
}

impl AnalysisBuilder {
    pub fn new(trace_path: impl Into<PathBuf>, trace_file_size_mb: f64) -> Self {
        Self {
            session_id: None,
            trace_path: trace_path.into(),
            duration_seconds: None,
            trace_file_size_mb,
            templates_analyzed: Vec::new(),
            warnings: Vec::new(),
            time_profiler: None,
            allocations: None,
            leaks: None,
        }
    }

    pub fn with_session(mut self, session_id: impl Into<String>, duration_seconds: f64) -> Self {
        self.session_id = Some(session_id.into());
        self.duration_seconds = Some(duration_seconds);
        self
    }

    pub fn time_profiler(&mut self, data: TimeProfilerData) {
        self.templates_analyzed.push("Time Profiler".to_string());
        self.time_profiler = Some(data);
    }

    pub fn allocations(&mut self, data: AllocationsData) {
        self.templates_analyzed.push("Allocations".to_string());
        self.allocations = Some(data);
    }

    pub fn leaks(&mut self, data: LeaksData) {
        self.templates_analyzed.push("Leaks".to_string());
        self.leaks = Some(data);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub fn finish(self) -> AnalysisResult {
        let partial = self.time_profiler.as_ref().is_some_and(|d| d.partial)
            || self.allocations.as_ref().is_some_and(|d| d.partial)
            || self.leaks.as_ref().is_some_and(|d| d.partial);

        AnalysisResult {
            summary: AnalysisSummary {
                version: SCHEMA_VERSION.to_string(),
                session_id: self.session_id,
                trace_path: self.trace_path,
                duration_seconds: self.duration_seconds,
                templates_analyzed: self.templates_analyzed,
                trace_file_size_mb: self.trace_file_size_mb,
                partial,
                warnings: self.warnings,
                generated_at: Utc::now().to_rfc3339(),
            },
            time_profiler: self.time_profiler,
            allocations: self.allocations,
            leaks: self.leaks,
        }
    }
}

impl AnalysisResult {
    /// Human-readable digest for terminals
    pub fn text_summary(&self) -> String {
        let mut out = String::new();
        let s = &self.summary;

        out.push_str(&format!("Trace: {}\n", s.trace_path.display()));
        if let Some(duration) = s.duration_seconds {
            out.push_str(&format!("Duration: {:.1}s\n", duration));
        }
        out.push_str(&format!("Size: {:.2} MB\n", s.trace_file_size_mb));
        out.push_str(&format!("Templates: {}\n", s.templates_analyzed.join(", ")));

        if let Some(tp) = &self.time_profiler {
            out.push_str(&format!("\nCPU ({:.1} ms total)\n", tp.total_cpu_time_ms));
            for (i, sym) in tp.top_symbols.iter().enumerate() {
                out.push_str(&format!(
                    "  {:>2}. {:>6.1}%  {:>9.1} ms  {}\n",
                    i + 1,
                    sym.percentage,
                    sym.total_time_ms,
                    sym.symbol
                ));
            }
        }

        if let Some(alloc) = &self.allocations {
            out.push_str(&format!(
                "\nMemory ({:.2} MB, {} allocations)\n",
                alloc.peak_memory_mb, alloc.total_allocations
            ));
            for (i, cat) in alloc.top_categories.iter().enumerate() {
                out.push_str(&format!(
                    "  {:>2}. {:>6.1}%  {:>9.2} MB  {}\n",
                    i + 1,
                    cat.percentage,
                    cat.size_mb,
                    cat.category
                ));
            }
        }

        if let Some(leaks) = &self.leaks {
            out.push_str(&format!(
                "\nLeaks: {} ({:.3} MB)\n",
                leaks.leak_count, leaks.total_leaked_mb
            ));
            for leak in &leaks.leaks {
                out.push_str(&format!(
                    "  {}  {} bytes  {}\n",
                    leak.address, leak.size_bytes, leak.leak_type
                ));
            }
        }

        for warning in &s.warnings {
            out.push_str(&format!("\nwarning: {}", warning));
        }

        out
    }
}
