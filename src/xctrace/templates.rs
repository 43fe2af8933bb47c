//! Template names and the analyses the exporter knows how to summarize.

use crate::utils::config::{DEFAULT_TEMPLATES, TEMPLATE_ALIASES};
use serde::{Deserialize, Serialize};

/// Map a short template name to its canonical collector name
///
/// Matching is case-insensitive. Unknown names pass through unchanged so
/// custom templates still reach xctrace.
pub fn canonical_template_name(name: &str) -> String {
    let lowered = name.trim().to_lowercase();
    TEMPLATE_ALIASES
        .iter()
        .find(|(alias, canonical)| *alias == lowered || canonical.to_lowercase() == lowered)
        .map(|(_, canonical)| canonical.to_string())
        .unwrap_or_else(|| name.to_string())
}

/// Templates used when the caller does not pick any
pub fn default_templates() -> Vec<String> {
    DEFAULT_TEMPLATES.iter().map(|t| t.to_string()).collect()
}

/// Templates whose exported tables we can parse
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisKind {
    TimeProfiler,
    Allocations,
    Leaks,
}

impl AnalysisKind {
    pub const ALL: [AnalysisKind; 3] = [Self::TimeProfiler, Self::Allocations, Self::Leaks];

    /// Resolve any short or canonical template name
    pub fn from_template(name: &str) -> Option<Self> {
        match canonical_template_name(name).as_str() {
            "Time Profiler" => Some(Self::TimeProfiler),
            "Allocations" => Some(Self::Allocations),
            "Leaks" => Some(Self::Leaks),
            _ => None,
        }
    }

    pub fn template_name(&self) -> &'static str {
        match self {
            Self::TimeProfiler => "Time Profiler",
            Self::Allocations => "Allocations",
            Self::Leaks => "Leaks",
        }
    }

    /// Schema of the table selected from the trace table of contents
    pub fn table_schema(&self) -> &'static str {
        match self {
            Self::TimeProfiler => "time-profile",
            Self::Allocations => "allocations",
            Self::Leaks => "leaks",
        }
    }

    /// XPath handed to `xctrace export`
    pub fn table_selector(&self) -> String {
        format!(
            "/trace-toc/run[@number=\"1\"]/data/table[@schema=\"{}\"]",
            self.table_schema()
        )
    }
}

/// Resolve requested template names into analyses, keeping first-seen order
///
/// `None` or an empty list means all three. Names without a parser are
/// returned separately so the caller can report them.
pub fn resolve_analysis_kinds(requested: Option<&[String]>) -> (Vec<AnalysisKind>, Vec<String>) {
    let Some(requested) = requested.filter(|r| !r.is_empty()) else {
        return (AnalysisKind::ALL.to_vec(), Vec::new());
    };

    let mut kinds = Vec::new();
    let mut unsupported = Vec::new();
    for name in requested {
        match AnalysisKind::from_template(name) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => unsupported.push(name.clone()),
        }
    }
    (kinds, unsupported)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names() {
        assert_eq!(canonical_template_name("time"), "Time Profiler");
        assert_eq!(canonical_template_name("CPU"), "Time Profiler");
        assert_eq!(canonical_template_name("alloc"), "Allocations");
        assert_eq!(canonical_template_name("Leaks"), "Leaks");
    }

    #[test]
    fn test_unknown_template_passes_through() {
        assert_eq!(canonical_template_name("My Custom"), "My Custom");
    }

    #[test]
    fn test_from_template() {
        assert_eq!(AnalysisKind::from_template("time"), Some(AnalysisKind::TimeProfiler));
        assert_eq!(AnalysisKind::from_template("Allocations"), Some(AnalysisKind::Allocations));
        assert_eq!(AnalysisKind::from_template("network"), None);
    }

    #[test]
    fn test_resolve_defaults_to_all() {
        let (kinds, unsupported) = resolve_analysis_kinds(None);
        assert_eq!(kinds, AnalysisKind::ALL.to_vec());
        assert!(unsupported.is_empty());

        let (kinds, _) = resolve_analysis_kinds(Some(&[]));
        assert_eq!(kinds.len(), 3);
    }

    #[test]
    fn test_resolve_dedupes_and_reports_unsupported() {
        let requested = vec![
            "leaks".to_string(),
            "Leaks".to_string(),
            "energy".to_string(),
            "time".to_string(),
        ];
        let (kinds, unsupported) = resolve_analysis_kinds(Some(&requested));

        assert_eq!(kinds, vec![AnalysisKind::Leaks, AnalysisKind::TimeProfiler]);
        assert_eq!(unsupported, vec!["energy".to_string()]);
    }

    #[test]
    fn test_table_selector() {
        assert_eq!(
            AnalysisKind::TimeProfiler.table_selector(),
            "/trace-toc/run[@number=\"1\"]/data/table[@schema=\"time-profile\"]"
        );
    }
}
