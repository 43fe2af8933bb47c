//! Cleanup command: sweep stale trace directories.

use crate::retention::{cleanup_old_traces, SweepReport};
use crate::utils::config::ProfilerConfig;
use anyhow::Result;
use log::info;
use std::time::Duration;

/// Execute the cleanup command
///
/// **Public** - `ttl_hours` overrides the configured TTL when given
pub fn execute_cleanup(config: &ProfilerConfig, ttl_hours: Option<u64>) -> Result<SweepReport> {
    let ttl = ttl_hours
        .map(|h| Duration::from_secs(h * 60 * 60))
        .unwrap_or(config.trace_ttl);

    info!(
        "Sweeping {} (ttl {}h)",
        config.trace_root.display(),
        ttl.as_secs() / 3600
    );
    let report = cleanup_old_traces(&config.trace_root, ttl);

    println!("Scanned: {}", report.scanned);
    println!("Removed: {}", report.removed.len());
    for path in &report.removed {
        println!("  {}", path.display());
    }
    if report.skipped > 0 {
        println!("Skipped: {}", report.skipped);
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let config = ProfilerConfig::new().with_trace_root(dir.path().join("absent"));

        let report = execute_cleanup(&config, Some(1)).unwrap();
        assert_eq!(report.scanned, 0);
    }

    #[test]
    fn test_cleanup_keeps_fresh_dirs() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("session-new")).unwrap();
        let config = ProfilerConfig::new().with_trace_root(dir.path());

        let report = execute_cleanup(&config, None).unwrap();
        assert_eq!(report.scanned, 1);
        assert!(report.removed.is_empty());
        assert!(dir.path().join("session-new").exists());
    }
}
