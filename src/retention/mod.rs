//! Retention sweeper for the trace storage root.
//!
//! Each session owns one directory under the root. Directories whose
//! modification time is older than the TTL are removed, one entry at a time
//! and best effort: an entry that cannot be inspected or deleted is skipped.

use log::{debug, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Outcome of one sweep
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Directory entries looked at
    pub scanned: usize,

    /// Directories deleted
    pub removed: Vec<PathBuf>,

    /// Entries that could not be inspected or deleted
    pub skipped: usize,
}

/// Delete session directories older than `ttl`
///
/// **Public** - called before every new session and by the `cleanup` command
///
/// A missing root is a no-op. Files directly under the root are left alone.
pub fn cleanup_old_traces(root: &Path, ttl: Duration) -> SweepReport {
    cleanup_old_traces_at(root, ttl, SystemTime::now())
}

/// Same as [`cleanup_old_traces`] with an explicit notion of "now"
pub fn cleanup_old_traces_at(root: &Path, ttl: Duration, now: SystemTime) -> SweepReport {
    let mut report = SweepReport::default();

    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("Trace root {} does not exist, nothing to sweep", root.display());
            return report;
        }
        Err(e) => {
            warn!("Cannot read trace root {}: {}", root.display(), e);
            return report;
        }
    };

    for entry in entries {
        let Ok(entry) = entry else {
            report.skipped += 1;
            continue;
        };
        report.scanned += 1;
        let path = entry.path();

        let Ok(metadata) = entry.metadata() else {
            report.skipped += 1;
            continue;
        };
        if !metadata.is_dir() {
            continue;
        }

        let Ok(modified) = metadata.modified() else {
            report.skipped += 1;
            continue;
        };
        // Modification times in the future count as fresh
        let age = now.duration_since(modified).unwrap_or(Duration::ZERO);
        if age <= ttl {
            continue;
        }

        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!("Removed stale trace directory {}", path.display());
                report.removed.push(path);
            }
            Err(e) => {
                warn!("Could not remove {}: {}", path.display(), e);
                report.skipped += 1;
            }
        }
    }

    if !report.removed.is_empty() {
        info!(
            "Swept {} stale trace directories from {}",
            report.removed.len(),
            root.display()
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAY: Duration = Duration::from_secs(24 * 60 * 60);

    #[test]
    fn test_missing_root_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let report = cleanup_old_traces(&dir.path().join("missing"), DAY);
        assert_eq!(report, SweepReport::default());
    }

    #[test]
    fn test_fresh_entries_survive() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("session-a")).unwrap();

        let report = cleanup_old_traces(dir.path(), DAY);

        assert_eq!(report.scanned, 1);
        assert!(report.removed.is_empty());
        assert!(dir.path().join("session-a").exists());
    }

    #[test]
    fn test_stale_directories_removed_files_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let session = dir.path().join("session-a");
        std::fs::create_dir_all(session.join("recording.trace")).unwrap();
        std::fs::write(session.join("recording.trace/data"), b"x").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"keep me").unwrap();

        // Pretend a day and an hour have passed
        let later = SystemTime::now() + DAY + Duration::from_secs(3600);
        let report = cleanup_old_traces_at(dir.path(), DAY, later);

        assert_eq!(report.removed, vec![session.clone()]);
        assert!(!session.exists());
        assert!(dir.path().join("notes.txt").exists());
        assert_eq!(report.scanned, 2);
    }
}
