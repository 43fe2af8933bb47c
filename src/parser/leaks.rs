//! Leak report parsing.
//!
//! The report starts with a header line that holds the authoritative totals:
//!
//! ```text
//! Process 4242: 2 leaks for 96 total leaked bytes.
//! ```
//!
//! followed by one block per leak:
//!
//! ```text
//! Leak: 0x600001234560  size=64  zone: DefaultMallocZone_0x100
//!     NSMutableArray  ObjC  Foundation
//!     Call stack: start | main | -[Feed reload]
//! ```
//!
//! The first line after the marker is the type, every following line is part
//! of the call stack, up to the next marker or the end of input.

use super::schema::{LeakRecord, LeaksData};
use crate::parser::allocations::bytes_to_mb;
use crate::utils::config::MAX_LEAK_RECORDS;
use crate::utils::error::ProfilerError;
use log::{debug, warn};
use regex::Regex;
use std::sync::LazyLock;

static HEADER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"Process\s+\d+:\s+(\d+)\s+leaks?\s+for\s+(\d+)\s+total\s+leaked\s+bytes")
        .expect("leak header pattern is valid")
});

static MARKER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*Leak:\s+(0x[0-9A-Fa-f]+)\s+size=(\d+)").expect("leak marker pattern is valid")
});

/// Parse a leak report
///
/// **Public** - never fails. Zero leaks is an all-zero summary; a report
/// without a readable header is an all-zero summary with `partial` set.
pub fn parse_leaks_output(text: &str) -> LeaksData {
    let (leak_count, leaked_bytes) = match parse_header(text) {
        Ok(totals) => totals,
        Err(e) => {
            warn!("{}", e);
            return LeaksData {
                partial: true,
                ..Default::default()
            };
        }
    };

    let mut leaks = parse_leak_blocks(text);
    if leaks.len() > MAX_LEAK_RECORDS {
        debug!("Keeping {} of {} leak records", MAX_LEAK_RECORDS, leaks.len());
        leaks.truncate(MAX_LEAK_RECORDS);
    }

    LeaksData {
        total_leaked_mb: bytes_to_mb(leaked_bytes),
        leak_count,
        leaks,
        partial: false,
    }
}

fn parse_header(text: &str) -> Result<(u64, u64), ProfilerError> {
    let failure = |reason: &str| ProfilerError::ParseFailure {
        template: "Leaks".to_string(),
        reason: reason.to_string(),
    };

    let caps = HEADER_RE
        .captures(text)
        .ok_or_else(|| failure("no leak summary header"))?;
    let count = caps[1]
        .parse::<u64>()
        .map_err(|_| failure("leak count out of range"))?;
    let bytes = caps[2]
        .parse::<u64>()
        .map_err(|_| failure("leaked byte total out of range"))?;

    Ok((count, bytes))
}

fn parse_leak_blocks(text: &str) -> Vec<LeakRecord> {
    let mut leaks: Vec<LeakRecord> = Vec::new();
    let mut current: Option<LeakRecord> = None;

    for line in text.lines() {
        if let Some(caps) = MARKER_RE.captures(line) {
            leaks.extend(current.take());
            current = Some(LeakRecord {
                address: caps[1].to_string(),
                size_bytes: caps[2].parse().unwrap_or(0),
                leak_type: String::new(),
                call_stack: Vec::new(),
            });
            continue;
        }

        let Some(leak) = current.as_mut() else {
            continue;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if leak.leak_type.is_empty() && leak.call_stack.is_empty() {
            leak.leak_type = line.to_string();
        } else {
            let frames = line.strip_prefix("Call stack:").unwrap_or(line);
            leak.call_stack.extend(
                frames
                    .split(" | ")
                    .map(str::trim)
                    .filter(|f| !f.is_empty())
                    .map(str::to_string),
            );
        }
    }
    leaks.extend(current);

    leaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_zero_leaks() {
        let data = parse_leaks_output("Process 1: 0 leaks for 0 total leaked bytes.\n");

        assert_eq!(data.total_leaked_mb, 0.0);
        assert_eq!(data.leak_count, 0);
        assert!(data.leaks.is_empty());
        assert!(!data.partial);
    }

    #[test]
    fn test_leak_blocks() {
        let report = "\
Process 4242: 2 leaks for 1048576 total leaked bytes.

Leak: 0x600001234560  size=524288  zone: DefaultMallocZone_0x100
\tNSMutableArray  ObjC  Foundation
\tCall stack: start | main | -[Feed reload]
Leak: 0x600001239990  size=524288
\tmalloc in FeedCache
\t-[FeedCache store:]
\t-[Feed reload]
";

        let data = parse_leaks_output(report);

        assert_eq!(data.leak_count, 2);
        assert_eq!(data.total_leaked_mb, 1.0);
        assert_eq!(
            data.leaks[0],
            LeakRecord {
                address: "0x600001234560".to_string(),
                size_bytes: 524288,
                leak_type: "NSMutableArray  ObjC  Foundation".to_string(),
                call_stack: vec![
                    "start".to_string(),
                    "main".to_string(),
                    "-[Feed reload]".to_string(),
                ],
            }
        );
        assert_eq!(data.leaks[1].leak_type, "malloc in FeedCache");
        assert_eq!(
            data.leaks[1].call_stack,
            vec!["-[FeedCache store:]".to_string(), "-[Feed reload]".to_string()]
        );
    }

    #[test]
    fn test_header_is_authoritative() {
        // Only one block made it into the export, the header still says 5
        let report = "Process 9: 5 leaks for 320 total leaked bytes.\nLeak: 0x1  size=64\n\tFoo\n";
        let data = parse_leaks_output(report);

        assert_eq!(data.leak_count, 5);
        assert_eq!(data.leaks.len(), 1);
    }

    #[test]
    fn test_singular_leak_header() {
        let data = parse_leaks_output("Process 9: 1 leak for 16 total leaked bytes.\n");
        assert_eq!(data.leak_count, 1);
    }

    #[test]
    fn test_malformed_degrades_to_zero() {
        let data = parse_leaks_output("leaks: unable to read trace");
        assert_eq!(
            data,
            LeaksData {
                partial: true,
                ..Default::default()
            }
        );
    }

    #[test]
    fn test_records_are_bounded() {
        let mut report = String::from("Process 1: 40 leaks for 640 total leaked bytes.\n");
        for i in 0..40 {
            report.push_str(&format!("Leak: 0x{:x}  size=16\n\tBlob\n", i + 1));
        }

        let data = parse_leaks_output(&report);
        assert_eq!(data.leak_count, 40);
        assert_eq!(data.leaks.len(), MAX_LEAK_RECORDS);
    }
}
