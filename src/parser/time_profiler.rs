//! Time Profiler export parsing.
//!
//! Each `<row>` carries a symbol, its self time and its total time in
//! milliseconds. Rows are kept as given (no merging by symbol) and ranked by
//! total time.

use super::rows::{extract_rows, looks_like_table, FieldPattern};
use super::schema::{SymbolTime, TimeProfilerData};
use crate::aggregator::metrics::rank_top_n;
use crate::utils::config::{SELF_TIME_FIELD_NAMES, SYMBOL_FIELD_NAMES, TOP_N, TOTAL_TIME_FIELD_NAMES};
use log::{debug, warn};

#[derive(Debug, Clone)]
struct CpuRow {
    symbol: String,
    self_time_ms: f64,
    total_time_ms: f64,
}

/// Parse a Time Profiler export into ranked CPU hotspots
///
/// **Public** - never fails; unreadable input yields a zero summary with
/// `partial` set
pub fn parse_time_profiler_output(text: &str) -> TimeProfilerData {
    let symbol_field = FieldPattern::new(SYMBOL_FIELD_NAMES);
    let self_field = FieldPattern::new(SELF_TIME_FIELD_NAMES);
    let total_field = FieldPattern::new(TOTAL_TIME_FIELD_NAMES);

    let raw_rows = extract_rows(text);
    let mut skipped = 0usize;
    let mut rows = Vec::with_capacity(raw_rows.len());

    for row in &raw_rows {
        let Some(total_time_ms) = total_field.find_number(row) else {
            skipped += 1;
            continue;
        };
        rows.push(CpuRow {
            symbol: symbol_field
                .find(row)
                .unwrap_or_else(|| "<unknown>".to_string()),
            self_time_ms: self_field.find_number(row).unwrap_or(0.0),
            total_time_ms,
        });
    }

    if skipped > 0 {
        warn!("Time Profiler: skipped {} rows without a total time", skipped);
    }
    let partial = skipped > 0 || (raw_rows.is_empty() && !looks_like_table(text));

    let total_cpu_time_ms: f64 = rows.iter().map(|r| r.total_time_ms).sum();
    let top_symbols: Vec<SymbolTime> = rank_top_n(rows, |r| r.total_time_ms, TOP_N)
        .into_iter()
        .map(|ranked| SymbolTime {
            symbol: ranked.item.symbol,
            self_time_ms: ranked.item.self_time_ms,
            total_time_ms: ranked.item.total_time_ms,
            percentage: ranked.percentage,
        })
        .collect();

    let heaviest_stack_trace = top_symbols
        .first()
        .map(|s| s.symbol.clone())
        .unwrap_or_default();

    debug!(
        "Time Profiler: {} symbols kept, {:.1} ms total",
        top_symbols.len(),
        total_cpu_time_ms
    );

    TimeProfilerData {
        total_cpu_time_ms,
        top_symbols,
        heaviest_stack_trace,
        partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(symbol: &str, self_ms: f64, total_ms: f64) -> String {
        format!(
            "<row><symbol>{}</symbol><self-time>{}</self-time><total-time>{}</total-time></row>",
            symbol, self_ms, total_ms
        )
    }

    fn export(rows: &[String]) -> String {
        format!(
            "<?xml version=\"1.0\"?><trace-query-result><node>{}</node></trace-query-result>",
            rows.join("\n")
        )
    }

    #[test]
    fn test_ranks_by_total_time() {
        let text = export(&[
            row("layoutSubviews", 5.0, 20.0),
            row("main", 1.0, 100.0),
            row("objc_msgSend", 30.0, 30.0),
        ]);

        let data = parse_time_profiler_output(&text);

        assert_eq!(data.top_symbols.len(), 3);
        assert_eq!(data.top_symbols[0].symbol, "main");
        assert_eq!(data.top_symbols[1].symbol, "objc_msgSend");
        assert_eq!(data.heaviest_stack_trace, "main");
        assert_eq!(data.total_cpu_time_ms, 150.0);
        assert!(!data.partial);
    }

    #[test]
    fn test_bounded_to_ten_and_percentages_sum() {
        let rows: Vec<String> = (1..=25).map(|i| row(&format!("f{}", i), 1.0, i as f64)).collect();
        let data = parse_time_profiler_output(&export(&rows));

        assert_eq!(data.top_symbols.len(), 10);
        assert!(data
            .top_symbols
            .windows(2)
            .all(|w| w[0].total_time_ms >= w[1].total_time_ms));
        let sum: f64 = data.top_symbols.iter().map(|s| s.percentage).sum();
        assert!((sum - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_duplicate_symbols_not_merged() {
        let text = export(&[row("main", 1.0, 10.0), row("main", 1.0, 20.0)]);
        let data = parse_time_profiler_output(&text);
        assert_eq!(data.top_symbols.len(), 2);
    }

    #[test]
    fn test_frame_name_fallback() {
        let text = export(&[
            "<row><frame id=\"4\" name=\"-[Feed reload]\"/><weight>12.5</weight></row>".to_string(),
        ]);
        let data = parse_time_profiler_output(&text);

        assert_eq!(data.top_symbols[0].symbol, "-[Feed reload]");
        assert_eq!(data.top_symbols[0].total_time_ms, 12.5);
        assert_eq!(data.top_symbols[0].self_time_ms, 0.0);
    }

    #[test]
    fn test_empty_table_is_not_partial() {
        let data = parse_time_profiler_output(&export(&[]));
        assert!(data.top_symbols.is_empty());
        assert_eq!(data.heaviest_stack_trace, "");
        assert!(!data.partial);
    }

    #[test]
    fn test_garbage_degrades_to_partial_zero() {
        let data = parse_time_profiler_output("xctrace: error: no such table");
        assert_eq!(data.total_cpu_time_ms, 0.0);
        assert!(data.top_symbols.is_empty());
        assert!(data.partial);
    }

    #[test]
    fn test_rows_without_time_are_skipped() {
        let text = export(&[row("main", 1.0, 10.0), "<row><symbol>broken</symbol></row>".to_string()]);
        let data = parse_time_profiler_output(&text);
        assert_eq!(data.top_symbols.len(), 1);
        assert!(data.partial);
    }
}
