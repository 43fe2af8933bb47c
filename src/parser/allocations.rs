//! Allocations export parsing.

use super::rows::{extract_rows, looks_like_table, FieldPattern};
use super::schema::{AllocationCategory, AllocationsData};
use crate::aggregator::metrics::rank_top_n;
use crate::utils::config::{
    BYTES_PER_MB, CATEGORY_FIELD_NAMES, COUNT_FIELD_NAMES, SIZE_FIELD_NAMES, TOP_N,
};
use log::{debug, warn};

#[derive(Debug, Clone)]
struct AllocationRow {
    category: String,
    size_bytes: u64,
    count: u64,
}

/// Bytes to megabytes (1 MB = 1,048,576 bytes)
pub fn bytes_to_mb(bytes: u64) -> f64 {
    bytes as f64 / BYTES_PER_MB
}

/// Parse an Allocations export into ranked categories
///
/// **Public** - never fails; unreadable input yields a zero summary with
/// `partial` set
///
/// Total and living counts both come from the summed row counts.
pub fn parse_allocations_output(text: &str) -> AllocationsData {
    let category_field = FieldPattern::new(CATEGORY_FIELD_NAMES);
    let size_field = FieldPattern::new(SIZE_FIELD_NAMES);
    let count_field = FieldPattern::new(COUNT_FIELD_NAMES);

    let raw_rows = extract_rows(text);
    let mut skipped = 0usize;
    let mut rows = Vec::with_capacity(raw_rows.len());

    for row in &raw_rows {
        let Some(size) = size_field.find_number(row) else {
            skipped += 1;
            continue;
        };
        rows.push(AllocationRow {
            category: category_field
                .find(row)
                .unwrap_or_else(|| "<unknown>".to_string()),
            size_bytes: size as u64,
            count: count_field.find_number(row).map(|c| c as u64).unwrap_or(0),
        });
    }

    if skipped > 0 {
        warn!("Allocations: skipped {} rows without a size", skipped);
    }
    let partial = skipped > 0 || (raw_rows.is_empty() && !looks_like_table(text));

    let total_bytes: u64 = rows.iter().map(|r| r.size_bytes).sum();
    let total_allocations: u64 = rows.iter().map(|r| r.count).sum();

    let top_categories: Vec<AllocationCategory> =
        rank_top_n(rows, |r| r.size_bytes as f64, TOP_N)
            .into_iter()
            .map(|ranked| AllocationCategory {
                category: ranked.item.category,
                size_mb: bytes_to_mb(ranked.item.size_bytes),
                count: ranked.item.count,
                percentage: ranked.percentage,
            })
            .collect();

    debug!(
        "Allocations: {} categories kept, {} bytes total",
        top_categories.len(),
        total_bytes
    );

    AllocationsData {
        peak_memory_mb: bytes_to_mb(total_bytes),
        total_allocations,
        living_allocations: total_allocations,
        top_categories,
        partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(category: &str, size: u64, count: u64) -> String {
        format!(
            "<row><category>{}</category><size>{}</size><count>{}</count></row>",
            category, size, count
        )
    }

    fn export(rows: &[String]) -> String {
        format!("<trace-query-result><node>{}</node></trace-query-result>", rows.join(""))
    }

    #[test]
    fn test_size_conversion_is_exact() {
        assert_eq!(bytes_to_mb(10_485_760), 10.0);

        let data = parse_allocations_output(&export(&[row("Malloc 16 Bytes", 10_485_760, 3)]));
        assert_eq!(data.top_categories[0].size_mb, 10.0);
        assert_eq!(data.top_categories[0].percentage, 100.0);
    }

    #[test]
    fn test_ranks_by_size() {
        let text = export(&[
            row("CFString", 1_048_576, 10),
            row("UIImage", 4_194_304, 2),
            row("NSArray", 2_097_152, 5),
        ]);

        let data = parse_allocations_output(&text);

        let names: Vec<&str> = data.top_categories.iter().map(|c| c.category.as_str()).collect();
        assert_eq!(names, vec!["UIImage", "NSArray", "CFString"]);
        assert_eq!(data.peak_memory_mb, 7.0);
        assert_eq!(data.total_allocations, 17);
        assert_eq!(data.living_allocations, 17);
        assert!(!data.partial);
    }

    #[test]
    fn test_fallback_field_names() {
        let text = export(&["<row><type>VM: ImageIO</type><bytes>2,097,152</bytes><allocations>4</allocations></row>".to_string()]);
        let data = parse_allocations_output(&text);

        assert_eq!(data.top_categories[0].category, "VM: ImageIO");
        assert_eq!(data.top_categories[0].size_mb, 2.0);
        assert_eq!(data.top_categories[0].count, 4);
    }

    #[test]
    fn test_bounded_to_ten() {
        let rows: Vec<String> = (1..=12).map(|i| row(&format!("c{}", i), i * 1024, 1)).collect();
        let data = parse_allocations_output(&export(&rows));

        assert_eq!(data.top_categories.len(), 10);
        assert_eq!(data.top_categories[0].category, "c12");
        assert_eq!(data.total_allocations, 12);
    }

    #[test]
    fn test_garbage_degrades() {
        let data = parse_allocations_output("");
        assert_eq!(data, AllocationsData { partial: true, ..Default::default() });
    }
}
