//! Summary types produced from exported trace tables.
//!
//! These are what analyze() hands back to the caller. Every ranked list is
//! bounded, sorted descending, and annotated with percentages of the ranked
//! total. `partial` is set when the export could not be read cleanly.

use serde::{Deserialize, Serialize};

/// CPU hotspots from the Time Profiler table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TimeProfilerData {
    /// Sum of total time over every parsed row, in milliseconds
    pub total_cpu_time_ms: f64,

    /// Top symbols ranked by total time
    pub top_symbols: Vec<SymbolTime>,

    /// Name of the top-ranked symbol, empty when there are no rows
    pub heaviest_stack_trace: String,

    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SymbolTime {
    pub symbol: String,
    pub self_time_ms: f64,
    pub total_time_ms: f64,
    pub percentage: f64,
}

/// Memory usage from the Allocations table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AllocationsData {
    /// Sum of sizes over every parsed row, in megabytes
    pub peak_memory_mb: f64,

    pub total_allocations: u64,

    /// Reported from the same aggregate as `total_allocations`; the export
    /// does not separate freed from live allocations
    pub living_allocations: u64,

    /// Top categories ranked by size
    pub top_categories: Vec<AllocationCategory>,

    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AllocationCategory {
    pub category: String,
    pub size_mb: f64,
    pub count: u64,
    pub percentage: f64,
}

/// Leak report
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeaksData {
    /// From the report header, authoritative
    pub total_leaked_mb: f64,

    /// From the report header, authoritative
    pub leak_count: u64,

    /// Individually parsed leak blocks
    pub leaks: Vec<LeakRecord>,

    pub partial: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeakRecord {
    pub address: String,
    pub size_bytes: u64,
    pub leak_type: String,
    pub call_stack: Vec<String>,
}
