//! Parsing of exported trace tables into summaries.
//!
//! This module handles:
//! - Row extraction from exported XML tables
//! - Time Profiler, Allocations and Leaks summaries
//! - The summary schema returned by analyze()
//!
//! Parsers never fail. Input they cannot read turns into a zero-valued
//! summary with `partial` set, so one bad export never sinks the others.

pub mod allocations;
pub mod leaks;
pub mod rows;
pub mod schema;
pub mod time_profiler;

// Re-export main types
pub use allocations::{bytes_to_mb, parse_allocations_output};
pub use leaks::parse_leaks_output;
pub use schema::{
    AllocationCategory, AllocationsData, LeakRecord, LeaksData, SymbolTime, TimeProfilerData,
};
pub use time_profiler::parse_time_profiler_output;
