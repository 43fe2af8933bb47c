//! CLI command implementations.
//!
//! Each command is implemented in its own module.
//! Commands orchestrate the various library components to perform user tasks.

pub mod analyze;
pub mod cleanup;
pub mod serve;
pub mod utils;

// Re-export main command functions
pub use analyze::{execute_analyze, validate_args, AnalyzeArgs};
pub use cleanup::execute_cleanup;
pub use serve::execute_serve;
pub use utils::{display_templates, display_version, validate_analysis_file};
