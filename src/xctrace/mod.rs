//! Everything that talks to `xcrun xctrace`: template names, argument
//! building and table export.

pub mod command;
pub mod export;
pub mod templates;

pub use command::{build_export_args, build_record_args, RecordRequest};
pub use export::{export_table, ExportOutput};
pub use templates::{
    canonical_template_name, default_templates, resolve_analysis_kinds, AnalysisKind,
};
