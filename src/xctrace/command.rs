//! Argument lists for `xcrun xctrace`.
//!
//! Both builders are pure: same request, same arguments. The program itself
//! (`xcrun` or a configured path) is chosen by the caller.

use super::templates::{canonical_template_name, AnalysisKind};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Everything needed to start one recording
#[derive(Debug, Clone, Default)]
pub struct RecordRequest {
    pub device_udid: String,
    pub bundle_id: String,

    /// Requested templates, short or canonical names, in order
    pub templates: Vec<String>,

    /// Where xctrace writes the trace bundle
    pub output_path: PathBuf,

    pub launch_args: Vec<String>,
    pub env_vars: BTreeMap<String, String>,
}

/// Build the argument list for `xcrun xctrace record`
///
/// **Public** - used by the supervisor and golden tests
///
/// Order is fixed: device selector, launch target, one selector pair per
/// template (`--template` for the first, `--instrument` after that), output
/// path, the stdout streaming flag, launch arguments, environment pairs.
pub fn build_record_args(request: &RecordRequest) -> Vec<String> {
    let mut args = vec![
        "xctrace".to_string(),
        "record".to_string(),
        "--device".to_string(),
        request.device_udid.clone(),
        "--launch".to_string(),
        request.bundle_id.clone(),
    ];

    for (index, template) in request.templates.iter().enumerate() {
        let selector = if index == 0 { "--template" } else { "--instrument" };
        args.push(selector.to_string());
        args.push(canonical_template_name(template));
    }

    args.push("--output".to_string());
    args.push(request.output_path.display().to_string());
    args.push("--target-stdout".to_string());
    args.push("-".to_string());

    for arg in &request.launch_args {
        args.push("--launch-arg".to_string());
        args.push(arg.clone());
    }

    for (key, value) in &request.env_vars {
        args.push("--env".to_string());
        args.push(format!("{}={}", key, value));
    }

    args
}

/// Build the argument list for `xcrun xctrace export` of one table
pub fn build_export_args(trace_path: &Path, kind: AnalysisKind) -> Vec<String> {
    vec![
        "xctrace".to_string(),
        "export".to_string(),
        "--input".to_string(),
        trace_path.display().to_string(),
        "--xpath".to_string(),
        kind.table_selector(),
    ]
}
