//! Environment health checks.
//!
//! `batchbuild doctor` verifies that the external tools the pipeline
//! shells out to are on PATH, so a missing `svn` or `bzr` surfaces
//! before a two-hour run instead of halfway through it.

use std::path::PathBuf;

/// Result of a single tool check.
#[derive(Debug, Clone)]
pub struct CheckResult {
    /// Tool name
    pub name: String,

    /// Whether the tool was found
    pub passed: bool,

    /// Human-readable status (the path, or why it failed)
    pub message: String,

    /// Path to the tool, when found
    pub path: Option<PathBuf>,

    /// Whether the tool is required for batchbuild to work at all
    pub required: bool,
}

/// Summary of all checks.
#[derive(Debug, Clone, Default)]
pub struct DoctorReport {
    pub checks: Vec<CheckResult>,
}

impl DoctorReport {
    /// Whether every required check passed.
    pub fn all_required_passed(&self) -> bool {
        self.checks.iter().filter(|c| c.required).all(|c| c.passed)
    }
}

/// Tools the pipeline may shell out to. Only `sh` is required: every
/// command runs through it. The rest depend on which repo-types and
/// build recipes the user's projects actually use.
const REQUIRED_TOOLS: &[&str] = &["sh"];
const OPTIONAL_TOOLS: &[&str] = &["git", "svn", "bzr", "hg", "make"];

/// Check the availability of the external tools.
pub fn doctor() -> DoctorReport {
    let mut report = DoctorReport::default();
    for tool in REQUIRED_TOOLS {
        report.checks.push(check_tool(tool, true));
    }
    for tool in OPTIONAL_TOOLS {
        report.checks.push(check_tool(tool, false));
    }
    report
}

fn check_tool(name: &str, required: bool) -> CheckResult {
    match which::which(name) {
        Ok(path) => CheckResult {
            name: name.to_string(),
            passed: true,
            message: path.display().to_string(),
            path: Some(path),
            required,
        },
        Err(_) => CheckResult {
            name: name.to_string(),
            passed: false,
            message: "not found in PATH".to_string(),
            path: None,
            required,
        },
    }
}
