//! Shared data models flowing through extract → resolve → aggregate → annotate.

pub mod governance;
pub mod sarif;
pub mod wire;

use serde::{Deserialize, Serialize};

/// Path recorded for findings that declare no location.
pub const UNKNOWN_PATH: &str = "unknown";

/// Severity applied when neither the finding nor the rule declares one.
pub const DEFAULT_SEVERITY: &str = "error";

fn default_severity() -> String {
    DEFAULT_SEVERITY.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// A normalized analyzer finding, alive for one extraction pass.
pub struct RawFinding {
    /// Tool name, lower-cased.
    pub tool: String,
    pub rule_id: Option<String>,
    pub file_path: String,
    pub line: u64,
    pub message: String,
    /// Severity the analyzer attached to this finding, if any.
    pub level: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A finding tagged with the ADR that governs it.
pub struct ResolvedViolation {
    pub adr_id: String,
    pub file: String,
    pub line: u64,
    pub message: String,
    #[serde(default = "default_severity")]
    pub severity: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnnotationLevel {
    Failure,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// A CI review annotation pinned to a single line.
pub struct Annotation {
    pub path: String,
    pub start_line: u64,
    pub end_line: u64,
    #[serde(rename = "annotation_level")]
    pub level: AnnotationLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
/// A `(tool, rule_id)` pair that had no governing ADR.
pub struct UnmappedRule {
    pub tool: String,
    pub rule_id: Option<String>,
}

impl std::fmt::Display for UnmappedRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.rule_id {
            Some(r) => write!(f, "{}/{}", self.tool, r),
            None => write!(f, "{}/<no rule id>", self.tool),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Every resolved violation of a run in submission order, plus the misses.
pub struct CombinedResult {
    pub violations: Vec<ResolvedViolation>,
    pub unmapped: Vec<UnmappedRule>,
    pub unmapped_count: usize,
}

impl CombinedResult {
    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }
}
