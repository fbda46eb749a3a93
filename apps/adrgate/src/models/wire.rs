//! JSON documents exchanged with the governance service.

use super::governance::GovernanceRule;
use super::ResolvedViolation;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Response of the repo-scoped manifest query.
pub struct ManifestDocument {
    pub repo: String,
    #[serde(default)]
    pub rules: Vec<ManifestEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub id: String,
    /// Null for an ADR that declares no enforcement.
    #[serde(default)]
    pub tool: Option<String>,
    #[serde(default)]
    pub rule_id: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
}

impl From<&GovernanceRule> for ManifestEntry {
    fn from(r: &GovernanceRule) -> Self {
        Self {
            id: r.adr_id.clone(),
            tool: Some(r.tool.clone()),
            rule_id: Some(r.rule_id.clone()),
            severity: r.severity.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Violation as carried by the upload payload. Severity stays local.
pub struct WireViolation {
    pub adr_id: String,
    pub file: String,
    pub line: u64,
    pub message: String,
}

impl From<&ResolvedViolation> for WireViolation {
    fn from(v: &ResolvedViolation) -> Self {
        Self {
            adr_id: v.adr_id.clone(),
            file: v.file.clone(),
            line: v.line,
            message: v.message.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadPayload {
    pub violations: Vec<WireViolation>,
}

impl UploadPayload {
    pub fn from_violations(violations: &[ResolvedViolation]) -> Self {
        Self {
            violations: violations.iter().map(WireViolation::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViolationsDocument {
    pub violations: Vec<WireViolation>,
}
