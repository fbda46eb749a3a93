//! Governance rules as declared in ADR front matter.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// One enforceable ADR, stored per repo and keyed by `adr_id`.
pub struct GovernanceRule {
    pub adr_id: String,
    pub title: String,
    pub repo: String,
    pub tool: String,
    pub rule_id: String,
    pub severity: Option<String>,
}

impl GovernanceRule {
    pub fn key(&self) -> RuleKey {
        RuleKey::new(&self.tool, &self.rule_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
/// Exact, case-sensitive lookup key.
pub struct RuleKey {
    pub tool: String,
    pub rule_id: String,
}

impl RuleKey {
    pub fn new(tool: &str, rule_id: &str) -> Self {
        Self {
            tool: tool.to_string(),
            rule_id: rule_id.to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// Structured header block of an ADR document.
pub struct AdrFrontMatter {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub enforcement: Option<Enforcement>,
}

#[derive(Debug, Deserialize)]
pub struct Enforcement {
    pub tool: String,
    pub rule_id: String,
    #[serde(default)]
    pub severity: Option<String>,
}
