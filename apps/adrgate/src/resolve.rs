//! Rule resolver: joins raw findings against the governance manifest.
//!
//! Lookup is an exact `(tool, rule_id)` match. A miss is the common case for
//! lint rules no ADR cares about, so it is counted and reported, never raised.

use crate::manifest::RuleSet;
use crate::models::governance::GovernanceRule;
use crate::models::{RawFinding, ResolvedViolation, UnmappedRule, DEFAULT_SEVERITY};
use tracing::debug;

/// Point lookup of the rule governing a `(tool, rule_id)` pair.
pub trait RuleLookup {
    fn find_rule(&self, tool: &str, rule_id: &str) -> Option<&GovernanceRule>;
}

impl RuleLookup for RuleSet {
    fn find_rule(&self, tool: &str, rule_id: &str) -> Option<&GovernanceRule> {
        self.lookup(tool, rule_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    Resolved(ResolvedViolation),
    Dropped(UnmappedRule),
}

/// Resolve one finding. Severity comes from the finding, then the rule,
/// then defaults to `error`.
pub fn resolve<L: RuleLookup + ?Sized>(finding: &RawFinding, rules: &L) -> Resolution {
    let rule = finding
        .rule_id
        .as_deref()
        .and_then(|id| rules.find_rule(&finding.tool, id));
    match rule {
        Some(rule) => Resolution::Resolved(ResolvedViolation {
            adr_id: rule.adr_id.clone(),
            file: finding.file_path.clone(),
            line: finding.line,
            message: finding.message.clone(),
            severity: finding
                .level
                .clone()
                .or_else(|| rule.severity.clone())
                .unwrap_or_else(|| DEFAULT_SEVERITY.to_string()),
        }),
        None => Resolution::Dropped(UnmappedRule {
            tool: finding.tool.clone(),
            rule_id: finding.rule_id.clone(),
        }),
    }
}

/// Per-run resolver that tracks every miss.
pub struct Resolver<'a, L: RuleLookup + ?Sized> {
    rules: &'a L,
    unmapped: Vec<UnmappedRule>,
}

impl<'a, L: RuleLookup + ?Sized> Resolver<'a, L> {
    pub fn new(rules: &'a L) -> Self {
        Self {
            rules,
            unmapped: Vec::new(),
        }
    }

    /// Resolve a document's findings, keeping emission order.
    pub fn resolve_all(&mut self, findings: &[RawFinding]) -> Vec<ResolvedViolation> {
        let mut out = Vec::with_capacity(findings.len());
        for f in findings {
            match resolve(f, self.rules) {
                Resolution::Resolved(v) => out.push(v),
                Resolution::Dropped(miss) => {
                    debug!(tool = %miss.tool, rule_id = ?miss.rule_id, "no governing ADR");
                    self.unmapped.push(miss);
                }
            }
        }
        out
    }

    pub fn unmapped_count(&self) -> usize {
        self.unmapped.len()
    }

    pub fn into_unmapped(self) -> Vec<UnmappedRule> {
        self.unmapped
    }
}
