//! Manifest store: repo-scoped governance rules loaded from ADR front matter.
//!
//! Each repo owns an immutable `RuleSet`. A rebuild parses the ADR directory
//! into a fresh set and swaps it in under a short write lock, so readers see
//! either the old or the new set in full. Readers hold an `Arc` to the set
//! they looked up; the previous set is dropped once the last reader lets go.
//!
//! Documents are `*.md` files directly under the source root, parsed in file
//! name order. A document starting with `---` carries a YAML header:
//!
//! ```yaml
//! id: ADR-001
//! title: No eval
//! enforcement:
//!   tool: eslint
//!   rule_id: no-eval
//!   severity: error
//! ```

use crate::models::governance::{AdrFrontMatter, GovernanceRule, RuleKey};
use crate::models::wire::{ManifestDocument, ManifestEntry};
use glob::glob;
use regex::Regex;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::{Arc, OnceLock, RwLock};
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
/// When the local manifest rescans the ADR directory.
pub enum Freshness {
    /// Rebuild once when the manifest is opened.
    Eager,
    /// Rebuild before every read.
    #[default]
    Lazy,
}

impl FromStr for Freshness {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eager" => Ok(Self::Eager),
            "lazy" => Ok(Self::Lazy),
            other => Err(format!("unknown freshness policy '{}' (eager|lazy)", other)),
        }
    }
}

#[derive(Debug, Default, Clone)]
/// Immutable rule set for one repo.
pub struct RuleSet {
    rows: Vec<GovernanceRule>,
    index: HashMap<RuleKey, usize>,
}

impl RuleSet {
    /// Build from rules in parse order. A repeated `adr_id` replaces the
    /// earlier row; a repeated `(tool, rule_id)` resolves to the later row.
    pub fn from_rules(rules: impl IntoIterator<Item = GovernanceRule>) -> Self {
        let mut rows: Vec<GovernanceRule> = Vec::new();
        for rule in rules {
            rows.retain(|r| r.adr_id != rule.adr_id);
            rows.push(rule);
        }
        let index = rows
            .iter()
            .enumerate()
            .map(|(i, r)| (r.key(), i))
            .collect();
        Self { rows, index }
    }

    /// Rebuild a rule set from a manifest served by a remote store. Entries
    /// without both `tool` and `rule_id` govern nothing and are left out.
    pub fn from_document(doc: &ManifestDocument) -> Self {
        Self::from_rules(doc.rules.iter().filter_map(|e| {
            let (Some(tool), Some(rule_id)) = (e.tool.as_ref(), e.rule_id.as_ref()) else {
                debug!(repo = %doc.repo, adr_id = %e.id, "manifest entry without enforcement");
                return None;
            };
            Some(GovernanceRule {
                adr_id: e.id.clone(),
                title: String::new(),
                repo: doc.repo.clone(),
                tool: tool.clone(),
                rule_id: rule_id.clone(),
                severity: e.severity.clone(),
            })
        }))
    }

    /// Serialized form served by the manifest query.
    pub fn to_document(&self, repo: &str) -> ManifestDocument {
        ManifestDocument {
            repo: repo.to_string(),
            rules: self.rows.iter().map(ManifestEntry::from).collect(),
        }
    }

    pub fn lookup(&self, tool: &str, rule_id: &str) -> Option<&GovernanceRule> {
        self.index
            .get(&RuleKey::new(tool, rule_id))
            .map(|&i| &self.rows[i])
    }

    pub fn rules(&self) -> &[GovernanceRule] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedDocument {
    pub path: PathBuf,
    pub reason: String,
}

#[derive(Debug, Default)]
/// Outcome of one rebuild. Skips are informational, never fatal.
pub struct RebuildReport {
    pub loaded: usize,
    pub skipped: Vec<SkippedDocument>,
}

#[derive(Debug, Default)]
/// Keyed table of rule sets, one per repo.
pub struct ManifestStore {
    repos: RwLock<HashMap<String, Arc<RuleSet>>>,
}

impl ManifestStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the rows for `repo` with exactly the documents found under
    /// `source_root`. A missing directory yields an empty set.
    pub fn rebuild(&self, repo: &str, source_root: &Path) -> RebuildReport {
        let (set, report) = load_rule_set(repo, source_root);
        info!(
            repo,
            root = %source_root.display(),
            loaded = report.loaded,
            skipped = report.skipped.len(),
            "manifest rebuilt"
        );
        self.install(repo, set);
        report
    }

    /// Swap in a prepared rule set for `repo`.
    pub fn install(&self, repo: &str, set: RuleSet) {
        let set = Arc::new(set);
        let mut guard = self.repos.write().unwrap_or_else(|e| e.into_inner());
        guard.insert(repo.to_string(), set);
    }

    /// Current rule set for `repo`; empty when the repo was never built.
    pub fn snapshot(&self, repo: &str) -> Arc<RuleSet> {
        let guard = self.repos.read().unwrap_or_else(|e| e.into_inner());
        guard.get(repo).cloned().unwrap_or_default()
    }

    pub fn lookup(&self, repo: &str, tool: &str, rule_id: &str) -> Option<String> {
        self.snapshot(repo)
            .lookup(tool, rule_id)
            .map(|r| r.adr_id.clone())
    }

    pub fn list(&self, repo: &str) -> Vec<GovernanceRule> {
        self.snapshot(repo).rules().to_vec()
    }
}

/// Store view bound to one repo and ADR directory under a freshness policy.
pub struct LocalManifest {
    store: Arc<ManifestStore>,
    repo: String,
    source_root: PathBuf,
    freshness: Freshness,
}

impl LocalManifest {
    /// Open the view. Both policies build once here so the first read is warm.
    pub fn open(
        store: Arc<ManifestStore>,
        repo: &str,
        source_root: &Path,
        freshness: Freshness,
    ) -> Self {
        let view = Self {
            store,
            repo: repo.to_string(),
            source_root: source_root.to_path_buf(),
            freshness,
        };
        view.refresh();
        view
    }

    /// Rescan the ADR directory now, regardless of policy.
    pub fn refresh(&self) -> RebuildReport {
        self.store.rebuild(&self.repo, &self.source_root)
    }

    /// Rule set to serve a read, refreshed first under the lazy policy.
    pub fn current(&self) -> Arc<RuleSet> {
        if self.freshness == Freshness::Lazy {
            self.refresh();
        }
        self.store.snapshot(&self.repo)
    }

    pub fn lookup(&self, tool: &str, rule_id: &str) -> Option<String> {
        self.current().lookup(tool, rule_id).map(|r| r.adr_id.clone())
    }

    pub fn list(&self) -> Vec<GovernanceRule> {
        self.current().rules().to_vec()
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }
}

fn front_matter_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?ms)\A---[ \t\r]*\n(.*?)^---[ \t\r]*$").expect("front matter regex")
    })
}

/// Header block of a document, or `None` when it has no front matter.
pub fn split_front_matter(text: &str) -> Option<&str> {
    front_matter_re()
        .captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str())
}

/// Parse one ADR document into a rule. `Ok(None)` means the document is not
/// an enforceable ADR (no header, or no `enforcement` block).
pub fn parse_governance_document(
    repo: &str,
    text: &str,
) -> Result<Option<GovernanceRule>, String> {
    if !text.starts_with("---") {
        return Ok(None);
    }
    let header = split_front_matter(text).ok_or_else(|| "unterminated front matter".to_string())?;
    let fm: AdrFrontMatter = serde_yaml::from_str(header).map_err(|e| e.to_string())?;
    let Some(enf) = fm.enforcement else {
        return Ok(None);
    };
    Ok(Some(GovernanceRule {
        adr_id: fm.id,
        title: fm.title.unwrap_or_default(),
        repo: repo.to_string(),
        tool: enf.tool,
        rule_id: enf.rule_id,
        severity: enf.severity,
    }))
}

fn load_rule_set(repo: &str, source_root: &Path) -> (RuleSet, RebuildReport) {
    let mut report = RebuildReport::default();
    if !source_root.is_dir() {
        debug!(repo, root = %source_root.display(), "ADR directory absent; empty manifest");
        return (RuleSet::default(), report);
    }
    let pattern = format!(
        "{}/*.md",
        glob::Pattern::escape(&source_root.to_string_lossy())
    );
    let paths: Vec<PathBuf> = match glob(&pattern) {
        Ok(entries) => entries.filter_map(|e| e.ok()).collect(),
        Err(e) => {
            warn!(repo, pattern = %pattern, error = %e, "cannot scan ADR directory");
            return (RuleSet::default(), report);
        }
    };

    let mut rules = Vec::new();
    for path in paths {
        if !path.is_file() {
            continue;
        }
        let text = match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "skipping unreadable ADR");
                report.skipped.push(SkippedDocument {
                    path,
                    reason: e.to_string(),
                });
                continue;
            }
        };
        match parse_governance_document(repo, &text) {
            Ok(Some(rule)) => rules.push(rule),
            Ok(None) => debug!(path = %path.display(), "no enforceable header"),
            Err(reason) => {
                warn!(path = %path.display(), reason = %reason, "skipping malformed ADR header");
                report.skipped.push(SkippedDocument { path, reason });
            }
        }
    }
    let set = RuleSet::from_rules(rules);
    report.loaded = set.len();
    (set, report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn adr(id: &str, tool: &str, rule: &str, severity: &str) -> String {
        format!(
            "---\nid: {id}\ntitle: Title of {id}\nenforcement:\n  tool: {tool}\n  rule_id: {rule}\n  severity: {severity}\n---\n\n# {id}\n\nBody text.\n"
        )
    }

    #[test]
    fn test_rebuild_and_lookup() {
        let dir = tempdir().unwrap();
        fs::write(
            dir.path().join("001-no-eval.md"),
            adr("ADR-001", "eslint", "no-eval", "error"),
        )
        .unwrap();
        fs::write(
            dir.path().join("002-layers.md"),
            adr("ADR-002", "archunit", "ui_should_not_access_core", "warning"),
        )
        .unwrap();

        let store = ManifestStore::new();
        let report = store.rebuild("acme", dir.path());
        assert_eq!(report.loaded, 2);
        assert!(report.skipped.is_empty());
        assert_eq!(
            store.lookup("acme", "eslint", "no-eval").as_deref(),
            Some("ADR-001")
        );
        // case-sensitive, repo-scoped
        assert_eq!(store.lookup("acme", "ESLint", "no-eval"), None);
        assert_eq!(store.lookup("other", "eslint", "no-eval"), None);

        let listed = store.list("acme");
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].adr_id, "ADR-001");
        assert_eq!(listed[1].severity.as_deref(), Some("warning"));
        assert_eq!(listed[1].repo, "acme");
    }

    #[test]
    fn test_documents_without_header_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("readme.md"), "# Decisions\n\nNo header.\n").unwrap();
        fs::write(dir.path().join("notes.txt"), adr("ADR-9", "x", "y", "error")).unwrap();
        fs::write(
            dir.path().join("003.md"),
            "---\nid: ADR-003\ntitle: Informational only\n---\nbody\n",
        )
        .unwrap();

        let store = ManifestStore::new();
        let report = store.rebuild("acme", dir.path());
        assert_eq!(report.loaded, 0);
        assert!(report.skipped.is_empty());
        assert!(store.list("acme").is_empty());
    }

    #[test]
    fn test_malformed_header_is_skipped_not_fatal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.md"), "---\nid: [unclosed\n---\n").unwrap();
        fs::write(dir.path().join("b.md"), "---\nid: ADR-7\nno closing fence\n").unwrap();
        fs::write(dir.path().join("c.md"), adr("ADR-010", "eslint", "eqeqeq", "error")).unwrap();

        let store = ManifestStore::new();
        let report = store.rebuild("acme", dir.path());
        assert_eq!(report.loaded, 1);
        assert_eq!(report.skipped.len(), 2);
        assert_eq!(
            store.lookup("acme", "eslint", "eqeqeq").as_deref(),
            Some("ADR-010")
        );
    }

    #[test]
    fn test_missing_directory_yields_empty_set() {
        let dir = tempdir().unwrap();
        let store = ManifestStore::new();
        let report = store.rebuild("acme", &dir.path().join("docs/adr"));
        assert_eq!(report.loaded, 0);
        assert!(store.list("acme").is_empty());
        assert!(store.list("anything").is_empty());
    }

    #[test]
    fn test_rebuild_drops_stale_rows() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("001.md");
        fs::write(&file, adr("ADR-001", "eslint", "no-eval", "error")).unwrap();
        let store = ManifestStore::new();
        store.rebuild("acme", dir.path());
        assert_eq!(store.list("acme").len(), 1);

        fs::remove_file(&file).unwrap();
        store.rebuild("acme", dir.path());
        assert!(store.list("acme").is_empty());

        fs::write(&file, adr("ADR-001", "eslint", "no-eval", "error")).unwrap();
        store.rebuild("acme", dir.path());
        store.rebuild("acme", &dir.path().join("gone"));
        assert!(store.list("acme").is_empty());
    }

    #[test]
    fn test_later_document_wins_for_repeated_rule() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("001.md"), adr("ADR-001", "eslint", "no-eval", "error")).unwrap();
        fs::write(dir.path().join("002.md"), adr("ADR-002", "eslint", "no-eval", "warning")).unwrap();
        let store = ManifestStore::new();
        store.rebuild("acme", dir.path());
        assert_eq!(
            store.lookup("acme", "eslint", "no-eval").as_deref(),
            Some("ADR-002")
        );
    }

    #[test]
    fn test_repeated_adr_id_replaces_row() {
        let set = RuleSet::from_rules(vec![
            GovernanceRule {
                adr_id: "ADR-1".into(),
                title: "a".into(),
                repo: "r".into(),
                tool: "eslint".into(),
                rule_id: "old".into(),
                severity: None,
            },
            GovernanceRule {
                adr_id: "ADR-1".into(),
                title: "b".into(),
                repo: "r".into(),
                tool: "eslint".into(),
                rule_id: "new".into(),
                severity: None,
            },
        ]);
        assert_eq!(set.len(), 1);
        assert!(set.lookup("eslint", "old").is_none());
        assert_eq!(set.lookup("eslint", "new").unwrap().title, "b");
    }

    #[test]
    fn test_reader_keeps_snapshot_across_swap() {
        let store = ManifestStore::new();
        store.install(
            "acme",
            RuleSet::from_rules(vec![GovernanceRule {
                adr_id: "ADR-1".into(),
                title: String::new(),
                repo: "acme".into(),
                tool: "eslint".into(),
                rule_id: "no-eval".into(),
                severity: None,
            }]),
        );
        let held = store.snapshot("acme");
        store.install("acme", RuleSet::default());
        assert_eq!(held.len(), 1);
        assert!(store.snapshot("acme").is_empty());
    }

    #[test]
    fn test_lazy_view_sees_new_documents_eager_does_not() {
        let dir = tempdir().unwrap();
        let store = Arc::new(ManifestStore::new());
        let lazy = LocalManifest::open(store.clone(), "lazy", dir.path(), Freshness::Lazy);
        let eager = LocalManifest::open(store.clone(), "eager", dir.path(), Freshness::Eager);
        assert!(lazy.list().is_empty());
        assert!(eager.list().is_empty());

        fs::write(dir.path().join("001.md"), adr("ADR-001", "eslint", "no-eval", "error")).unwrap();
        assert_eq!(lazy.lookup("eslint", "no-eval").as_deref(), Some("ADR-001"));
        assert_eq!(eager.lookup("eslint", "no-eval"), None);

        eager.refresh();
        assert_eq!(eager.lookup("eslint", "no-eval").as_deref(), Some("ADR-001"));
    }

    #[test]
    fn test_document_round_trip_keeps_lookup() {
        let doc = ManifestDocument {
            repo: "acme".into(),
            rules: vec![ManifestEntry {
                id: "ADR-001".into(),
                tool: Some("eslint".into()),
                rule_id: Some("no-eval".into()),
                severity: Some("error".into()),
            }],
        };
        let set = RuleSet::from_document(&doc);
        assert_eq!(set.lookup("eslint", "no-eval").unwrap().adr_id, "ADR-001");
        assert_eq!(set.to_document("acme"), doc);
    }

    #[test]
    fn test_document_entries_without_enforcement_are_left_out() {
        let doc = ManifestDocument {
            repo: "acme".into(),
            rules: vec![
                ManifestEntry {
                    id: "ADR-001".into(),
                    tool: Some("eslint".into()),
                    rule_id: Some("no-eval".into()),
                    severity: None,
                },
                ManifestEntry {
                    id: "ADR-002".into(),
                    tool: None,
                    rule_id: None,
                    severity: None,
                },
                ManifestEntry {
                    id: "ADR-003".into(),
                    tool: Some("eslint".into()),
                    rule_id: None,
                    severity: None,
                },
            ],
        };
        let set = RuleSet::from_document(&doc);
        assert_eq!(set.len(), 1);
        assert_eq!(set.rules()[0].adr_id, "ADR-001");
    }

    #[test]
    fn test_freshness_from_str() {
        assert_eq!("Eager".parse::<Freshness>().unwrap(), Freshness::Eager);
        assert_eq!("lazy".parse::<Freshness>().unwrap(), Freshness::Lazy);
        assert!("sometimes".parse::<Freshness>().is_err());
    }

    #[test]
    fn test_split_front_matter_crlf() {
        let text = "---\r\nid: ADR-1\r\n---\r\nbody";
        let header = split_front_matter(text).unwrap();
        assert!(header.contains("id: ADR-1"));
    }
}
