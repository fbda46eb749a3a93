//! One enforcement run: extract → resolve → aggregate → upload → annotate.
//!
//! Documents are extracted on a bounded rayon pool and folded back in
//! submission order, so the combined collection never depends on which
//! worker finished first. Upload happens before the annotation file is
//! written; a rejected upload ends the run with no file on disk.

use crate::aggregate::{self, Aggregator, UploadOutcome, Uploader};
use crate::annotate;
use crate::config::{anchor, Effective};
use crate::error::{Error, Result};
use crate::extract::Extractor;
use crate::manifest::{LocalManifest, ManifestStore, RuleSet};
use crate::models::{RawFinding, ResolvedViolation, UnmappedRule};
use crate::resolve::Resolver;
use crate::transport::HttpTransport;
use glob::glob;
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum AnnotationOutcome {
    NotRequested,
    Written { path: String, count: usize },
    Failed { path: String, error: String },
}

#[derive(Debug, Serialize)]
/// Everything a run produced, reported to the user in one piece.
pub struct RunReport {
    pub documents: Vec<String>,
    pub violations: Vec<ResolvedViolation>,
    pub unmapped: Vec<UnmappedRule>,
    pub unmapped_count: usize,
    pub upload: UploadOutcome,
    pub annotations: AnnotationOutcome,
}

impl RunReport {
    /// Exit code for a run that reached the end; only annotation writing can
    /// still fail at that point.
    pub fn exit_code(&self) -> i32 {
        match self.annotations {
            AnnotationOutcome::Failed { .. } => 4,
            _ => 0,
        }
    }
}

pub struct Pipeline<'a> {
    extractor: Extractor,
    jobs: Option<usize>,
    uploader: Option<&'a dyn Uploader>,
    annotations: Option<PathBuf>,
}

impl<'a> Pipeline<'a> {
    pub fn new(extractor: Extractor) -> Self {
        Self {
            extractor,
            jobs: None,
            uploader: None,
            annotations: None,
        }
    }

    pub fn jobs(mut self, jobs: Option<usize>) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn uploader(mut self, uploader: &'a dyn Uploader) -> Self {
        self.uploader = Some(uploader);
        self
    }

    pub fn annotations(mut self, path: Option<PathBuf>) -> Self {
        self.annotations = path;
        self
    }

    pub fn run(&self, documents: &[PathBuf], rules: &RuleSet) -> Result<RunReport> {
        let extracted = self.extract_documents(documents)?;

        let mut agg = Aggregator::new();
        for findings in &extracted {
            let mut resolver = Resolver::new(rules);
            let violations = resolver.resolve_all(findings);
            agg.push_document(violations, resolver.into_unmapped());
        }
        let combined = agg.finish();
        if combined.unmapped_count > 0 {
            info!(count = combined.unmapped_count, "findings without a governing ADR");
        }

        let upload = match self.uploader {
            Some(u) => aggregate::upload(&combined, u)?,
            None if combined.is_empty() => UploadOutcome::Skipped,
            None => UploadOutcome::Disabled,
        };

        let annotations = match self.annotations.as_deref() {
            None => AnnotationOutcome::NotRequested,
            Some(path) => {
                let items = annotate::annotate(&combined.violations);
                match annotate::write_annotations(path, &items) {
                    Ok(()) => AnnotationOutcome::Written {
                        path: path.to_string_lossy().to_string(),
                        count: items.len(),
                    },
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "annotation file not written");
                        AnnotationOutcome::Failed {
                            path: path.to_string_lossy().to_string(),
                            error: e.to_string(),
                        }
                    }
                }
            }
        };

        Ok(RunReport {
            documents: documents
                .iter()
                .map(|p| p.to_string_lossy().to_string())
                .collect(),
            violations: combined.violations,
            unmapped: combined.unmapped,
            unmapped_count: combined.unmapped_count,
            upload,
            annotations,
        })
    }

    /// Extract every document, results indexed like `documents`. The first
    /// failing document in submission order aborts the run.
    pub fn extract_documents(&self, documents: &[PathBuf]) -> Result<Vec<Vec<RawFinding>>> {
        let extractor = &self.extractor;
        let work = || -> Vec<Result<Vec<RawFinding>>> {
            documents
                .par_iter()
                .map(|p| extractor.extract_path(p))
                .collect()
        };
        let per_doc = match self.jobs {
            Some(n) => match rayon::ThreadPoolBuilder::new().num_threads(n).build() {
                Ok(pool) => pool.install(work),
                Err(e) => {
                    warn!(jobs = n, error = %e, "cannot size worker pool; using default");
                    work()
                }
            },
            None => work(),
        };
        per_doc.into_iter().collect()
    }
}

/// Expand input paths and glob patterns relative to `root`. Patterns expand
/// in sorted order and must match at least one file; plain paths are kept
/// as given so a missing file surfaces as `NotFound` during extraction.
pub fn expand_inputs(root: &Path, inputs: &[String]) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    for raw in inputs {
        if !is_pattern(raw) {
            out.push(anchor(root, raw));
            continue;
        }
        let pattern = anchor(root, raw).to_string_lossy().to_string();
        let entries = glob(&pattern).map_err(|e| Error::malformed(raw.clone(), e))?;
        let mut matched: Vec<PathBuf> = entries.filter_map(|e| e.ok()).filter(|p| p.is_file()).collect();
        if matched.is_empty() {
            return Err(Error::NoMatch {
                pattern: raw.clone(),
            });
        }
        matched.sort();
        out.append(&mut matched);
    }
    Ok(out)
}

fn is_pattern(s: &str) -> bool {
    s.contains(['*', '?', '['])
}

/// Governing rules for this run: fetched from the manifest service when a
/// URL is configured, otherwise built from the local ADR directory.
pub fn load_rules(eff: &Effective, store: Arc<ManifestStore>) -> Result<Arc<RuleSet>> {
    match eff.manifest_url.as_deref() {
        Some(url) => {
            let transport = HttpTransport::new(eff.timeout)?;
            let doc = transport.fetch_manifest(url, &eff.repo)?;
            info!(repo = %eff.repo, rules = doc.rules.len(), "manifest fetched");
            Ok(Arc::new(RuleSet::from_document(&doc)))
        }
        None => {
            let view = LocalManifest::open(store, &eff.repo, &eff.adr_dir, eff.freshness);
            Ok(view.current())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::Freshness;
    use crate::models::wire::UploadPayload;
    use crate::transport::testing::serve_once;
    use crate::transport::HttpUploader;
    use std::cell::RefCell;
    use std::fs;
    use std::time::Duration;
    use tempfile::tempdir;

    #[derive(Default)]
    struct Recording {
        calls: RefCell<Vec<UploadPayload>>,
    }

    impl Uploader for Recording {
        fn upload(&self, payload: &UploadPayload) -> Result<()> {
            self.calls.borrow_mut().push(payload.clone());
            Ok(())
        }
    }

    fn write_adr(dir: &Path, file: &str, id: &str, tool: &str, rule: &str, severity: &str) {
        fs::create_dir_all(dir).unwrap();
        fs::write(
            dir.join(file),
            format!("---\nid: {id}\ntitle: {id}\nenforcement:\n  tool: {tool}\n  rule_id: {rule}\n  severity: {severity}\n---\n# {id}\n"),
        )
        .unwrap();
    }

    fn sarif(tool: &str, results: &[(&str, &str, u64, &str)]) -> String {
        let items: Vec<_> = results
            .iter()
            .map(|(rule, file, line, msg)| {
                serde_json::json!({
                    "ruleId": rule,
                    "message": {"text": msg},
                    "locations": [{"physicalLocation": {
                        "artifactLocation": {"uri": file},
                        "region": {"startLine": line}
                    }}]
                })
            })
            .collect();
        serde_json::json!({"runs": [{"tool": {"driver": {"name": tool}}, "results": items}]}).to_string()
    }

    fn local_rules(adr_dir: &Path, repo: &str) -> Arc<RuleSet> {
        LocalManifest::open(Arc::new(ManifestStore::new()), repo, adr_dir, Freshness::Lazy).current()
    }

    #[test]
    fn test_scenario_a_mapped_finding_becomes_violation_and_annotation() {
        let dir = tempdir().unwrap();
        let adr_dir = dir.path().join("docs/adr");
        write_adr(&adr_dir, "001.md", "ADR-001", "eslint", "no-eval", "error");
        let input = dir.path().join("eslint.sarif");
        fs::write(&input, sarif("ESLint", &[("no-eval", "a.js", 10, "eval used")])).unwrap();
        let out = dir.path().join("annotations.json");

        let sink = Recording::default();
        let report = Pipeline::new(Extractor::new())
            .uploader(&sink)
            .annotations(Some(out.clone()))
            .run(&[input], &local_rules(&adr_dir, "acme"))
            .unwrap();

        assert_eq!(
            report.violations,
            vec![ResolvedViolation {
                adr_id: "ADR-001".into(),
                file: "a.js".into(),
                line: 10,
                message: "eval used".into(),
                severity: "error".into(),
            }]
        );
        assert_eq!(report.upload, UploadOutcome::Uploaded { count: 1 });
        assert_eq!(sink.calls.borrow().len(), 1);
        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
        assert_eq!(
            written,
            serde_json::json!([{
                "path": "a.js",
                "start_line": 10,
                "end_line": 10,
                "annotation_level": "failure",
                "message": "[ADR-001] eval used"
            }])
        );
        assert_eq!(report.exit_code(), 0);
    }

    #[test]
    fn test_scenario_b_unmapped_finding_skips_upload() {
        let dir = tempdir().unwrap();
        let adr_dir = dir.path().join("docs/adr");
        write_adr(&adr_dir, "001.md", "ADR-001", "eslint", "no-eval", "error");
        let input = dir.path().join("eslint.sarif");
        fs::write(&input, sarif("eslint", &[("semi", "a.js", 3, "missing semicolon")])).unwrap();

        let sink = Recording::default();
        let report = Pipeline::new(Extractor::new())
            .uploader(&sink)
            .run(&[input], &local_rules(&adr_dir, "acme"))
            .unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(report.unmapped_count, 1);
        assert_eq!(report.unmapped[0].rule_id.as_deref(), Some("semi"));
        assert_eq!(report.upload, UploadOutcome::Skipped);
        assert!(sink.calls.borrow().is_empty());
        assert_eq!(report.exit_code(), 0);
        let lines = crate::output::compose_run_lines(&report, false);
        assert_eq!(lines[0], "No violations found");
    }

    #[test]
    fn test_scenario_c_documents_combine_in_order() {
        let dir = tempdir().unwrap();
        let adr_dir = dir.path().join("docs/adr");
        write_adr(&adr_dir, "001.md", "ADR-001", "eslint", "no-eval", "error");
        write_adr(&adr_dir, "002.md", "ADR-002", "eslint", "eqeqeq", "warning");
        write_adr(&adr_dir, "003.md", "ADR-003", "archunit", "ui_should_not_access_core", "error");
        let first = dir.path().join("eslint.sarif");
        let second = dir.path().join("arch.sarif");
        fs::write(
            &first,
            sarif("eslint", &[("eqeqeq", "b.js", 2, "use ==="), ("no-eval", "a.js", 1, "eval")]),
        )
        .unwrap();
        fs::write(
            &second,
            sarif("archunit", &[("ui_should_not_access_core", "Ui.java", 1, "layer")]),
        )
        .unwrap();

        let report = Pipeline::new(Extractor::new())
            .jobs(Some(2))
            .run(&[first, second], &local_rules(&adr_dir, "acme"))
            .unwrap();
        let ids: Vec<_> = report.violations.iter().map(|v| v.adr_id.as_str()).collect();
        assert_eq!(ids, ["ADR-002", "ADR-001", "ADR-003"]);
        assert_eq!(report.upload, UploadOutcome::Disabled);
        assert_eq!(report.documents.len(), 2);
    }

    #[test]
    fn test_scenario_d_absent_governance_dir_is_empty_manifest() {
        let dir = tempdir().unwrap();
        let rules = local_rules(&dir.path().join("docs/adr"), "acme");
        assert!(rules.is_empty());
        let input = dir.path().join("eslint.sarif");
        fs::write(&input, sarif("eslint", &[("no-eval", "a.js", 1, "eval")])).unwrap();
        let report = Pipeline::new(Extractor::new()).run(&[input], &rules).unwrap();
        assert!(report.violations.is_empty());
        assert_eq!(report.unmapped_count, 1);
    }

    #[test]
    fn test_scenario_e_rejected_upload_writes_no_annotations() {
        let dir = tempdir().unwrap();
        let adr_dir = dir.path().join("docs/adr");
        write_adr(&adr_dir, "001.md", "ADR-001", "eslint", "no-eval", "error");
        let input = dir.path().join("eslint.sarif");
        fs::write(&input, sarif("eslint", &[("no-eval", "a.js", 10, "eval used")])).unwrap();
        let out = dir.path().join("annotations.json");

        let (base, server) = serve_once("500 Internal Server Error", "upstream exploded");
        let uploader = HttpUploader::new(
            HttpTransport::new(Duration::from_secs(5)).unwrap(),
            format!("{base}/api/upload"),
        );
        let err = Pipeline::new(Extractor::new())
            .uploader(&uploader)
            .annotations(Some(out.clone()))
            .run(&[input], &local_rules(&adr_dir, "acme"))
            .unwrap_err();
        server.join().unwrap();

        assert_ne!(err.exit_code(), 0);
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("upstream exploded"));
        assert!(!out.exists());
    }

    #[test]
    fn test_bad_document_aborts_run() {
        let dir = tempdir().unwrap();
        let good = dir.path().join("good.sarif");
        let bad = dir.path().join("bad.sarif");
        fs::write(&good, sarif("eslint", &[("no-eval", "a.js", 1, "eval")])).unwrap();
        fs::write(&bad, "{ definitely not sarif").unwrap();
        let err = Pipeline::new(Extractor::new())
            .run(&[good.clone(), bad], &RuleSet::default())
            .unwrap_err();
        assert!(matches!(err, Error::MalformedInput { .. }));

        let missing = dir.path().join("missing.sarif");
        let err = Pipeline::new(Extractor::new())
            .run(&[good, missing], &RuleSet::default())
            .unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }

    #[test]
    fn test_annotation_write_failure_is_reported_after_upload() {
        let dir = tempdir().unwrap();
        let adr_dir = dir.path().join("docs/adr");
        write_adr(&adr_dir, "001.md", "ADR-001", "eslint", "no-eval", "error");
        let input = dir.path().join("eslint.sarif");
        fs::write(&input, sarif("eslint", &[("no-eval", "a.js", 1, "eval")])).unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "").unwrap();

        let sink = Recording::default();
        let report = Pipeline::new(Extractor::new())
            .uploader(&sink)
            .annotations(Some(blocker.join("annotations.json")))
            .run(&[input], &local_rules(&adr_dir, "acme"))
            .unwrap();
        assert_eq!(report.upload, UploadOutcome::Uploaded { count: 1 });
        assert!(matches!(report.annotations, AnnotationOutcome::Failed { .. }));
        assert_eq!(report.exit_code(), 4);
    }

    #[test]
    fn test_expand_inputs_globs_sorted_and_literal_paths() {
        let dir = tempdir().unwrap();
        let reports = dir.path().join("reports");
        fs::create_dir_all(&reports).unwrap();
        fs::write(reports.join("b.sarif"), "{}").unwrap();
        fs::write(reports.join("a.sarif"), "{}").unwrap();

        let got = expand_inputs(
            dir.path(),
            &["reports/*.sarif".to_string(), "extra.sarif".to_string()],
        )
        .unwrap();
        assert_eq!(
            got,
            vec![
                reports.join("a.sarif"),
                reports.join("b.sarif"),
                dir.path().join("extra.sarif"),
            ]
        );

        let err = expand_inputs(dir.path(), &["nothing/*.sarif".to_string()]).unwrap_err();
        assert!(matches!(err, Error::NoMatch { .. }));
    }
}
