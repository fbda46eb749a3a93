//! Violation extractor: SARIF documents → `RawFinding`s.
//!
//! The first run of a document names the tool for every finding in it; the
//! findings of all runs are emitted in document order. Rule ids are taken as
//! the analyzer declared them (`ruleId`, `rule.id`, or the driver rule at
//! `ruleIndex`). Findings without a location point at `unknown`, line 1.

use crate::error::{Error, Result};
use crate::models::sarif::{Run, SarifLog, SarifResult};
use crate::models::{RawFinding, UNKNOWN_PATH};
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Clone)]
pub struct Extractor {
    /// Absolute artifact paths under this directory are made relative to it.
    base: Option<PathBuf>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_base(base: impl Into<PathBuf>) -> Self {
        Self {
            base: Some(base.into()),
        }
    }

    /// Read and extract one document from disk.
    pub fn extract_path(&self, path: &Path) -> Result<Vec<RawFinding>> {
        let resource = path.to_string_lossy();
        let bytes = fs::read(path).map_err(|source| Error::NotFound {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8(bytes).map_err(|e| Error::malformed(resource.to_string(), e))?;
        self.extract_str(&resource, &text)
    }

    /// Extract from document text; `resource` names it in errors.
    pub fn extract_str(&self, resource: &str, text: &str) -> Result<Vec<RawFinding>> {
        let log: SarifLog =
            serde_json::from_str(text).map_err(|e| Error::malformed(resource, e))?;
        self.extract_log(resource, &log)
    }

    pub fn extract_log(&self, resource: &str, log: &SarifLog) -> Result<Vec<RawFinding>> {
        let first = log
            .runs
            .first()
            .ok_or_else(|| Error::malformed(resource, "document declares no runs"))?;
        let tool = first.tool.driver.name.to_lowercase();
        let mut out = Vec::new();
        for run in &log.runs {
            for res in &run.results {
                out.push(self.finding(&tool, run, res));
            }
        }
        Ok(out)
    }

    fn finding(&self, tool: &str, run: &Run, res: &SarifResult) -> RawFinding {
        let physical = res
            .locations
            .first()
            .and_then(|l| l.physical_location.as_ref());
        let file_path = physical
            .and_then(|p| p.artifact_location.as_ref())
            .map(|a| a.uri.as_str())
            .filter(|u| !u.is_empty())
            .map(|u| self.normalize_uri(u))
            .unwrap_or_else(|| UNKNOWN_PATH.to_string());
        let line = physical
            .and_then(|p| p.region.as_ref())
            .and_then(|r| r.start_line)
            .unwrap_or(1);
        RawFinding {
            tool: tool.to_string(),
            rule_id: rule_id_of(run, res),
            file_path,
            line,
            message: res.message.text.clone(),
            level: res.level.clone(),
        }
    }

    fn normalize_uri(&self, uri: &str) -> String {
        let raw = uri.strip_prefix("file://").unwrap_or(uri);
        let path = Path::new(raw);
        if let Some(base) = self.base.as_deref() {
            if path.is_absolute() {
                if let Some(rel) = pathdiff::diff_paths(path, base) {
                    if !rel.starts_with("..") {
                        return rel.to_string_lossy().replace('\\', "/");
                    }
                }
            }
        }
        raw.to_string()
    }
}

fn rule_id_of(run: &Run, res: &SarifResult) -> Option<String> {
    res.rule_id
        .clone()
        .or_else(|| res.rule.as_ref().and_then(|r| r.id.clone()))
        .or_else(|| {
            res.rule_index
                .and_then(|i| usize::try_from(i).ok())
                .and_then(|i| run.tool.driver.rules.get(i))
                .map(|d| d.id.clone())
        })
}
