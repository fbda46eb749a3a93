//! Review annotations derived from resolved violations.

use crate::error::{Error, Result};
use crate::models::{Annotation, AnnotationLevel, ResolvedViolation, DEFAULT_SEVERITY};
use std::fs;
use std::path::Path;

/// One annotation per violation, in input order.
pub fn annotate(violations: &[ResolvedViolation]) -> Vec<Annotation> {
    violations.iter().map(annotation_for).collect()
}

pub fn annotation_for(v: &ResolvedViolation) -> Annotation {
    let line = v.line.max(1);
    Annotation {
        path: v.file.clone(),
        start_line: line,
        end_line: line,
        level: level_for(&v.severity),
        message: format!("[{}] {}", v.adr_id, v.message),
    }
}

fn level_for(severity: &str) -> AnnotationLevel {
    if severity.is_empty() || severity == DEFAULT_SEVERITY {
        AnnotationLevel::Failure
    } else {
        AnnotationLevel::Warning
    }
}

/// Serialize annotations as a JSON array.
pub fn render(annotations: &[Annotation]) -> String {
    // Plain structs with string/integer fields always serialize.
    serde_json::to_string_pretty(annotations).unwrap_or_else(|_| "[]".to_string())
}

/// Write the annotation file, creating parent directories as needed.
pub fn write_annotations(path: &Path, annotations: &[Annotation]) -> Result<()> {
    let write_err = |source| Error::Write {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(write_err)?;
    }
    let mut body = render(annotations);
    body.push('\n');
    fs::write(path, body).map_err(write_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn v(adr: &str, line: u64, severity: &str) -> ResolvedViolation {
        ResolvedViolation {
            adr_id: adr.into(),
            file: "a.js".into(),
            line,
            message: "eval used".into(),
            severity: severity.into(),
        }
    }

    #[test]
    fn test_error_maps_to_failure_with_adr_prefix() {
        let out = annotate(&[v("ADR-001", 10, "error")]);
        let json = serde_json::to_value(&out).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{
                "path": "a.js",
                "start_line": 10,
                "end_line": 10,
                "annotation_level": "failure",
                "message": "[ADR-001] eval used"
            }])
        );
    }

    #[test]
    fn test_other_severities_are_warnings_and_line_zero_is_one() {
        let out = annotate(&[v("A", 0, "warning"), v("B", 3, "note"), v("C", 4, "")]);
        assert_eq!(out[0].level, AnnotationLevel::Warning);
        assert_eq!((out[0].start_line, out[0].end_line), (1, 1));
        assert_eq!(out[1].level, AnnotationLevel::Warning);
        assert_eq!(out[2].level, AnnotationLevel::Failure);
    }

    #[test]
    fn test_deterministic_and_order_preserving() {
        let input = vec![v("B", 2, "error"), v("A", 1, "warning"), v("B", 2, "error")];
        let first = render(&annotate(&input));
        let second = render(&annotate(&input));
        assert_eq!(first, second);
        let out = annotate(&input);
        assert_eq!(out.len(), 3);
        assert!(out[0].message.starts_with("[B]"));
        assert!(out[1].message.starts_with("[A]"));
    }

    #[test]
    fn test_write_annotations_creates_parents() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out/annotations.json");
        write_annotations(&path, &annotate(&[v("ADR-001", 10, "error")])).unwrap();
        let back: Vec<Annotation> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back[0].message, "[ADR-001] eval used");
    }

    #[test]
    fn test_write_failure_is_reported() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "x").unwrap();
        let err = write_annotations(&blocker.join("annotations.json"), &[]).unwrap_err();
        assert!(matches!(err, Error::Write { .. }));
    }
}
