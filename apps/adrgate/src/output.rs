//! Output rendering for check and manifest commands.
//!
//! Supports `human` (default) and `json` outputs. The JSON form carries the
//! full run report: violations, unmapped rules, and both outcome statuses.

use crate::aggregate::UploadOutcome;
use crate::models::wire::ManifestDocument;
use crate::models::ResolvedViolation;
use crate::pipeline::{AnnotationOutcome, RunReport};
use crate::utils::use_colors;
use owo_colors::OwoColorize;
use serde_json::json;
use serde_json::Value as JsonVal;

fn print_json(value: &JsonVal) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{}", s),
        Err(e) => eprintln!("{} {}", crate::utils::error_prefix(), e),
    }
}

fn severity_tag(v: &ResolvedViolation, color: bool) -> String {
    match v.severity.as_str() {
        "error" | "" if color => "⟦error⟧".red().bold().to_string(),
        "error" | "" => "⟦error⟧".to_string(),
        _ if color => "⟦warn⟧".yellow().bold().to_string(),
        _ => "⟦warn⟧".to_string(),
    }
}

/// Print the outcome of a `check` run.
pub fn print_run(report: &RunReport, output: &str) {
    if output == "json" {
        print_json(&compose_run_json(report));
        return;
    }
    for line in compose_run_lines(report, use_colors(output)) {
        println!("{}", line);
    }
}

/// Compose the human-readable lines of a run (pure) for testing purposes.
pub fn compose_run_lines(report: &RunReport, color: bool) -> Vec<String> {
    let mut lines = Vec::new();
    for v in &report.violations {
        let icon = match (v.severity == "error" || v.severity.is_empty(), color) {
            (true, true) => "✖".red().to_string(),
            (true, false) => "✖".to_string(),
            (false, true) => "▲".yellow().to_string(),
            (false, false) => "▲".to_string(),
        };
        let file = if color {
            v.file.clone().bold().to_string()
        } else {
            v.file.clone()
        };
        lines.push(format!(
            "{} {} {}:{} ❲{}❳ {}",
            icon,
            severity_tag(v, color),
            file,
            v.line,
            v.adr_id,
            v.message
        ));
    }
    if report.violations.is_empty() && report.upload == UploadOutcome::Skipped {
        if color {
            lines.push("No violations found".green().bold().to_string());
        } else {
            lines.push("No violations found".to_string());
        }
    }
    for u in &report.unmapped {
        if color {
            lines.push(format!("{} {}", "unmapped:".bright_black(), u));
        } else {
            lines.push(format!("unmapped: {}", u));
        }
    }
    let upload = match report.upload {
        UploadOutcome::Skipped => "skipped".to_string(),
        UploadOutcome::Disabled => "disabled".to_string(),
        UploadOutcome::Uploaded { count } => format!("uploaded {}", count),
    };
    let annotations = match &report.annotations {
        AnnotationOutcome::NotRequested => "none".to_string(),
        AnnotationOutcome::Written { path, count } => format!("{} ({})", path, count),
        AnnotationOutcome::Failed { path, error } => format!("{} FAILED: {}", path, error),
    };
    let summary = format!(
        "Summary: violations={} unmapped={} documents={} upload={} annotations={}",
        report.violations.len(),
        report.unmapped_count,
        report.documents.len(),
        upload,
        annotations
    );
    if color {
        lines.push(summary.bold().to_string());
    } else {
        lines.push(summary);
    }
    lines
}

/// Print a repository manifest.
pub fn print_manifest(doc: &ManifestDocument, output: &str) {
    if output == "json" {
        print_json(&compose_manifest_json(doc));
        return;
    }
    let color = use_colors(output);
    for r in &doc.rules {
        let id = if color {
            r.id.clone().bold().to_string()
        } else {
            r.id.clone()
        };
        let tool = r.tool.as_deref().unwrap_or("-");
        let rule_id = r.rule_id.as_deref().unwrap_or("-");
        match &r.severity {
            Some(sev) => println!("{} {}/{} ({})", id, tool, rule_id, sev),
            None => println!("{} {}/{}", id, tool, rule_id),
        }
    }
    let summary = format!("Summary: repo={} rules={}", doc.repo, doc.rules.len());
    if color {
        println!("{}", summary.bold());
    } else {
        println!("{}", summary);
    }
}

/// Compose run JSON object (pure) for testing/snapshot purposes.
pub fn compose_run_json(report: &RunReport) -> JsonVal {
    let summary = json!({
        "violations": report.violations.len(),
        "unmapped": report.unmapped_count,
        "documents": report.documents.len(),
    });
    json!({
        "violations": report.violations,
        "unmapped": report.unmapped,
        "unmapped_count": report.unmapped_count,
        "documents": report.documents,
        "upload": report.upload,
        "annotations": report.annotations,
        "summary": summary,
    })
}

/// Compose manifest JSON object (pure); identical to the wire document.
pub fn compose_manifest_json(doc: &ManifestDocument) -> JsonVal {
    json!(doc)
}
