//! JUnit XML → SARIF conversion for architecture test suites.
//!
//! Every `<testcase>` with at least one `<failure>` becomes one SARIF result
//! of tool `archunit`. The rule id is the test name without trailing
//! parentheses, so `ui_should_not_access_core()` maps to an ADR declaring
//! `rule_id: ui_should_not_access_core`.

use crate::error::{Error, Result};
use crate::models::sarif::{
    ArtifactLocation, Driver, Location, Message, PhysicalLocation, Run, SarifLog, SarifResult,
    Tool,
};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::fs;
use std::path::Path;
use tracing::info;

pub const TOOL_NAME: &str = "archunit";

#[derive(Default)]
struct Case {
    name: String,
    classname: Option<String>,
    failure: Option<Failure>,
}

#[derive(Default)]
struct Failure {
    message: Option<String>,
    text: String,
}

/// Convert JUnit XML text into a single-run SARIF log.
pub fn convert_str(resource: &str, xml: &str) -> Result<SarifLog> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut results = Vec::new();
    let mut current: Option<Case> = None;
    // Only the first failure of a case contributes text.
    let mut collecting = false;

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::malformed(
                resource,
                format!("at byte {}: {}", reader.buffer_position(), e),
            )
        })?;
        match event {
            Event::Start(e) => match e.name().as_ref() {
                b"testcase" => current = Some(start_case(resource, &e)?),
                b"failure" => collecting = open_failure(resource, &e, current.as_mut())?,
                _ => {}
            },
            Event::Empty(e) => match e.name().as_ref() {
                b"testcase" => current = None,
                b"failure" => {
                    open_failure(resource, &e, current.as_mut())?;
                }
                _ => {}
            },
            Event::Text(t) if collecting => {
                let text = t.unescape().map_err(|e| Error::malformed(resource, e))?;
                push_text(current.as_mut(), &text);
            }
            Event::CData(c) if collecting => {
                push_text(current.as_mut(), &String::from_utf8_lossy(&c));
            }
            Event::End(e) => match e.name().as_ref() {
                b"failure" => collecting = false,
                b"testcase" => {
                    if let Some(case) = current.take() {
                        if let Some(result) = to_result(case) {
                            results.push(result);
                        }
                    }
                }
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(SarifLog {
        version: Some("2.1.0".to_string()),
        runs: vec![Run {
            tool: Tool {
                driver: Driver {
                    name: TOOL_NAME.to_string(),
                    rules: Vec::new(),
                },
            },
            results,
        }],
    })
}

/// Convert `input` and write the SARIF document to `output`. Returns the
/// number of results written.
pub fn convert_file(input: &Path, output: &Path) -> Result<usize> {
    let xml = fs::read_to_string(input).map_err(|source| Error::NotFound {
        path: input.to_path_buf(),
        source,
    })?;
    let log = convert_str(&input.to_string_lossy(), &xml)?;
    let count = log.runs.iter().map(|r| r.results.len()).sum();
    let body = serde_json::to_string_pretty(&log).map_err(|e| Error::malformed("sarif", e))?;
    fs::write(output, body).map_err(|source| Error::Write {
        path: output.to_path_buf(),
        source,
    })?;
    info!(output = %output.display(), count, "wrote SARIF");
    Ok(count)
}

fn attr(resource: &str, e: &BytesStart<'_>, key: &[u8]) -> Result<Option<String>> {
    for a in e.attributes() {
        let a = a.map_err(|err| Error::malformed(resource, err))?;
        if a.key.as_ref() == key {
            let v = a
                .unescape_value()
                .map_err(|err| Error::malformed(resource, err))?;
            return Ok(Some(v.into_owned()));
        }
    }
    Ok(None)
}

fn start_case(resource: &str, e: &BytesStart<'_>) -> Result<Case> {
    Ok(Case {
        name: attr(resource, e, b"name")?.unwrap_or_default(),
        classname: attr(resource, e, b"classname")?,
        failure: None,
    })
}

/// Record a failure on the open case; true when its text should be kept.
fn open_failure(resource: &str, e: &BytesStart<'_>, case: Option<&mut Case>) -> Result<bool> {
    let Some(case) = case else {
        return Ok(false);
    };
    if case.failure.is_some() {
        return Ok(false);
    }
    case.failure = Some(Failure {
        message: attr(resource, e, b"message")?,
        text: String::new(),
    });
    Ok(true)
}

fn push_text(case: Option<&mut Case>, text: &str) {
    if let Some(f) = case.and_then(|c| c.failure.as_mut()) {
        f.text.push_str(text);
    }
}

fn to_result(case: Case) -> Option<SarifResult> {
    let failure = case.failure?;
    let message = failure
        .message
        .filter(|m| !m.is_empty())
        .unwrap_or(failure.text);
    let locations = case
        .classname
        .map(|cls| {
            vec![Location {
                physical_location: Some(PhysicalLocation {
                    artifact_location: Some(ArtifactLocation {
                        uri: format!("{}.java", cls.replace('.', "/")),
                    }),
                    region: None,
                }),
            }]
        })
        .unwrap_or_default();
    Some(SarifResult {
        rule_id: Some(
            case.name
                .trim_end_matches(|c: char| c == '(' || c == ')')
                .to_string(),
        ),
        message: Message {
            text: message.trim().to_string(),
        },
        locations,
        ..SarifResult::default()
    })
}
