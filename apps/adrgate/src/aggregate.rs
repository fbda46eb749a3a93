//! Aggregation of resolved violations and the upload boundary.
//!
//! Documents are accumulated in submission order with no deduplication.
//! Upload hands the whole collection over in one call; an empty collection
//! skips the call entirely.

use crate::error::Result;
use crate::models::wire::UploadPayload;
use crate::models::{CombinedResult, ResolvedViolation, UnmappedRule};
use serde::Serialize;
use tracing::info;

/// Destination for a run's combined violations.
pub trait Uploader {
    fn upload(&self, payload: &UploadPayload) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Nothing to send; not an error.
    Skipped,
    /// No uploader configured for this run.
    Disabled,
    Uploaded { count: usize },
}

#[derive(Debug, Default)]
pub struct Aggregator {
    combined: CombinedResult,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one document's results after everything pushed before it.
    pub fn push_document(
        &mut self,
        violations: Vec<ResolvedViolation>,
        unmapped: Vec<UnmappedRule>,
    ) {
        self.combined.violations.extend(violations);
        self.combined.unmapped_count += unmapped.len();
        self.combined.unmapped.extend(unmapped);
    }

    pub fn finish(self) -> CombinedResult {
        self.combined
    }
}

/// Combine per-document results in the order given.
pub fn aggregate(
    documents: impl IntoIterator<Item = (Vec<ResolvedViolation>, Vec<UnmappedRule>)>,
) -> CombinedResult {
    let mut agg = Aggregator::new();
    for (violations, unmapped) in documents {
        agg.push_document(violations, unmapped);
    }
    agg.finish()
}

/// Upload the combined collection unless it is empty.
pub fn upload(combined: &CombinedResult, uploader: &dyn Uploader) -> Result<UploadOutcome> {
    if combined.is_empty() {
        info!("no violations; upload skipped");
        return Ok(UploadOutcome::Skipped);
    }
    let payload = UploadPayload::from_violations(&combined.violations);
    uploader.upload(&payload)?;
    info!(count = payload.violations.len(), "violations uploaded");
    Ok(UploadOutcome::Uploaded {
        count: payload.violations.len(),
    })
}
