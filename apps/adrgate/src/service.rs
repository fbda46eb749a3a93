//! Serving-boundary handlers for the governance service.
//!
//! These are the operations an HTTP layer would mount (`GET /manifest/{repo}`,
//! `POST /api/upload`, `GET /api/violations/{repo}`); the framework itself is
//! not part of this crate. State is owned by the caller and injected: the
//! manifest store and the `ViolationLog` live for as long as the process that
//! created them, and the log only empties through `clear`.

use crate::aggregate::Uploader;
use crate::error::Result;
use crate::manifest::{Freshness, ManifestStore, RebuildReport};
use crate::models::wire::{Ack, ManifestDocument, UploadPayload, ViolationsDocument, WireViolation};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tracing::info;

#[derive(Debug, Default)]
/// Ordered, process-lifetime record of uploaded violations.
pub struct ViolationLog {
    entries: Mutex<Vec<WireViolation>>,
}

impl ViolationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, items: impl IntoIterator<Item = WireViolation>) -> usize {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = guard.len();
        guard.extend(items);
        guard.len() - before
    }

    pub fn snapshot(&self) -> Vec<WireViolation> {
        self.entries
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Administrative reset. Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let n = guard.len();
        guard.clear();
        n
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct GovernanceService {
    store: Arc<ManifestStore>,
    log: Arc<ViolationLog>,
    adr_dir: PathBuf,
    freshness: Freshness,
}

impl GovernanceService {
    pub fn new(
        store: Arc<ManifestStore>,
        log: Arc<ViolationLog>,
        adr_dir: &Path,
        freshness: Freshness,
    ) -> Self {
        Self {
            store,
            log,
            adr_dir: adr_dir.to_path_buf(),
            freshness,
        }
    }

    /// Build the manifest for `repo` at process start.
    pub fn startup(&self, repo: &str) -> RebuildReport {
        self.refresh(repo)
    }

    /// Rescan the ADR directory for `repo`, independent of any read.
    pub fn refresh(&self, repo: &str) -> RebuildReport {
        self.store.rebuild(repo, &self.adr_dir)
    }

    /// Manifest query. Under the lazy policy the rules are rebuilt first.
    pub fn manifest(&self, repo: &str) -> ManifestDocument {
        if self.freshness == Freshness::Lazy {
            self.refresh(repo);
        }
        self.store.snapshot(repo).to_document(repo)
    }

    pub fn accept_upload(&self, payload: &UploadPayload) -> Ack {
        for v in &payload.violations {
            info!(adr_id = %v.adr_id, file = %v.file, line = v.line, message = %v.message, "violation received");
        }
        self.log.append(payload.violations.iter().cloned());
        Ack {
            status: "ok".to_string(),
        }
    }

    /// Every stored violation. The log is not partitioned by repo, so the
    /// repo argument does not filter.
    pub fn violations(&self, _repo: &str) -> ViolationsDocument {
        ViolationsDocument {
            violations: self.log.snapshot(),
        }
    }

    pub fn log(&self) -> &Arc<ViolationLog> {
        &self.log
    }
}

/// The service doubles as an in-process upload sink.
impl Uploader for GovernanceService {
    fn upload(&self, payload: &UploadPayload) -> Result<()> {
        self.accept_upload(payload);
        Ok(())
    }
}
