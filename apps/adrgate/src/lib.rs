//! adrgate core library.
//!
//! Maps static-analysis findings onto Architectural Decision Records: ADR
//! front matter declares which `(tool, rule_id)` an ADR governs, SARIF
//! findings are resolved against that manifest, and the governed ones are
//! uploaded and turned into CI annotations.
//!
//! High-level modules:
//! - `manifest`: ADR scanning and the per-repo rule store.
//! - `extract`: SARIF → raw findings.
//! - `resolve`: findings → violations via manifest lookup.
//! - `aggregate`: combining documents and the upload boundary.
//! - `annotate`: annotation records and the annotation file.
//! - `pipeline`: one end-to-end run.
//! - `service`: handlers an HTTP governance service would mount.
//! - `transport`: HTTP manifest client and uploader.
//! - `junit`: JUnit XML → SARIF conversion.
//! - `cli`, `config`, `output`, `utils`: the binary's surface.
pub mod aggregate;
pub mod annotate;
pub mod cli;
pub mod config;
pub mod error;
pub mod extract;
pub mod junit;
pub mod manifest;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod resolve;
pub mod service;
pub mod transport;
pub mod utils;
