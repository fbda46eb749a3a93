//! Error taxonomy shared by every pipeline stage.
//!
//! Component-local conditions (a single malformed governance document, an
//! unmapped rule) never surface here; they are absorbed and counted by the
//! component. Everything in this enum is fatal to the run that raised it.

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("file not found or unreadable: {} ({source})", path.display())]
    NotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no input matched pattern '{pattern}'")]
    NoMatch { pattern: String },

    #[error("malformed input {resource}: {reason}")]
    MalformedInput { resource: String, reason: String },

    #[error("remote rejected request to {url}: HTTP {status}: {body}")]
    Transport {
        url: String,
        status: u16,
        body: String,
    },

    #[error("request to {url} failed: {reason}")]
    Unreachable { url: String, reason: String },

    #[error("cannot write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid configuration {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },
}

impl Error {
    pub fn malformed(resource: impl Into<String>, reason: impl ToString) -> Self {
        Self::MalformedInput {
            resource: resource.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit code for the CLI boundary. Zero is reserved for success.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::NotFound { .. }
            | Self::NoMatch { .. }
            | Self::MalformedInput { .. }
            | Self::Config { .. } => 2,
            Self::Transport { .. } | Self::Unreachable { .. } => 3,
            Self::Write { .. } => 4,
        }
    }

    /// Stable machine-readable kind used in JSON output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } | Self::NoMatch { .. } => "not_found",
            Self::MalformedInput { .. } => "malformed_input",
            Self::Transport { .. } | Self::Unreachable { .. } => "transport",
            Self::Write { .. } => "write",
            Self::Config { .. } => "config",
        }
    }
}
