//! Error types for the collaborator seams.
//!
//! None of these are fatal: the background loops log them and carry on.

use std::time::Duration;
use thiserror::Error;

/// Failure to hand an observation or flag to the clinical data store.
#[derive(Debug, Error)]
pub enum EmitError {
    #[error("request to clinical data store failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("clinical data store rejected {resource}: HTTP {status}")]
    Rejected { resource: &'static str, status: u16 },

    #[error("emitter unavailable: {0}")]
    Unavailable(String),
}

/// Failure to read the persisted groups.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read group store {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("group store {path} is malformed: {source}")]
    Malformed {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Failure of the external insight analyzer.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("failed to launch analyzer `{command}`: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("analyzer exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },

    #[error("analyzer produced malformed output: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("analyzer did not answer within {0:?}")]
    Timeout(Duration),
}

/// Invalid settings detected at startup.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Load(#[from] config::ConfigError),

    #[error("invalid {section} settings: {reason}")]
    Invalid { section: &'static str, reason: String },
}

/// Any failure surfaced by the core, used where several seams meet.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Emit(#[from] EmitError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Analyzer(#[from] AnalyzerError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
