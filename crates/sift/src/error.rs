//! Typed errors for the failures callers need to tell apart
//!
//! Everything else (I/O, HTTP, SQLite) travels as `anyhow::Error` with context.

use std::path::PathBuf;

/// A rules file could not be turned into rulesets
///
/// Always fatal: a pass never starts with a half-loaded configuration.
#[derive(Debug, thiserror::Error)]
pub enum RulesError {
    #[error("Failed to read rules file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid rules configuration: {0}")]
    Invalid(#[from] serde_json::Error),
}

/// A single action could not be carried out
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("move_to_label requires a label name")]
    MissingLabelName,

    #[error(transparent)]
    Executor(#[from] anyhow::Error),
}
