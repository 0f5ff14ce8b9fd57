//! Error type definitions for the fitment importer
//!
//! Row-level defects (bad names, unparseable numbers, dangling references)
//! are never errors: the stages count and skip them. The types here cover
//! what actually aborts a run or rejects a request.

use thiserror::Error;

/// Errors raised by the import pipeline itself.
///
/// Database and I/O failures travel as their own error types via `anyhow`;
/// these variants cover the conditions the importer detects explicitly.
#[derive(Error, Debug)]
pub enum ImportError {
    /// A run was requested while another is still in a non-terminal state.
    #[error("An import is already running (stage: {stage})")]
    AlreadyRunning { stage: String },

    /// Schema reset was requested mid-run.
    #[error("Cannot reset tables while an import is running (stage: {stage})")]
    ResetConflict { stage: String },

    /// A stage's source file does not exist.
    #[error("Source file not found: {path}")]
    SourceMissing { path: String },

    /// A source file lacks a column the stage cannot work without.
    #[error("Source file {path} is missing required column '{column}'")]
    MissingColumn { path: String, column: String },

    /// The configured encoding label is not recognized by encoding_rs.
    #[error("Unsupported source encoding: {label}")]
    UnknownEncoding { label: String },
}

impl ImportError {
    pub fn already_running<S: Into<String>>(stage: S) -> Self {
        Self::AlreadyRunning {
            stage: stage.into(),
        }
    }

    pub fn reset_conflict<S: Into<String>>(stage: S) -> Self {
        Self::ResetConflict {
            stage: stage.into(),
        }
    }

    pub fn source_missing<P: Into<String>>(path: P) -> Self {
        Self::SourceMissing { path: path.into() }
    }

    pub fn missing_column<P: Into<String>, C: Into<String>>(path: P, column: C) -> Self {
        Self::MissingColumn {
            path: path.into(),
            column: column.into(),
        }
    }
}
