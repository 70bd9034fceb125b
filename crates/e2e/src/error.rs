//! Error types for the suite

use thiserror::Error;

#[derive(Error, Debug)]
pub enum E2eError {
    #[error(transparent)]
    Common(#[from] cmdparity_common::Error),

    #[error("Reference tree {path} is malformed: {reason}")]
    ReferenceLoad { path: String, reason: String },

    #[error("Case not found: {0}")]
    CaseNotFound(String),

    #[error("Unexpected output from `{command}`: {reason}")]
    UnexpectedOutput { command: String, reason: String },

    /// Carries the complete failure message of a case
    #[error("{0}")]
    AssertionFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type E2eResult<T> = Result<T, E2eError>;
