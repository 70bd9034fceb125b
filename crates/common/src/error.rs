//! Error types for cmdparity

use thiserror::Error;

use crate::settings::ValidationReport;

/// Result type alias using the cmdparity Error
pub type Result<T> = std::result::Result<T, Error>;

/// cmdparity error types
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Settings validation failed:\n{0}")]
    Validation(ValidationReport),

    #[error("Setting {0} did not resolve in settings")]
    SettingNotFound(String),

    #[error("Failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Command `{command}` exited with status {status}: {stderr}")]
    CommandFailed {
        command: String,
        status: i32,
        stderr: String,
    },

    #[error("Issue tracker error: {0}")]
    IssueTracker(String),
}
