//! Error types for the market report pipeline.

use thiserror::Error;

use crate::stage::StageKind;

/// Errors that can end a pipeline run.
#[derive(Error, Debug)]
pub enum Error {
    /// The remote call failed: network, auth, rate limit, API error or refusal
    #[error("Transport error: {0}")]
    Transport(String),

    /// The service reply could not be coerced into the stage's schema
    #[error("{stage} response does not match schema: {}", .errors.join("; "))]
    SchemaMismatch {
        stage: StageKind,
        errors: Vec<String>,
    },

    /// A stage was invoked with a blank prompt
    #[error("Empty prompt for {0} stage")]
    EmptyPrompt(StageKind),

    /// A record's JSON Schema could not be generated or compiled
    #[error("Schema generation error: {0}")]
    Schema(String),

    /// Writing progress to the caller's output failed
    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),

    /// Process configuration is missing or malformed
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<ureq::Error> for Error {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::StatusCode(code) => Error::Transport(format!("HTTP error {}", code)),
            other => Error::Transport(other.to_string()),
        }
    }
}

impl Error {
    /// Shorthand for a schema mismatch with a single message.
    pub(crate) fn mismatch(stage: StageKind, message: impl Into<String>) -> Self {
        Error::SchemaMismatch {
            stage,
            errors: vec![message.into()],
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, Error>;
