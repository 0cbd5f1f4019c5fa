//! Error taxonomy for the fire session engine.

use firesim_env::{EnvError, SessionId};
use thiserror::Error;

/// Errors surfaced by the grid model, the registry and the session loop.
///
/// Cancellation is not represented here: it is a normal terminal outcome.
#[derive(Debug, Error)]
pub enum FireError {
    /// Malformed or missing creation fields, inconsistent grid/index sizes.
    /// Rejected synchronously, nothing is created.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Unknown session id on read/cancel/stream.
    #[error("Session not found: {0}")]
    NotFound(SessionId),

    /// A stream was already opened for this session.
    #[error("Session already streaming: {0}")]
    AlreadyStreaming(SessionId),

    /// Unexpected fault inside the generation loop.
    #[error("Streaming failure: {0}")]
    StreamingFailure(String),
}

impl FireError {
    /// Creates an invalid-input error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Creates an invalid-input error for a required field that was absent.
    pub fn missing(field: &str) -> Self {
        Self::InvalidInput(format!("missing required field `{}`", field))
    }

    /// Creates a streaming failure.
    pub fn streaming(msg: impl Into<String>) -> Self {
        Self::StreamingFailure(msg.into())
    }
}

impl From<EnvError> for FireError {
    fn from(err: EnvError) -> Self {
        Self::StreamingFailure(err.to_string())
    }
}

impl From<serde_json::Error> for FireError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidInput(err.to_string())
    }
}
