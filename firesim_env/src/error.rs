//! Error types for the environment abstraction.

use thiserror::Error;

/// Errors that can occur in the environment abstraction layer.
#[derive(Debug, Error)]
pub enum EnvError {
    /// The receiving side of a sink went away
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Context operation failed
    #[error("Context error: {0}")]
    ContextError(String),
}

impl EnvError {
    /// Creates a channel-closed error.
    pub fn closed(msg: impl Into<String>) -> Self {
        Self::ChannelClosed(msg.into())
    }

    /// Returns true if the error means the consumer disconnected.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, Self::ChannelClosed(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_classification() {
        assert!(EnvError::closed("receiver dropped").is_disconnect());
        assert!(!EnvError::ContextError("boom".into()).is_disconnect());
        assert_eq!(
            EnvError::closed("receiver dropped").to_string(),
            "Channel closed: receiver dropped"
        );
    }
}
