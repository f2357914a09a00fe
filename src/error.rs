// src/error.rs
use std::fmt;
use thiserror::Error;
use warp::reject::Reject;

pub type Result<T> = std::result::Result<T, TrackerError>;

#[derive(Debug, Error)]
pub enum TrackerError {
    /// Unknown symbol or holding id. Rendered as an informational empty state.
    #[error("{0} not found")]
    NotFound(String),

    /// Quote provider or holding store could not be reached.
    #[error("{context}: {message}")]
    Transport {
        context: &'static str,
        message: String,
    },

    #[error("{0}")]
    Validation(String),

    #[error("configuration error: {0}")]
    Config(String),
}

impl TrackerError {
    pub fn transport(context: &'static str, err: impl fmt::Display) -> Self {
        TrackerError::Transport {
            context,
            message: err.to_string(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        TrackerError::Validation(message.into())
    }

    pub fn kind(&self) -> &'static str {
        match self {
            TrackerError::NotFound(_) => "not_found",
            TrackerError::Transport { .. } => "transport_failure",
            TrackerError::Validation(_) => "validation_failure",
            TrackerError::Config(_) => "config",
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TrackerError::Transport { .. })
    }
}

impl Reject for TrackerError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_transport_failures_are_retryable() {
        assert!(TrackerError::transport("quote provider", "connection refused").is_retryable());
        assert!(!TrackerError::NotFound("holding 42".into()).is_retryable());
        assert!(!TrackerError::validation("shares must be a number").is_retryable());
    }

    #[test]
    fn transport_message_includes_context() {
        let err = TrackerError::transport("holding store", "timed out");
        assert_eq!(err.to_string(), "holding store: timed out");
        assert_eq!(err.kind(), "transport_failure");
    }
}
