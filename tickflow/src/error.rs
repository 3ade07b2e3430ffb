//! Error types for tickflow.
//!
//! Construction and setup can fail loudly; hot-path operations never
//! return these. Capacity exhaustion is a `false`/`None` from the
//! corresponding `try_*` call, counted by the caller.

use thiserror::Error;

pub type Result<T> = std::result::Result<T, FeedError>;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    #[error("Memory allocation error: {message}")]
    Memory { message: String },

    #[error("System resource error: {message}")]
    SystemResource { message: String },

    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

impl FeedError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::InvalidConfig { message: message.into() }
    }

    pub fn memory(message: impl Into<String>) -> Self {
        Self::Memory { message: message.into() }
    }

    pub fn system_resource(message: impl Into<String>) -> Self {
        Self::SystemResource { message: message.into() }
    }

    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected { message: message.into() }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = FeedError::config("ring capacity must be power of 2");
        assert!(matches!(err, FeedError::InvalidConfig { .. }));

        let err = FeedError::memory("pool allocation failed");
        assert!(matches!(err, FeedError::Memory { .. }));
    }

    #[test]
    fn test_error_display() {
        let err = FeedError::system_resource("sched_setaffinity failed");
        assert_eq!(
            err.to_string(),
            "System resource error: sched_setaffinity failed"
        );
    }
}
