//! Unified error handling for herald
//!
//! The dispatcher only ever originates `InvalidRequest`, `NoHandlerRegistered`
//! and `PipelineBuild`. Everything a handler or behavior returns travels back
//! to the caller untouched.

use std::fmt;

use super::request::RequestKind;

/// Errors produced while dispatching a request
#[derive(Debug, thiserror::Error)]
pub enum MediatorError {
    /// The request failed its own validation before any resolution happened
    #[error("Invalid request '{request}': {reason}")]
    InvalidRequest { request: String, reason: String },

    /// The resolver has no handler for the request type
    #[error("No handler registered for {kind} '{request}'. Register a {contract} implementation.")]
    NoHandlerRegistered {
        kind: RequestKind,
        request: String,
        contract: String,
    },

    /// The pipeline for the request type could not be materialised
    #[error("Unable to build pipeline for '{request}': {reason}")]
    PipelineBuild { request: String, reason: String },

    /// The caller's cancellation token fired
    #[error("Operation was cancelled")]
    Cancelled,

    /// Raised by the timeout behavior
    #[error("Request '{request}' timed out after {after_ms}ms")]
    TimedOut { request: String, after_ms: u64 },

    /// Configuration could not be loaded or validated
    #[error("Configuration error: {0}")]
    Config(String),

    /// Opaque failure raised by a handler or behavior
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl MediatorError {
    /// Build a handler error from a plain message.
    pub fn handler(msg: impl fmt::Display + fmt::Debug + Send + Sync + 'static) -> Self {
        MediatorError::Handler(anyhow::Error::msg(msg))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, MediatorError::Cancelled)
    }

    /// Returns the inner error if this was raised by a handler or behavior.
    pub fn as_handler_error(&self) -> Option<&anyhow::Error> {
        match self {
            MediatorError::Handler(err) => Some(err),
            _ => None,
        }
    }
}

/// Result type alias for dispatch operations
pub type MediatorResult<T> = std::result::Result<T, MediatorError>;

/// Helper trait for adding context to errors raised inside handlers
pub trait ErrorContext<T> {
    fn with_context(self, context: &str) -> MediatorResult<T>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn with_context(self, context: &str) -> MediatorResult<T> {
        self.map_err(|e| MediatorError::handler(format!("{context}: {e}")))
    }
}

/// Convenience macro for failing a handler with a formatted message
#[macro_export]
macro_rules! handler_error {
    ($msg:expr) => {
        $crate::core::MediatorError::handler($msg.to_string())
    };
    ($fmt:expr, $($arg:tt)*) => {
        $crate::core::MediatorError::handler(format!($fmt, $($arg)*))
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_error_is_transparent() {
        let err = MediatorError::handler("Pipeline error");
        assert_eq!(err.to_string(), "Pipeline error");
        assert!(err.as_handler_error().is_some());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_no_handler_message() {
        let err = MediatorError::NoHandlerRegistered {
            kind: RequestKind::Query,
            request: "GetOrder".to_string(),
            contract: "QueryHandler<GetOrder, OrderDto>".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "No handler registered for query 'GetOrder'. Register a QueryHandler<GetOrder, OrderDto> implementation."
        );
    }

    #[test]
    fn test_with_context() {
        let result: Result<(), std::io::Error> = Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "file not found",
        ));
        let err = result.with_context("loading order").unwrap_err();
        assert_eq!(err.to_string(), "loading order: file not found");

        let err = handler_error!("order {} missing", 42);
        assert_eq!(err.to_string(), "order 42 missing");
    }
}
