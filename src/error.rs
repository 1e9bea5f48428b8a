//! Unified error types for the holons client.
//!
//! This module provides a clean error type that wraps internal errors
//! and presents a consistent interface to users.

use holons_core::{ErrorKind, HolonError};
use holons_wire::ResponseStatusCode;
use thiserror::Error;

/// All client errors.
///
/// This is the canonical error type for all client operations. Local
/// state-machine violations and server rejections of the same kind map to
/// the same variant.
#[derive(Debug, Error)]
pub enum Error {
    /// Holon, key or id not found
    #[error("not found: {0}")]
    NotFound(String),

    /// Lifecycle transition not permitted from the current state
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Access type not permitted in the holon's current state
    #[error("not accessible: {0}")]
    NotAccessible(String),

    /// Holon content failed validation
    #[error("validation failed: {0}")]
    Validation(String),

    /// Duplicate key, cross-transaction reference, or refused deletion
    #[error("conflict: {0}")]
    Conflict(String),

    /// Malformed or empty input
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Server failure not covered by a more specific variant
    #[error("server error ({status}): {description}")]
    Server {
        /// Status reported by the server
        status: ResponseStatusCode,
        /// Server description, verbatim
        description: String,
    },

    /// No response within the configured bound
    #[error("{dance} timed out after {elapsed_ms}ms")]
    Timeout {
        /// Dance name
        dance: String,
        /// Configured bound
        elapsed_ms: u64,
    },

    /// Response discarded because the call was cancelled
    #[error("dance #{seq} cancelled")]
    Cancelled {
        /// Sequence number of the discarded call
        seq: u64,
    },

    /// Delivery failed
    #[error("transport error: {0}")]
    Transport(String),

    /// Envelope could not be encoded or decoded
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Invalid configuration
    #[error("config error: {0}")]
    Config(String),

    /// Internal error (bug or unexpected response shape)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Timeouts and transport failures may succeed on retry; so may a server
    /// that reported itself unavailable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Timeout { .. } | Error::Transport(_) => true,
            Error::Server { status, .. } => *status == ResponseStatusCode::ServiceUnavailable,
            _ => false,
        }
    }

    /// Check if this is a timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }

    /// Check if the server-side effect of the call is unknown.
    ///
    /// True for timeouts and cancellations: the request may have been
    /// applied remotely even though the local pools were left untouched.
    pub fn outcome_unknown(&self) -> bool {
        matches!(self, Error::Timeout { .. } | Error::Cancelled { .. })
    }
}

// Convert from holon state-machine errors
impl From<HolonError> for Error {
    fn from(e: HolonError) -> Self {
        let message = e.to_string();
        match e.kind() {
            ErrorKind::NotFound => Error::NotFound(message),
            ErrorKind::InvalidTransition => Error::InvalidTransition(message),
            ErrorKind::NotAccessible => Error::NotAccessible(message),
            ErrorKind::ValidationError => Error::Validation(message),
            ErrorKind::Conflict => Error::Conflict(message),
            ErrorKind::InvalidParameter => Error::InvalidParameter(message),
            ErrorKind::ServerError => Error::Server {
                status: ResponseStatusCode::from(&e),
                description: message,
            },
        }
    }
}

// Convert from dance execution errors
impl From<holons_executor::Error> for Error {
    fn from(e: holons_executor::Error) -> Self {
        use holons_executor::Error as ExecError;
        match e {
            ExecError::Holon(holon) => Error::from(holon),
            ExecError::Rejected {
                status,
                description,
                ..
            } => match status {
                ResponseStatusCode::NotFound => Error::NotFound(description),
                ResponseStatusCode::Conflict => Error::Conflict(description),
                ResponseStatusCode::BadRequest => Error::InvalidParameter(description),
                ResponseStatusCode::UnprocessableEntity => Error::Validation(description),
                status => Error::Server {
                    status,
                    description,
                },
            },
            ExecError::Timeout { dance, elapsed_ms } => Error::Timeout { dance, elapsed_ms },
            ExecError::Cancelled { seq } => Error::Cancelled { seq },
            ExecError::MissingSnapshot { dance } => {
                Error::Internal(format!("{} succeeded without a session snapshot", dance))
            }
            ExecError::Transport { reason } => Error::Transport(reason),
            ExecError::Decode(e) => Error::Serialization(e.to_string()),
            ExecError::Encode(e) => Error::Serialization(e.to_string()),
            ExecError::Internal { reason } => Error::Internal(reason),
        }
    }
}
