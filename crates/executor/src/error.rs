//! Executor error type

use holons_core::HolonError;
use holons_wire::{DecodeError, EncodeError, ResponseStatusCode};
use thiserror::Error;

/// Result type for executor operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while executing a dance
#[derive(Debug, Error)]
pub enum Error {
    /// Local state-machine or pool violation; nothing was sent
    #[error(transparent)]
    Holon(#[from] HolonError),

    /// The server answered with a failure status
    #[error("{dance} rejected with {status}: {description}")]
    Rejected {
        /// Dance name
        dance: String,
        /// Status reported by the server
        status: ResponseStatusCode,
        /// Server description, verbatim
        description: String,
    },

    /// No response within the configured bound; the server-side effect is unknown
    #[error("{dance} timed out after {elapsed_ms}ms")]
    Timeout {
        /// Dance name
        dance: String,
        /// Configured bound
        elapsed_ms: u64,
    },

    /// The response arrived for a call that was cancelled or superseded
    #[error("response for dance #{seq} discarded: call was cancelled")]
    Cancelled {
        /// Sequence number of the discarded call
        seq: u64,
    },

    /// A successful response carried no session snapshot
    #[error("{dance} succeeded without a session snapshot")]
    MissingSnapshot {
        /// Dance name
        dance: String,
    },

    /// The transport could not deliver the request
    #[error("transport error: {reason}")]
    Transport {
        /// Transport-specific cause
        reason: String,
    },

    /// Response could not be decoded
    #[error("decode error: {0}")]
    Decode(#[from] DecodeError),

    /// Request could not be encoded
    #[error("encode error: {0}")]
    Encode(#[from] EncodeError),

    /// Internal error (bug or unexpected response shape)
    #[error("internal error: {reason}")]
    Internal {
        /// What went wrong
        reason: String,
    },
}

impl Error {
    /// Check if the call exceeded the configured timeout
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }

    /// Status code for server rejections
    pub fn status(&self) -> Option<ResponseStatusCode> {
        match self {
            Error::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_timeout_is_timeout() {
        let timeout = Error::Timeout {
            dance: "commit".into(),
            elapsed_ms: 25,
        };
        assert!(timeout.is_timeout());
        assert!(!Error::Cancelled { seq: 3 }.is_timeout());
        assert!(!Error::Transport {
            reason: "reset".into()
        }
        .is_timeout());
        assert_eq!(timeout.status(), None);
    }
}
