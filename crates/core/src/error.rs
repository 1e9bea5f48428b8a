//! Error types for holon operations
//!
//! [`HolonError`] is raised by the state machine, the session pools and the
//! server side of a dance. [`ErrorKind`] groups the variants into the
//! taxonomy callers branch on.

use crate::holon::AccessType;
use crate::types::TxId;
use thiserror::Error;

/// Result type for holon operations
pub type Result<T> = std::result::Result<T, HolonError>;

/// Errors raised by holon operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HolonError {
    /// Referenced holon or id is unknown
    #[error("holon not found: {0}")]
    HolonNotFound(String),

    /// State-machine rule violated
    #[error("invalid transition: {0}")]
    InvalidTransition(String),

    /// Access check failed
    #[error("{access} access not allowed while {state}")]
    NotAccessible {
        /// Requested access
        access: AccessType,
        /// Summary of the holon state that refused it
        state: String,
    },

    /// Property or schema constraint violated
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Duplicate key or relationship member
    #[error("duplicate {0}: {1}")]
    DuplicateError(String, String),

    /// Holon cannot be abandoned or deleted in its current state
    #[error("deletion not allowed: {0}")]
    DeletionNotAllowed(String),

    /// Reference issued under a different transaction
    #[error("cross-transaction reference: expected {expected}, got {actual}")]
    CrossTransactionReference {
        /// Transaction of the current session
        expected: TxId,
        /// Transaction the reference was issued under
        actual: TxId,
    },

    /// Malformed request parameter
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    /// Required field missing or empty
    #[error("empty field: {0}")]
    EmptyField(String),

    /// Reference cannot be resolved to a holon
    #[error("invalid holon reference: {0}")]
    InvalidHolonReference(String),

    /// Payload does not match the wire contract
    #[error("invalid wire format: {0}")]
    InvalidWireFormat(String),

    /// Commit was only partially applied
    #[error("commit failure: {0}")]
    CommitFailure(String),

    /// Operation is not implemented by the server
    #[error("not implemented: {0}")]
    NotImplemented(String),

    /// Backend temporarily unavailable
    #[error("service not available: {0}")]
    ServiceNotAvailable(String),

    /// Opaque backend fault
    #[error("{0}")]
    Misc(String),
}

/// Coarse classification of a [`HolonError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Referenced holon or id unknown
    NotFound,
    /// State-machine rule violated
    InvalidTransition,
    /// Access check failed
    NotAccessible,
    /// Property or schema constraint violated
    ValidationError,
    /// Duplicate key, deletion not allowed, cross-transaction reference
    Conflict,
    /// Malformed request
    InvalidParameter,
    /// Opaque backend fault
    ServerError,
}

impl HolonError {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            HolonError::HolonNotFound(_) => ErrorKind::NotFound,
            HolonError::InvalidTransition(_) => ErrorKind::InvalidTransition,
            HolonError::NotAccessible { .. } => ErrorKind::NotAccessible,
            HolonError::ValidationError(_) => ErrorKind::ValidationError,
            HolonError::DuplicateError(..)
            | HolonError::DeletionNotAllowed(_)
            | HolonError::CrossTransactionReference { .. } => ErrorKind::Conflict,
            HolonError::InvalidParameter(_)
            | HolonError::EmptyField(_)
            | HolonError::InvalidHolonReference(_)
            | HolonError::InvalidWireFormat(_) => ErrorKind::InvalidParameter,
            HolonError::CommitFailure(_)
            | HolonError::NotImplemented(_)
            | HolonError::ServiceNotAvailable(_)
            | HolonError::Misc(_) => ErrorKind::ServerError,
        }
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Check if this is an invalid-transition error
    pub fn is_invalid_transition(&self) -> bool {
        self.kind() == ErrorKind::InvalidTransition
    }

    /// Check if this is a conflict-class error
    pub fn is_conflict(&self) -> bool {
        self.kind() == ErrorKind::Conflict
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_family() {
        assert!(HolonError::DuplicateError("key".into(), "book".into()).is_conflict());
        assert!(HolonError::DeletionNotAllowed("committed".into()).is_conflict());
        assert!(HolonError::CrossTransactionReference {
            expected: TxId(1),
            actual: TxId(2)
        }
        .is_conflict());
    }

    #[test]
    fn test_malformed_requests_classify_as_invalid_parameter() {
        assert_eq!(HolonError::EmptyField("name".into()).kind(), ErrorKind::InvalidParameter);
        assert_eq!(
            HolonError::InvalidWireFormat("body".into()).kind(),
            ErrorKind::InvalidParameter
        );
    }

    #[test]
    fn test_not_accessible_message() {
        let err = HolonError::NotAccessible {
            access: AccessType::Write,
            state: "Staged(Abandoned)".into(),
        };
        assert_eq!(err.to_string(), "Write access not allowed while Staged(Abandoned)");
    }
}
