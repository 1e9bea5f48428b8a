//! Wire rendering of a failed dance
//!
//! ```json
//! {"code": "NotFound", "status": 404, "message": "Holon not found: 0A"}
//! ```

use super::encode::{encode, EncodeError};
use crate::{DanceResponse, ResponseStatusCode};
use serde::{Deserialize, Serialize};

/// Error payload of a failed response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireError {
    /// Status variant name, e.g. `"Conflict"`
    pub code: String,
    /// Numeric HTTP equivalent
    pub status: u16,
    /// Server-provided description
    pub message: String,
}

impl WireError {
    /// Build from a status and message
    pub fn new(status: ResponseStatusCode, message: impl Into<String>) -> Self {
        WireError {
            code: format!("{:?}", status),
            status: status.http_code(),
            message: message.into(),
        }
    }

    /// Error payload of `response`, or `None` if it succeeded
    pub fn from_response(response: &DanceResponse) -> Option<Self> {
        if response.status_code.is_success() {
            return None;
        }
        Some(WireError::new(
            response.status_code,
            response.description.as_str(),
        ))
    }
}

/// Encode a WireError to JSON
pub fn encode_wire_error(error: &WireError) -> Result<String, EncodeError> {
    encode("wire error", error)
}
