//! JSON encoding for dance envelopes

use crate::{DanceRequest, DanceResponse};
use serde::Serialize;
use thiserror::Error;

/// Encode error types
#[derive(Debug, Error)]
#[error("Cannot encode {what}: {source}")]
pub struct EncodeError {
    what: &'static str,
    #[source]
    source: serde_json::Error,
}

pub(crate) fn encode<T: Serialize>(what: &'static str, value: &T) -> Result<String, EncodeError> {
    serde_json::to_string(value).map_err(|source| EncodeError { what, source })
}

/// Encode a dance request
pub fn encode_request(request: &DanceRequest) -> Result<String, EncodeError> {
    encode("request", request)
}

/// Encode a dance response
pub fn encode_response(response: &DanceResponse) -> Result<String, EncodeError> {
    encode("response", response)
}
