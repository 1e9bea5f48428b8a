//! JSON decoding for dance envelopes
//!
//! Decoding is strict: unknown enum variants, missing fields and trailing
//! input are all errors. Pool invariants are not checked here; the
//! reconciler does that before a snapshot is applied.

use crate::{DanceRequest, DanceResponse};
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Decode error types
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DecodeError {
    /// Invalid JSON syntax
    #[error("Invalid JSON at {line}:{column}: {message}")]
    InvalidJson {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// Parser message
        message: String,
    },

    /// Well-formed JSON that does not match the envelope
    #[error("Invalid envelope at {line}:{column}: {message}")]
    InvalidEnvelope {
        /// 1-based line
        line: usize,
        /// 1-based column
        column: usize,
        /// Shape mismatch
        message: String,
    },

    /// Unexpected end of input
    #[error("Unexpected end of input")]
    UnexpectedEnd,
}

impl From<serde_json::Error> for DecodeError {
    fn from(e: serde_json::Error) -> Self {
        use serde_json::error::Category;
        match e.classify() {
            Category::Eof => DecodeError::UnexpectedEnd,
            Category::Data => DecodeError::InvalidEnvelope {
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            },
            Category::Syntax | Category::Io => DecodeError::InvalidJson {
                line: e.line(),
                column: e.column(),
                message: e.to_string(),
            },
        }
    }
}

fn decode<T: DeserializeOwned>(json: &str) -> Result<T, DecodeError> {
    let trimmed = json.trim();
    if trimmed.is_empty() {
        return Err(DecodeError::UnexpectedEnd);
    }
    Ok(serde_json::from_str(trimmed)?)
}

/// Decode a dance request
pub fn decode_request(json: &str) -> Result<DanceRequest, DecodeError> {
    decode(json)
}

/// Decode a dance response
pub fn decode_response(json: &str) -> Result<DanceResponse, DecodeError> {
    decode(json)
}
