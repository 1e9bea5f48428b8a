//! JSON wire encoding for dance envelopes
//!
//! Enums are externally tagged, so a body reads `{"ParameterValues": {...}}`
//! and a unit variant reads `"None"`. Temporary ids are strings, local ids
//! are byte arrays.

mod decode;
mod encode;
mod error;

pub use decode::{decode_request, decode_response, DecodeError};
pub use encode::{encode_request, encode_response, EncodeError};
pub use error::{encode_wire_error, WireError};
