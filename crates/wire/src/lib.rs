//! Wire contract for holon dances
//!
//! A dance is one request/response exchange with the backend. This crate
//! defines both envelopes and their JSON encoding:
//!
//! | Type | Direction | Carries |
//! |------|-----------|---------|
//! | [`DanceRequest`] | client → server | name, [`DanceType`], [`RequestBody`], session context |
//! | [`DanceResponse`] | server → client | [`ResponseStatusCode`], [`ResponseBody`], session snapshot |
//!
//! ## Examples
//!
//! ```
//! use holons_core::{SessionState, SpaceId, TxId};
//! use holons_wire::{decode_request, encode_request, DanceRequest, DanceType, RequestBody};
//!
//! let request = DanceRequest::new(
//!     "commit",
//!     DanceType::Standalone,
//!     RequestBody::None,
//!     SpaceId::from("local"),
//!     SessionState::new(TxId(1)),
//! );
//! let json = encode_request(&request).unwrap();
//! assert_eq!(decode_request(&json).unwrap(), request);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod json;
mod request;
mod response;

pub use json::{
    decode_request, decode_response, encode_request, encode_response, encode_wire_error,
    DecodeError, EncodeError, WireError,
};
pub use request::{ContentSet, DanceRequest, DanceType, FileData, RequestBody, SessionContext};
pub use response::{DanceResponse, ResponseBody, ResponseStatusCode};
