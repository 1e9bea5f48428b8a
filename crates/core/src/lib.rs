//! Core types for the holons client
//!
//! This crate defines the holon lifecycle and the session pools that every
//! other crate builds on:
//! - [`value`]: property values and maps
//! - [`types`]: local, temporary, transaction and space ids
//! - [`holon`]: the Transient / Staged / Saved state machine
//! - [`reference`]: holon references, collections and queries
//! - [`pool`]: temporary-id indexed pools with a key index
//! - [`session`]: the transient and staged pools of one transaction
//! - [`error`]: [`HolonError`] and its [`ErrorKind`] taxonomy

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod holon;
pub mod pool;
pub mod reference;
pub mod session;
pub mod types;
pub mod value;

pub use error::{ErrorKind, HolonError, Result};
pub use holon::{
    AccessType, ErrorWithContext, Holon, HolonState, SavedHolon, SavedState, StagedHolon,
    StagedState, TransientHolon, ValidationState,
};
pub use pool::HolonPool;
pub use reference::{
    CollectionState, HolonCollection, HolonReference, NodeCollection, QueryExpression,
    RelationshipMap, SmartReference, StagedReference, TransientReference,
};
pub use session::SessionState;
pub use types::{
    ExternalId, HolonId, LocalId, OutboundProxyId, RelationshipName, SpaceId, TemporaryId, TxId,
};
pub use value::{
    key_of, properties, versioned_key, BaseValue, MapString, PropertyMap, PropertyName,
    KEY_PROPERTY,
};
