//! Convenient imports for the holons client.
//!
//! This module re-exports the most commonly used types so you can get started
//! with a single import:
//!
//! ```ignore
//! use holons_client::prelude::*;
//!
//! let client = ClientBuilder::new().space("local").build(transport)?;
//! ```

// Main entry point
pub use crate::client::{ClientBuilder, FetchedHolons, HolonsClient};
pub use crate::config::ClientConfig;

// Error handling
pub use crate::error::{Error, Result};

// Holons and their values
pub use holons_core::{
    properties, BaseValue, Holon, MapString, PropertyMap, PropertyName, SavedHolon,
    TransientHolon,
};

// Identity and references
pub use holons_core::{
    HolonId, HolonReference, LocalId, RelationshipName, SpaceId, StagedReference,
    TransientReference, TxId,
};

// Transport seam
pub use holons_executor::{JsonChannel, JsonTransport, SessionEvent, Transport};

pub use std::time::Duration;
