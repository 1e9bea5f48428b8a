//! # Holons Client
//!
//! Client-side coordinator for holons: staging, committing and reconciling
//! them against a remote holon space.
//!
//! A holon lives in one of three zones. It starts *transient* (local and
//! unsaved), is *staged* for commit, and becomes *saved* once the server
//! persists it. The client keeps the transient and staged pools of one
//! transaction and replaces them with the server's authoritative snapshot
//! after every call.
//!
//! ## Quick Start
//!
//! ```ignore
//! use holons_client::prelude::*;
//!
//! // Connect over any Transport
//! let client = ClientBuilder::new()
//!     .space("local")
//!     .timeout(Duration::from_secs(5))
//!     .build(transport)?;
//!
//! // Stage, edit and commit
//! let book = client
//!     .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
//!     .await?;
//! client.with_properties(book, properties([("title", "Holons")])).await?;
//! let saved = client.commit().await?;
//!
//! // Read back
//! let all = client.get_all_holons().await?;
//! let all = client.refresh_placeholders(all).await?;
//! ```
//!
//! ## Layers
//!
//! - [`holons_core`] - values, ids, the holon state machine and session pools
//! - [`holons_wire`] - dance request/response envelopes and their JSON form
//! - [`holons_executor`] - request building, transport seam, reconciliation
//! - this crate - [`HolonsClient`], configuration and a unified [`Error`]
//!
//! ## Guarantees
//!
//! - Every pool change comes from a server snapshot; a failed, timed-out or
//!   cancelled dance leaves the pools exactly as they were.
//! - At most one dance is in flight per client; concurrent calls queue.
//! - Readers see the pools before a reconcile or after it, never a mix.

#![warn(missing_docs)]

mod client;
mod config;
mod error;

pub mod prelude;

// Re-export main entry points
pub use client::{ClientBuilder, FetchedHolons, HolonsClient};
pub use config::{ClientConfig, DEFAULT_EVENT_CAPACITY, DEFAULT_TIMEOUT_MS};
pub use error::{Error, Result};

// Re-export layers
pub use holons_core;
pub use holons_executor;
pub use holons_wire;

// Re-export the types most calls need
pub use holons_core::{
    properties, BaseValue, Holon, HolonId, HolonReference, LocalId, MapString, PropertyMap,
    PropertyName, RelationshipName, SavedHolon, SessionState, SpaceId, StagedReference,
    TemporaryId, TransientHolon, TransientReference, TxId,
};
pub use holons_executor::{JsonChannel, JsonTransport, Reconciliation, SessionEvent, Transport};
pub use holons_wire::{ContentSet, FileData, ResponseStatusCode};
