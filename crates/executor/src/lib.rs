//! Dance execution layer for the holons client
//!
//! Every operation against a holon space is a *dance*: a request built from
//! the current session pools, sent over a [`Transport`], and answered with
//! an authoritative snapshot that replaces those pools.
//!
//! ## Architecture
//!
//! ```text
//! caller intent
//!     │
//!     ▼
//! DanceBuilder ── pure projection of (session, intent) → DanceRequest
//!     │
//!     ▼
//! Transport ───── the only suspension point (timeout-bounded)
//!     │
//!     ▼
//! reconcile() ─── pure: DanceResponse → next SessionState + reports
//!     │
//!     ▼
//! Session ─────── swaps the Arc'd state if the dance is still current
//! ```
//!
//! The [`Executor`] drives this sequence under the session's in-flight
//! guard, so at most one dance is outstanding per session.
//!
//! ## Test support
//!
//! With the `test-support` feature, [`testing`] provides an in-memory dance
//! server and a scripted transport.

#![warn(missing_docs)]
#![warn(clippy::all)]

mod builder;
mod error;
mod events;
mod executor;
mod reconcile;
mod session;
mod transport;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

#[cfg(test)]
mod tests;

pub use builder::DanceBuilder;
pub use error::{Error, Result};
pub use events::SessionEvent;
pub use executor::{Executor, DEFAULT_TIMEOUT};
pub use reconcile::{reconcile, Reconciliation};
pub use session::Session;
pub use transport::{JsonChannel, JsonTransport, Transport};
