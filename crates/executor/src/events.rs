//! Session events
//!
//! Emitted on a broadcast channel after the session state changes (or is
//! refused). Subscribers that lag simply miss events; the session snapshot
//! is always the source of truth.

use holons_core::TxId;
use holons_wire::ResponseStatusCode;

/// Something that happened to a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A response was applied and the pools swapped
    Reconciled {
        /// Transaction
        tx_id: TxId,
        /// Sequence number of the dance
        seq: u64,
        /// Dance name
        dance: String,
        /// Transient pool size after the swap
        transient: usize,
        /// Staged pool size after the swap
        staged: usize,
        /// Holons committed by this dance
        committed: usize,
    },
    /// The server refused a dance; pools unchanged
    Rejected {
        /// Transaction
        tx_id: TxId,
        /// Sequence number of the dance
        seq: u64,
        /// Dance name
        dance: String,
        /// Reported status
        status: ResponseStatusCode,
    },
}

impl SessionEvent {
    /// Sequence number of the dance this event is about
    pub fn seq(&self) -> u64 {
        match self {
            SessionEvent::Reconciled { seq, .. } | SessionEvent::Rejected { seq, .. } => *seq,
        }
    }
}
