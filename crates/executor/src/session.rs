//! Session: the shared pool reference and its guards
//!
//! A session owns the current [`SessionState`] for one transaction and
//! serializes every dance against it.
//!
//! ## Dance Sequence
//!
//! ```text
//! 1. begin()            - acquire the in-flight guard (callers queue here)
//! 2. next_seq()         - tag the dance with a monotonically increasing number
//! 3. snapshot()         - read the current state (Arc clone)
//! 4. build + await call - suspension happens only here
//! 5. install(seq, ..)   - swap in the reconciled state, unless seq is stale
//! 6. drop guard
//! ```
//!
//! Readers never take the in-flight guard. They see the state before the
//! swap or after it, never a mix.

use crate::events::SessionEvent;
use holons_core::{SessionState, SpaceId, TxId};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard};

/// Shared state of one transaction
pub struct Session {
    /// Current pools
    ///
    /// Replaced as a whole on each successful reconcile; never edited in place.
    state: RwLock<Arc<SessionState>>,

    /// Space every dance targets
    space: SpaceId,

    /// Last issued sequence number
    ///
    /// A response is applied only if its seq is still the latest issued.
    /// Cancelling bumps this without issuing, orphaning the in-flight dance.
    issued: AtomicU64,

    /// In-flight guard
    ///
    /// Held from build until the swap so two reconciliations can never race
    /// to replace the same state.
    in_flight: Mutex<()>,

    /// Event fan-out
    events: broadcast::Sender<SessionEvent>,
}

impl Session {
    /// Empty session for `tx_id` in `space`
    pub fn new(tx_id: TxId, space: SpaceId, event_capacity: usize) -> Self {
        Self::with_state(SessionState::new(tx_id), space, event_capacity)
    }

    /// Session starting from existing pools
    pub fn with_state(state: SessionState, space: SpaceId, event_capacity: usize) -> Self {
        let (events, _) = broadcast::channel(event_capacity.max(1));
        Session {
            state: RwLock::new(Arc::new(state)),
            space,
            issued: AtomicU64::new(0),
            in_flight: Mutex::new(()),
            events,
        }
    }

    /// Transaction id
    pub fn tx_id(&self) -> TxId {
        self.state.read().tx_id
    }

    /// Space reference
    pub fn space(&self) -> &SpaceId {
        &self.space
    }

    /// Current state
    pub fn snapshot(&self) -> Arc<SessionState> {
        self.state.read().clone()
    }

    /// Wait for the in-flight guard
    pub async fn begin(&self) -> MutexGuard<'_, ()> {
        self.in_flight.lock().await
    }

    /// Issue the next sequence number
    pub fn next_seq(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Check if `seq` is still the latest issued dance
    pub fn is_current(&self, seq: u64) -> bool {
        self.issued.load(Ordering::SeqCst) == seq
    }

    /// Orphan the in-flight dance, if any
    ///
    /// Its response will be discarded when it arrives. Returns the
    /// sequence number that was cancelled, or `None` when no dance holds
    /// the in-flight guard.
    pub fn cancel_in_flight(&self) -> Option<u64> {
        if self.in_flight.try_lock().is_ok() {
            return None;
        }
        let cancelled = self.issued.fetch_add(1, Ordering::SeqCst);
        tracing::info!(seq = cancelled, "cancelled in-flight dance");
        Some(cancelled)
    }

    /// Swap in `next` if `seq` is still current
    ///
    /// The staleness check and the swap happen under the same write lock.
    pub fn install(&self, seq: u64, next: SessionState) -> bool {
        let mut slot = self.state.write();
        if !self.is_current(seq) {
            return false;
        }
        *slot = Arc::new(next);
        true
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub(crate) fn emit(&self, event: SessionEvent) {
        // No subscribers is fine
        let _ = self.events.send(event);
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("space", &self.space)
            .field("issued", &self.issued.load(Ordering::SeqCst))
            .field("state", &self.state.read().summarize())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holons_core::{properties, TransientHolon};

    fn session() -> Session {
        Session::new(TxId(1), SpaceId::from("local"), 8)
    }

    #[test]
    fn test_sequence_is_monotonic() {
        let s = session();
        let a = s.next_seq();
        let b = s.next_seq();
        assert!(b > a);
        assert!(s.is_current(b));
        assert!(!s.is_current(a));
    }

    #[tokio::test]
    async fn test_cancel_orphans_in_flight() {
        let s = session();
        let guard = s.begin().await;
        let seq = s.next_seq();
        assert_eq!(s.cancel_in_flight(), Some(seq));
        assert!(!s.is_current(seq));

        let mut next = SessionState::new(TxId(1));
        next.staged_holons
            .stage_holon(TransientHolon::new(properties([("key", "x")])))
            .unwrap();
        assert!(!s.install(seq, next));
        assert!(s.snapshot().staged_holons.is_empty());
        drop(guard);
    }

    #[test]
    fn test_cancel_when_idle_is_noop() {
        let s = session();
        let seq = s.next_seq();

        assert_eq!(s.cancel_in_flight(), None);
        assert!(s.is_current(seq));
    }

    #[test]
    fn test_install_swaps_reference() {
        let s = session();
        let before = s.snapshot();
        let seq = s.next_seq();

        let mut next = SessionState::new(TxId(1));
        next.staged_holons
            .stage_holon(TransientHolon::new(properties([("key", "x")])))
            .unwrap();
        assert!(s.install(seq, next));

        assert!(before.staged_holons.is_empty());
        assert_eq!(s.snapshot().staged_holons.len(), 1);
    }

    #[tokio::test]
    async fn test_in_flight_guard_is_exclusive() {
        let s = session();
        let guard = s.begin().await;
        assert!(s.in_flight.try_lock().is_err());
        drop(guard);
        assert!(s.in_flight.try_lock().is_ok());
    }
}
