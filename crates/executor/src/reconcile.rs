//! Response reconciler
//!
//! The single authority that advances holons across zone boundaries.
//!
//! ## Algorithm
//!
//! ```text
//! 1. status is a failure        -> Err(Rejected), pools untouched
//! 2. success                    -> snapshot replaces both pools wholesale
//! 3. body = Holons              -> Staged+Committed(id) become SavedHolon views
//! 4. body = HolonCollection     -> members resolved against the snapshot's
//!                                  transient pool, Smart misses become
//!                                  placeholders
//! 5. body = Holon               -> a saved (or committed) holon is reported
//! ```
//!
//! [`reconcile`] is pure: it computes the next state and never touches the
//! caller's. The session swaps the result in (see `session.rs`).

use crate::error::{Error, Result};
use holons_core::{
    Holon, HolonCollection, HolonError, HolonPool, HolonReference, LocalId, SavedHolon,
    SessionState, TransientReference,
};
use holons_wire::{DanceResponse, ResponseBody, ResponseStatusCode};

/// Outcome of applying one successful response
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciliation {
    /// Sequence number of the dance
    pub seq: u64,
    /// Status reported by the server
    pub status: ResponseStatusCode,
    /// Authoritative next session state
    pub state: SessionState,
    /// Holons persisted by this dance
    pub committed: Vec<SavedHolon>,
    /// Persisted holons read by this dance, placeholders included
    pub fetched: Vec<SavedHolon>,
    /// Ids whose content was not in the snapshot
    pub placeholders: Vec<LocalId>,
    /// Response body, as received
    pub body: ResponseBody,
}

/// Compute the session state that follows `response`
///
/// `current` is only consulted for its transaction id; on error nothing is
/// produced and the caller keeps its existing state.
pub fn reconcile(
    dance: &str,
    seq: u64,
    current: &SessionState,
    response: DanceResponse,
) -> Result<Reconciliation> {
    if !response.status_code.is_success() {
        return Err(Error::Rejected {
            dance: dance.to_string(),
            status: response.status_code,
            description: response.description.0,
        });
    }

    let snapshot = response
        .session_snapshot
        .ok_or_else(|| Error::MissingSnapshot {
            dance: dance.to_string(),
        })?;
    if snapshot.tx_id != current.tx_id {
        return Err(HolonError::CrossTransactionReference {
            expected: current.tx_id,
            actual: snapshot.tx_id,
        }
        .into());
    }
    snapshot.check_invariants()?;

    let mut reconciliation = Reconciliation {
        seq,
        status: response.status_code,
        state: snapshot,
        committed: Vec::new(),
        fetched: Vec::new(),
        placeholders: Vec::new(),
        body: ResponseBody::None,
    };

    match &response.body {
        ResponseBody::Holons(holons) => {
            for holon in holons {
                collect_holon(holon, &mut reconciliation);
            }
        }
        ResponseBody::Holon(holon) => collect_holon(holon, &mut reconciliation),
        ResponseBody::HolonCollection(collection) => {
            resolve_collection(collection, &mut reconciliation);
        }
        ResponseBody::None | ResponseBody::HolonReference(_) | ResponseBody::NodeCollection(_) => {}
    }
    reconciliation.body = response.body;

    tracing::debug!(
        dance,
        seq,
        committed = reconciliation.committed.len(),
        fetched = reconciliation.fetched.len(),
        placeholders = reconciliation.placeholders.len(),
        "reconciled response"
    );
    Ok(reconciliation)
}

fn collect_holon(holon: &Holon, out: &mut Reconciliation) {
    match holon {
        Holon::Staged(staged) => {
            if let Some(saved) = staged.to_saved() {
                out.committed.push(saved);
            }
        }
        Holon::Saved(saved) => out.fetched.push(saved.clone()),
        Holon::Transient(_) => {}
    }
}

fn resolve_collection(collection: &HolonCollection, out: &mut Reconciliation) {
    for member in &collection.members {
        let smart = match member {
            HolonReference::Smart(smart) => smart,
            HolonReference::Transient(transient) => {
                match resolve_transient(transient, &out.state.transient_holons) {
                    Some(saved) => out.fetched.push(saved),
                    None => tracing::debug!(?member, "skipping unsaved collection member"),
                }
                continue;
            }
            HolonReference::Staged(_) => {
                tracing::debug!(?member, "skipping staged collection member");
                continue;
            }
        };
        let id = smart.holon_id.local_id().clone();
        match resolve_smart(&id, smart.smart_property_values.as_ref(), &out.state.transient_holons) {
            Some(saved) => out.fetched.push(saved),
            None => {
                out.fetched.push(SavedHolon::placeholder(id.clone()));
                out.placeholders.push(id);
            }
        }
    }
}

fn resolve_transient(reference: &TransientReference, transient: &HolonPool) -> Option<SavedHolon> {
    let holon = transient.get(&reference.id)?;
    let id = holon.original_id()?;
    Some(SavedHolon::new(id.clone(), holon.property_map().clone(), None, holon.version()))
}

fn resolve_smart(
    id: &LocalId,
    cached: Option<&holons_core::PropertyMap>,
    transient: &HolonPool,
) -> Option<SavedHolon> {
    if let Some(properties) = cached {
        return Some(SavedHolon::new(id.clone(), properties.clone(), None, 1));
    }
    transient
        .iter()
        .map(|(_, holon)| holon)
        .find(|holon| holon.original_id() == Some(id))
        .map(|holon| SavedHolon::new(id.clone(), holon.property_map().clone(), None, holon.version()))
}
