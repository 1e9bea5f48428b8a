//! Session state: the transient and staged pools of one transaction

use crate::error::{HolonError, Result};
use crate::holon::Holon;
use crate::pool::HolonPool;
use crate::reference::{HolonReference, StagedReference, TransientReference};
use crate::types::{TemporaryId, TxId};
use serde::{Deserialize, Serialize};

/// Pools for one transaction
///
/// The two pools are structurally identical but never share ids: an id
/// valid in one is meaningless in the other.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionState {
    /// Transaction the pools belong to
    pub tx_id: TxId,
    /// Unsaved holons
    pub transient_holons: HolonPool,
    /// Holons queued for commit
    pub staged_holons: HolonPool,
    /// Reference to the space's own holon, once known
    pub local_holon_space: Option<HolonReference>,
}

impl SessionState {
    /// Empty pools for `tx_id`
    pub fn new(tx_id: TxId) -> Self {
        SessionState {
            tx_id,
            ..Default::default()
        }
    }

    /// Reference to a staged pool member
    pub fn staged_reference(&self, id: TemporaryId) -> StagedReference {
        StagedReference {
            tx_id: self.tx_id,
            id,
        }
    }

    /// Reference to a transient pool member
    pub fn transient_reference(&self, id: TemporaryId) -> TransientReference {
        TransientReference {
            tx_id: self.tx_id,
            id,
        }
    }

    /// Resolve a staged reference against this session
    pub fn get_staged(&self, reference: &StagedReference) -> Result<&Holon> {
        HolonReference::Staged(reference.clone()).check_tx(self.tx_id)?;
        self.staged_holons
            .get(&reference.id)
            .ok_or_else(|| HolonError::HolonNotFound(format!("staged holon {}", reference.id)))
    }

    /// Resolve a transient reference against this session
    pub fn get_transient(&self, reference: &TransientReference) -> Result<&Holon> {
        HolonReference::Transient(reference.clone()).check_tx(self.tx_id)?;
        self.transient_holons
            .get(&reference.id)
            .ok_or_else(|| HolonError::HolonNotFound(format!("transient holon {}", reference.id)))
    }

    /// Verify both pools' index invariants
    pub fn check_invariants(&self) -> Result<()> {
        self.transient_holons.check_invariants()?;
        self.staged_holons.check_invariants()?;
        if let Some(id) = self
            .transient_holons
            .holons()
            .keys()
            .find(|id| self.staged_holons.get(id).is_some())
        {
            return Err(HolonError::InvalidWireFormat(format!(
                "temporary id {} present in both pools",
                id
            )));
        }
        Ok(())
    }

    /// One-line description for logs
    pub fn summarize(&self) -> String {
        format!(
            "SessionState {{ {}, transient: {}, staged: {} }}",
            self.tx_id,
            self.transient_holons.len(),
            self.staged_holons.len()
        )
    }
}
