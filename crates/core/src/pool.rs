//! Temporary-id indexed holon pools
//!
//! A [`HolonPool`] maps [`TemporaryId`] to [`Holon`] and keeps a secondary
//! index from each holon's `"key"` property to its id. All mutation goes
//! through this type so the index invariant is enforced in one place:
//!
//! - every value in `keyed_index` is a key of `holons`
//! - an indexed id's holon currently carries that key
//! - duplicate keys resolve to the most recent writer

use crate::error::{HolonError, Result};
use crate::holon::{Holon, StagedHolon, TransientHolon};
use crate::types::TemporaryId;
use crate::value::MapString;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One zone's holons plus the key index
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HolonPool {
    holons: BTreeMap<TemporaryId, Holon>,
    keyed_index: BTreeMap<MapString, TemporaryId>,
}

impl HolonPool {
    /// Create an empty pool
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of holons
    pub fn len(&self) -> usize {
        self.holons.len()
    }

    /// Check if the pool holds no holons
    pub fn is_empty(&self) -> bool {
        self.holons.is_empty()
    }

    /// Holons by id
    pub fn holons(&self) -> &BTreeMap<TemporaryId, Holon> {
        &self.holons
    }

    /// Key index
    pub fn keyed_index(&self) -> &BTreeMap<MapString, TemporaryId> {
        &self.keyed_index
    }

    /// Iterate `(id, holon)` in id order
    pub fn iter(&self) -> impl Iterator<Item = (&TemporaryId, &Holon)> {
        self.holons.iter()
    }

    /// Insert or overwrite `holons[id]` and re-index its key
    ///
    /// Entries that pointed at `id` under a previous key are dropped. A
    /// transient holon takes `id` as its temporary id.
    pub fn insert(&mut self, id: TemporaryId, holon: Holon) {
        let mut holon = holon;
        if let Holon::Transient(h) = &mut holon {
            h.set_temporary_id(id);
        }
        self.unindex(&id);
        if let Some(key) = holon.key() {
            if let Some(previous) = self.keyed_index.insert(key.clone(), id) {
                if previous != id {
                    tracing::debug!(key = %key, %previous, current = %id, "key re-indexed to newer holon");
                }
            }
        }
        self.holons.insert(id, holon);
    }

    /// Holon by id
    pub fn get(&self, id: &TemporaryId) -> Option<&Holon> {
        self.holons.get(id)
    }

    /// Holon by key; `None` if either lookup step misses
    pub fn get_by_key(&self, key: &MapString) -> Option<&Holon> {
        self.keyed_index.get(key).and_then(|id| self.holons.get(id))
    }

    /// Id currently indexed under `key`
    pub fn get_id_by_key(&self, key: &MapString) -> Option<TemporaryId> {
        self.keyed_index.get(key).copied()
    }

    /// Remove `holons[id]` and prune every index entry pointing at it
    pub fn remove(&mut self, id: &TemporaryId) -> Option<Holon> {
        let removed = self.holons.remove(id);
        self.unindex(id);
        removed
    }

    /// Remove every holon
    pub fn clear(&mut self) {
        self.holons.clear();
        self.keyed_index.clear();
    }

    /// Mutate `holons[id]` in place and re-index its key afterwards
    ///
    /// The holon is restored unchanged if `f` fails.
    pub fn update<F, T>(&mut self, id: &TemporaryId, f: F) -> Result<T>
    where
        F: FnOnce(&mut Holon) -> Result<T>,
    {
        let holon = self
            .holons
            .get(id)
            .ok_or_else(|| HolonError::HolonNotFound(format!("temporary id {}", id)))?;
        let mut working = holon.clone();
        let out = f(&mut working)?;
        self.insert(*id, working);
        Ok(out)
    }

    /// Stage a transient holon into this pool under a fresh id
    pub fn stage_holon(&mut self, holon: TransientHolon) -> Result<TemporaryId> {
        let staged: StagedHolon = holon.stage()?;
        let id = TemporaryId::new();
        self.insert(id, Holon::Staged(staged));
        Ok(id)
    }

    /// Verify the key index invariant
    pub fn check_invariants(&self) -> Result<()> {
        for (key, id) in &self.keyed_index {
            match self.holons.get(id) {
                None => {
                    return Err(HolonError::InvalidWireFormat(format!(
                        "key {} indexes missing holon {}",
                        key, id
                    )))
                }
                Some(holon) if holon.key().as_ref() != Some(key) => {
                    return Err(HolonError::InvalidWireFormat(format!(
                        "key {} indexes holon {} which no longer carries it",
                        key, id
                    )))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }

    fn unindex(&mut self, id: &TemporaryId) {
        self.keyed_index.retain(|_, indexed| indexed != id);
    }
}
