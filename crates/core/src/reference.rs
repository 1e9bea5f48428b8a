//! References to holons and collections of references
//!
//! A [`HolonReference`] names a holon without carrying it: transient and
//! staged holons by `(tx_id, temporary_id)`, saved holons by [`HolonId`].

use crate::error::{HolonError, Result};
use crate::types::{HolonId, RelationshipName, TemporaryId, TxId};
use crate::value::{MapString, PropertyMap};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Reference to a holon in the transient pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransientReference {
    /// Transaction the id was issued under
    pub tx_id: TxId,
    /// Id within the transient pool
    pub id: TemporaryId,
}

/// Reference to a holon in the staged pool
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StagedReference {
    /// Transaction the id was issued under
    pub tx_id: TxId,
    /// Id within the staged pool
    pub id: TemporaryId,
}

/// Reference to a persisted holon, optionally carrying cached properties
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmartReference {
    /// Transaction the reference was resolved under
    pub tx_id: TxId,
    /// Persisted id
    pub holon_id: HolonId,
    /// Properties cached at resolution time
    pub smart_property_values: Option<PropertyMap>,
}

/// Reference to a holon in any zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HolonReference {
    /// Transient pool member
    Transient(TransientReference),
    /// Staged pool member
    Staged(StagedReference),
    /// Persisted holon
    Smart(SmartReference),
}

impl HolonReference {
    /// Transaction this reference was issued under
    pub fn tx_id(&self) -> TxId {
        match self {
            HolonReference::Transient(r) => r.tx_id,
            HolonReference::Staged(r) => r.tx_id,
            HolonReference::Smart(r) => r.tx_id,
        }
    }

    /// Persisted id, for smart references
    pub fn holon_id(&self) -> Option<&HolonId> {
        match self {
            HolonReference::Smart(r) => Some(&r.holon_id),
            _ => None,
        }
    }

    /// Reject references issued under another transaction
    pub fn check_tx(&self, expected: TxId) -> Result<()> {
        let actual = self.tx_id();
        if actual != expected {
            return Err(HolonError::CrossTransactionReference { expected, actual });
        }
        Ok(())
    }
}

impl From<StagedReference> for HolonReference {
    fn from(r: StagedReference) -> Self {
        HolonReference::Staged(r)
    }
}

impl From<TransientReference> for HolonReference {
    fn from(r: TransientReference) -> Self {
        HolonReference::Transient(r)
    }
}

impl From<SmartReference> for HolonReference {
    fn from(r: SmartReference) -> Self {
        HolonReference::Smart(r)
    }
}

/// Lifecycle of a [`HolonCollection`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CollectionState {
    /// Loaded from the server
    Fetched,
    /// Not yet loaded
    Pending,
    /// Owned by a staged holon
    Staged,
    /// Owned by a saved holon
    Saved,
    /// Owner was abandoned
    Abandoned,
}

/// Ordered set of holon references with an optional key index
///
/// `keyed_index` maps a member's key to its position in `members`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HolonCollection {
    /// Collection lifecycle
    pub state: CollectionState,
    /// Member references in insertion order
    pub members: Vec<HolonReference>,
    /// Key to member position
    pub keyed_index: BTreeMap<MapString, usize>,
}

impl HolonCollection {
    /// Create an empty collection in the given state
    pub fn new(state: CollectionState) -> Self {
        HolonCollection {
            state,
            members: Vec::new(),
            keyed_index: BTreeMap::new(),
        }
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if the collection has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Member indexed under `key`
    pub fn get_by_key(&self, key: &MapString) -> Option<&HolonReference> {
        self.keyed_index.get(key).and_then(|i| self.members.get(*i))
    }

    /// Key a member position is indexed under
    pub fn key_for_position(&self, position: usize) -> Option<&MapString> {
        self.keyed_index
            .iter()
            .find(|(_, i)| **i == position)
            .map(|(k, _)| k)
    }

    /// Append references, indexing each under its key when one is given
    ///
    /// A key already in the index, or repeated within `references`, is a
    /// [`HolonError::DuplicateError`] and nothing is added.
    pub fn add_references(
        &mut self,
        references: Vec<(HolonReference, Option<MapString>)>,
    ) -> Result<()> {
        let mut seen = BTreeSet::new();
        for key in references.iter().filter_map(|(_, key)| key.as_ref()) {
            if self.keyed_index.contains_key(key) || !seen.insert(key) {
                return Err(HolonError::DuplicateError("key".into(), key.to_string()));
            }
        }
        for (reference, key) in references {
            if let Some(key) = key {
                self.keyed_index.insert(key, self.members.len());
            }
            self.members.push(reference);
        }
        Ok(())
    }

    /// Remove every member equal to one of `references` and rebuild the index
    pub fn remove_references(&mut self, references: &[HolonReference]) {
        let keys_by_member: Vec<Option<MapString>> = (0..self.members.len())
            .map(|i| self.key_for_position(i).cloned())
            .collect();

        let mut kept = Vec::with_capacity(self.members.len());
        let mut index = BTreeMap::new();
        for (member, key) in self.members.drain(..).zip(keys_by_member) {
            if references.contains(&member) {
                continue;
            }
            if let Some(key) = key {
                index.insert(key, kept.len());
            }
            kept.push(member);
        }
        self.members = kept;
        self.keyed_index = index;
    }
}

impl Default for HolonCollection {
    fn default() -> Self {
        Self::new(CollectionState::Pending)
    }
}

/// Relationship name to related holons
pub type RelationshipMap = BTreeMap<RelationshipName, HolonCollection>;

/// Relationship to traverse in a query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryExpression {
    /// Relationship to follow from each source node
    pub relationship_name: RelationshipName,
}

/// Source nodes of a relationship query and, once evaluated, its results
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NodeCollection {
    /// Source (or result) references
    pub members: Vec<HolonReference>,
    /// Query that produced this collection, if any
    pub query_spec: Option<QueryExpression>,
}

impl NodeCollection {
    /// Collection of source nodes with no query attached
    pub fn from_references(members: Vec<HolonReference>) -> Self {
        NodeCollection {
            members,
            query_spec: None,
        }
    }
}
