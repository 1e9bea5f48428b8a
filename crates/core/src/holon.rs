//! Holon lifecycle state machine
//!
//! A [`Holon`] is exactly one of three variants at any time:
//!
//! ```text
//!   Transient ──stage──▶ Staged ──commit(id)──▶ Committed ─ reconciler ─▶ Saved
//!                           │
//!                           └──abandon──▶ Abandoned (terminal)
//! ```
//!
//! ## Invariants
//!
//! | Rule | Meaning |
//! |------|---------|
//! | One variant | Transitions only move forward |
//! | Atomic commit | `Committed(id)` and `Immutable` are set together |
//! | Lineage | `original_id` survives every promotion unchanged |
//! | Version | +1 on every successful mutation, never on failure |
//!
//! Access checks ([`Holon::is_accessible`]) are pure and are consulted by every
//! mutator before it touches the holon.

use crate::error::{HolonError, Result};
use crate::reference::{CollectionState, HolonCollection, HolonReference, RelationshipMap};
use crate::types::{LocalId, RelationshipName, TemporaryId};
use crate::value::{key_of, BaseValue, MapString, PropertyMap, PropertyName};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Base mutability of a holon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum HolonState {
    /// Properties and relationships may change
    Mutable,
    /// Frozen; read, clone and commit only
    Immutable,
}

impl HolonState {
    /// Access types permitted by the base state alone
    pub fn allows(&self, access: AccessType) -> bool {
        match self {
            HolonState::Mutable => true,
            HolonState::Immutable => matches!(
                access,
                AccessType::Read | AccessType::Clone | AccessType::Commit
            ),
        }
    }
}

/// Staging lifecycle of a [`StagedHolon`]
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StagedState {
    /// New holon with no predecessor
    ForCreate,
    /// Successor of `original_id`, unchanged so far
    ForUpdate,
    /// Successor of `original_id` with local changes
    ForUpdateChanged,
    /// Terminal; will never be committed
    Abandoned,
    /// Persisted under the given id
    Committed(LocalId),
}

impl StagedState {
    /// Check if the holon can still be committed or abandoned
    pub fn is_pending(&self) -> bool {
        matches!(
            self,
            StagedState::ForCreate | StagedState::ForUpdate | StagedState::ForUpdateChanged
        )
    }

    /// Get string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            StagedState::ForCreate => "ForCreate",
            StagedState::ForUpdate => "ForUpdate",
            StagedState::ForUpdateChanged => "ForUpdateChanged",
            StagedState::Abandoned => "Abandoned",
            StagedState::Committed(_) => "Committed",
        }
    }
}

/// Persistence state of a [`SavedHolon`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SavedState {
    /// Read back from the store
    Fetched,
    /// Deleted from the store
    Deleted,
}

/// Descriptor validation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationState {
    /// No descriptor to validate against
    NoDescriptor,
    /// Not yet validated
    ValidationRequired,
    /// Passed validation
    Validated,
    /// Failed validation
    Invalid,
}

/// Kind of access a caller requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AccessType {
    /// Read properties or relationships
    Read,
    /// Change properties or relationships
    Write,
    /// Persist a staged holon
    Commit,
    /// Copy into a new transient holon
    Clone,
    /// Abandon a staged holon
    Abandon,
}

impl fmt::Display for AccessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AccessType::Read => "Read",
            AccessType::Write => "Write",
            AccessType::Commit => "Commit",
            AccessType::Clone => "Clone",
            AccessType::Abandon => "Abandon",
        };
        f.write_str(name)
    }
}

/// An error recorded against a staged holon during commit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorWithContext {
    /// Rendered error
    pub error: String,
    /// Where it happened
    pub context: Option<String>,
}

impl ErrorWithContext {
    /// Record `error` with optional context
    pub fn new(error: &HolonError, context: Option<String>) -> Self {
        ErrorWithContext {
            error: error.to_string(),
            context,
        }
    }
}

// ============================================================================
// Shared mutation helpers
// ============================================================================

fn set_property(map: &mut PropertyMap, name: PropertyName, value: Option<BaseValue>) {
    map.insert(name, value);
}

fn add_related(
    relationships: &mut RelationshipMap,
    name: RelationshipName,
    references: Vec<(HolonReference, Option<MapString>)>,
    state: CollectionState,
) -> Result<()> {
    if name.as_str().is_empty() {
        return Err(HolonError::EmptyField("relationship_name".into()));
    }
    relationships
        .entry(name)
        .or_insert_with(|| HolonCollection::new(state))
        .add_references(references)
}

fn remove_related(
    relationships: &mut RelationshipMap,
    name: &RelationshipName,
    references: &[HolonReference],
) -> Result<()> {
    match relationships.get_mut(name) {
        Some(collection) => {
            collection.remove_references(references);
            Ok(())
        }
        None => Err(HolonError::InvalidParameter(format!(
            "no relationship named {}",
            name
        ))),
    }
}

// ============================================================================
// TransientHolon
// ============================================================================

/// Unsaved, purely local holon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransientHolon {
    version: u64,
    holon_state: HolonState,
    validation_state: ValidationState,
    temporary_id: Option<TemporaryId>,
    property_map: PropertyMap,
    relationships: RelationshipMap,
    original_id: Option<LocalId>,
}

impl TransientHolon {
    /// Create a mutable transient holon at version 1
    ///
    /// No temporary id is assigned until the holon enters a pool.
    pub fn new(property_map: PropertyMap) -> Self {
        TransientHolon {
            version: 1,
            holon_state: HolonState::Mutable,
            validation_state: ValidationState::ValidationRequired,
            temporary_id: None,
            property_map,
            relationships: RelationshipMap::new(),
            original_id: None,
        }
    }

    /// Name the persisted predecessor this holon supersedes
    pub fn with_original_id(mut self, original_id: LocalId) -> Self {
        self.original_id = Some(original_id);
        self
    }

    /// Current version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Base mutability
    pub fn holon_state(&self) -> HolonState {
        self.holon_state
    }

    /// Validation status
    pub fn validation_state(&self) -> ValidationState {
        self.validation_state
    }

    /// Pool id, once the holon has been pooled
    pub fn temporary_id(&self) -> Option<TemporaryId> {
        self.temporary_id
    }

    pub(crate) fn set_temporary_id(&mut self, id: TemporaryId) {
        self.temporary_id = Some(id);
    }

    /// Properties
    pub fn property_map(&self) -> &PropertyMap {
        &self.property_map
    }

    /// Relationships
    pub fn relationships(&self) -> &RelationshipMap {
        &self.relationships
    }

    /// Predecessor id
    pub fn original_id(&self) -> Option<&LocalId> {
        self.original_id.as_ref()
    }

    /// Check whether `access` is permitted
    pub fn is_accessible(&self, access: AccessType) -> bool {
        self.holon_state.allows(access)
    }

    fn check_access(&self, access: AccessType) -> Result<()> {
        if self.is_accessible(access) {
            Ok(())
        } else {
            Err(HolonError::NotAccessible {
                access,
                state: format!("Transient({:?})", self.holon_state),
            })
        }
    }

    /// Freeze the holon
    pub fn make_immutable(&mut self) {
        self.holon_state = HolonState::Immutable;
    }

    /// Set one property (or clear it to null with `None`)
    pub fn with_property_value(
        &mut self,
        name: impl Into<PropertyName>,
        value: Option<BaseValue>,
    ) -> Result<&mut Self> {
        self.check_access(AccessType::Write)?;
        set_property(&mut self.property_map, name.into(), value);
        self.version += 1;
        Ok(self)
    }

    /// Remove a property entirely
    pub fn remove_property_value(&mut self, name: &PropertyName) -> Result<&mut Self> {
        self.check_access(AccessType::Write)?;
        self.property_map.remove(name);
        self.version += 1;
        Ok(self)
    }

    /// Merge `properties` into the property map as one mutation
    pub fn update_property_map(&mut self, properties: PropertyMap) -> Result<&mut Self> {
        self.check_access(AccessType::Write)?;
        self.property_map.extend(properties);
        self.version += 1;
        Ok(self)
    }

    /// Add related holons under `name`
    pub fn add_related_holons(
        &mut self,
        name: RelationshipName,
        references: Vec<(HolonReference, Option<MapString>)>,
    ) -> Result<()> {
        self.check_access(AccessType::Write)?;
        add_related(&mut self.relationships, name, references, CollectionState::Pending)?;
        self.version += 1;
        Ok(())
    }

    /// Remove related holons from `name`
    pub fn remove_related_holons(
        &mut self,
        name: &RelationshipName,
        references: &[HolonReference],
    ) -> Result<()> {
        self.check_access(AccessType::Write)?;
        remove_related(&mut self.relationships, name, references)?;
        self.version += 1;
        Ok(())
    }

    /// Queue this holon for commit
    ///
    /// Produces `ForUpdate` when a predecessor is named, `ForCreate` otherwise.
    pub fn stage(self) -> Result<StagedHolon> {
        if self.holon_state != HolonState::Mutable {
            return Err(HolonError::InvalidTransition(
                "only a mutable transient holon can be staged".into(),
            ));
        }
        let staged_state = if self.original_id.is_some() {
            StagedState::ForUpdate
        } else {
            StagedState::ForCreate
        };
        let mut relationships = self.relationships;
        for collection in relationships.values_mut() {
            collection.state = CollectionState::Staged;
        }
        Ok(StagedHolon {
            version: self.version,
            holon_state: HolonState::Mutable,
            staged_state,
            validation_state: self.validation_state,
            property_map: self.property_map,
            relationships,
            original_id: self.original_id,
            errors: Vec::new(),
        })
    }
}

// ============================================================================
// StagedHolon
// ============================================================================

/// Holon queued for commit
///
/// Clients never commit a staged holon themselves; `Committed` only
/// arrives in a snapshot echoed by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagedHolon {
    version: u64,
    holon_state: HolonState,
    staged_state: StagedState,
    validation_state: ValidationState,
    property_map: PropertyMap,
    relationships: RelationshipMap,
    original_id: Option<LocalId>,
    errors: Vec<ErrorWithContext>,
}

impl StagedHolon {
    /// Current version
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Base mutability
    pub fn holon_state(&self) -> HolonState {
        self.holon_state
    }

    /// Staging lifecycle
    pub fn staged_state(&self) -> &StagedState {
        &self.staged_state
    }

    /// Validation status
    pub fn validation_state(&self) -> ValidationState {
        self.validation_state
    }

    /// Properties
    pub fn property_map(&self) -> &PropertyMap {
        &self.property_map
    }

    /// Relationships
    pub fn relationships(&self) -> &RelationshipMap {
        &self.relationships
    }

    /// Predecessor id
    pub fn original_id(&self) -> Option<&LocalId> {
        self.original_id.as_ref()
    }

    /// Errors recorded during commit
    pub fn errors(&self) -> &[ErrorWithContext] {
        &self.errors
    }

    /// Id assigned at commit, if committed
    pub fn committed_id(&self) -> Option<&LocalId> {
        match &self.staged_state {
            StagedState::Committed(id) => Some(id),
            _ => None,
        }
    }

    /// Check whether `access` is permitted
    ///
    /// Abandoned and Committed holons permit only Read and Clone, whatever
    /// their base state.
    pub fn is_accessible(&self, access: AccessType) -> bool {
        if self.staged_state.is_pending() {
            self.holon_state.allows(access)
        } else {
            matches!(access, AccessType::Read | AccessType::Clone)
        }
    }

    fn state_label(&self) -> String {
        format!("Staged({})", self.staged_state.as_str())
    }

    fn check_access(&self, access: AccessType) -> Result<()> {
        if self.is_accessible(access) {
            Ok(())
        } else {
            Err(HolonError::NotAccessible {
                access,
                state: self.state_label(),
            })
        }
    }

    /// Record that a `ForUpdate` holon now differs from its predecessor
    pub fn mark_changed(&mut self) -> Result<()> {
        match self.staged_state {
            StagedState::ForUpdate => {
                self.staged_state = StagedState::ForUpdateChanged;
                Ok(())
            }
            StagedState::ForCreate | StagedState::ForUpdateChanged => Ok(()),
            StagedState::Abandoned | StagedState::Committed(_) => {
                Err(HolonError::InvalidTransition(format!(
                    "cannot change a holon in {}",
                    self.state_label()
                )))
            }
        }
    }

    /// Abandon staged changes. Terminal.
    pub fn abandon(&mut self) -> Result<()> {
        if !self.staged_state.is_pending() {
            return Err(HolonError::DeletionNotAllowed(format!(
                "cannot abandon a holon in {}",
                self.state_label()
            )));
        }
        self.staged_state = StagedState::Abandoned;
        self.holon_state = HolonState::Immutable;
        for collection in self.relationships.values_mut() {
            collection.state = CollectionState::Abandoned;
        }
        Ok(())
    }

    /// Mark the holon persisted under `saved_id`
    ///
    /// Only a store commits; clients learn the outcome from the echoed
    /// snapshot. Available to the in-memory server through `test-support`.
    #[cfg(any(test, feature = "test-support"))]
    #[doc(hidden)]
    pub fn commit(&mut self, saved_id: LocalId) -> Result<()> {
        if !self.staged_state.is_pending() {
            return Err(HolonError::InvalidTransition(format!(
                "cannot commit a holon in {}",
                self.state_label()
            )));
        }
        self.staged_state = StagedState::Committed(saved_id);
        self.holon_state = HolonState::Immutable;
        for collection in self.relationships.values_mut() {
            collection.state = CollectionState::Saved;
        }
        Ok(())
    }

    /// Record a commit-time error against this holon
    pub fn add_error(&mut self, error: ErrorWithContext) {
        self.errors.push(error);
    }

    fn mutated(&mut self) -> Result<()> {
        self.version += 1;
        self.mark_changed()
    }

    /// Set one property (or clear it to null with `None`)
    pub fn with_property_value(
        &mut self,
        name: impl Into<PropertyName>,
        value: Option<BaseValue>,
    ) -> Result<&mut Self> {
        self.check_access(AccessType::Write)?;
        set_property(&mut self.property_map, name.into(), value);
        self.mutated()?;
        Ok(self)
    }

    /// Remove a property entirely
    pub fn remove_property_value(&mut self, name: &PropertyName) -> Result<&mut Self> {
        self.check_access(AccessType::Write)?;
        self.property_map.remove(name);
        self.mutated()?;
        Ok(self)
    }

    /// Merge `properties` into the property map as one mutation
    pub fn update_property_map(&mut self, properties: PropertyMap) -> Result<&mut Self> {
        self.check_access(AccessType::Write)?;
        self.property_map.extend(properties);
        self.mutated()?;
        Ok(self)
    }

    /// Add related holons under `name`
    pub fn add_related_holons(
        &mut self,
        name: RelationshipName,
        references: Vec<(HolonReference, Option<MapString>)>,
    ) -> Result<()> {
        self.check_access(AccessType::Write)?;
        add_related(&mut self.relationships, name, references, CollectionState::Staged)?;
        self.mutated()
    }

    /// Remove related holons from `name`
    pub fn remove_related_holons(
        &mut self,
        name: &RelationshipName,
        references: &[HolonReference],
    ) -> Result<()> {
        self.check_access(AccessType::Write)?;
        remove_related(&mut self.relationships, name, references)?;
        self.mutated()
    }

    /// Saved view of a committed holon
    pub fn to_saved(&self) -> Option<SavedHolon> {
        self.committed_id().map(|id| SavedHolon {
            holon_state: HolonState::Immutable,
            validation_state: self.validation_state,
            saved_id: id.clone(),
            version: self.version,
            saved_state: SavedState::Fetched,
            property_map: self.property_map.clone(),
            original_id: self.original_id.clone(),
        })
    }
}

// ============================================================================
// SavedHolon
// ============================================================================

/// Persisted, immutable holon
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedHolon {
    holon_state: HolonState,
    validation_state: ValidationState,
    saved_id: LocalId,
    version: u64,
    saved_state: SavedState,
    property_map: PropertyMap,
    original_id: Option<LocalId>,
}

impl SavedHolon {
    /// A fetched holon with the given content
    pub fn new(
        saved_id: LocalId,
        property_map: PropertyMap,
        original_id: Option<LocalId>,
        version: u64,
    ) -> Self {
        SavedHolon {
            holon_state: HolonState::Immutable,
            validation_state: ValidationState::ValidationRequired,
            saved_id,
            version,
            saved_state: SavedState::Fetched,
            property_map,
            original_id,
        }
    }

    /// Minimal stand-in for a holon whose content has not been fetched
    pub fn placeholder(saved_id: LocalId) -> Self {
        Self::new(saved_id, PropertyMap::new(), None, 1)
    }

    /// Persisted id
    pub fn saved_id(&self) -> &LocalId {
        &self.saved_id
    }

    /// Version at commit
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Always `Immutable`
    pub fn holon_state(&self) -> HolonState {
        self.holon_state
    }

    /// Validation status
    pub fn validation_state(&self) -> ValidationState {
        self.validation_state
    }

    /// Fetched or deleted
    pub fn saved_state(&self) -> SavedState {
        self.saved_state
    }

    /// Properties
    pub fn property_map(&self) -> &PropertyMap {
        &self.property_map
    }

    /// Predecessor id
    pub fn original_id(&self) -> Option<&LocalId> {
        self.original_id.as_ref()
    }

    /// Saved holons permit Read and Clone only
    pub fn is_accessible(&self, access: AccessType) -> bool {
        matches!(access, AccessType::Read | AccessType::Clone)
    }

    /// Mark this holon deleted from the store
    pub fn mark_deleted(&mut self) {
        self.saved_state = SavedState::Deleted;
    }

    /// Transient successor that supersedes this holon
    pub fn new_version(&self) -> TransientHolon {
        TransientHolon::new(self.property_map.clone()).with_original_id(self.saved_id.clone())
    }
}

// ============================================================================
// Holon
// ============================================================================

/// A holon in exactly one lifecycle zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Holon {
    /// Unsaved, local
    Transient(TransientHolon),
    /// Queued for commit
    Staged(StagedHolon),
    /// Persisted
    Saved(SavedHolon),
}

impl Holon {
    /// Variant name
    pub fn variant_name(&self) -> &'static str {
        match self {
            Holon::Transient(_) => "Transient",
            Holon::Staged(_) => "Staged",
            Holon::Saved(_) => "Saved",
        }
    }

    /// Check whether `access` is permitted. Pure.
    pub fn is_accessible(&self, access: AccessType) -> bool {
        match self {
            Holon::Transient(h) => h.is_accessible(access),
            Holon::Staged(h) => h.is_accessible(access),
            Holon::Saved(h) => h.is_accessible(access),
        }
    }

    /// Like [`Holon::is_accessible`], but as a `NotAccessible` error
    pub fn is_accessible_or_err(&self, access: AccessType) -> Result<()> {
        if self.is_accessible(access) {
            return Ok(());
        }
        Err(HolonError::NotAccessible {
            access,
            state: self.state_label(),
        })
    }

    fn state_label(&self) -> String {
        match self {
            Holon::Transient(h) => format!("Transient({:?})", h.holon_state),
            Holon::Staged(h) => h.state_label(),
            Holon::Saved(h) => format!("Saved({:?})", h.saved_state),
        }
    }

    /// Properties
    pub fn property_map(&self) -> &PropertyMap {
        match self {
            Holon::Transient(h) => &h.property_map,
            Holon::Staged(h) => &h.property_map,
            Holon::Saved(h) => &h.property_map,
        }
    }

    /// Value of one property; `None` when absent or null
    pub fn property_value(&self, name: &PropertyName) -> Option<&BaseValue> {
        self.property_map().get(name).and_then(Option::as_ref)
    }

    /// Index key from the `"key"` property
    pub fn key(&self) -> Option<MapString> {
        key_of(self.property_map())
    }

    /// Current version
    pub fn version(&self) -> u64 {
        match self {
            Holon::Transient(h) => h.version,
            Holon::Staged(h) => h.version,
            Holon::Saved(h) => h.version,
        }
    }

    /// Base mutability
    pub fn holon_state(&self) -> HolonState {
        match self {
            Holon::Transient(h) => h.holon_state,
            Holon::Staged(h) => h.holon_state,
            Holon::Saved(h) => h.holon_state,
        }
    }

    /// Predecessor id
    pub fn original_id(&self) -> Option<&LocalId> {
        match self {
            Holon::Transient(h) => h.original_id.as_ref(),
            Holon::Staged(h) => h.original_id.as_ref(),
            Holon::Saved(h) => h.original_id.as_ref(),
        }
    }

    /// Staging errors (empty for non-staged holons)
    pub fn errors(&self) -> &[ErrorWithContext] {
        match self {
            Holon::Staged(h) => &h.errors,
            _ => &[],
        }
    }

    /// Borrow as transient
    pub fn as_transient(&self) -> Option<&TransientHolon> {
        match self {
            Holon::Transient(h) => Some(h),
            _ => None,
        }
    }

    /// Borrow as staged
    pub fn as_staged(&self) -> Option<&StagedHolon> {
        match self {
            Holon::Staged(h) => Some(h),
            _ => None,
        }
    }

    /// Mutably borrow as staged
    pub fn as_staged_mut(&mut self) -> Option<&mut StagedHolon> {
        match self {
            Holon::Staged(h) => Some(h),
            _ => None,
        }
    }

    /// Borrow as saved
    pub fn as_saved(&self) -> Option<&SavedHolon> {
        match self {
            Holon::Saved(h) => Some(h),
            _ => None,
        }
    }

    /// Stage a transient holon; any other variant is an invalid transition
    pub fn stage(self) -> Result<StagedHolon> {
        match self {
            Holon::Transient(h) => h.stage(),
            other => Err(HolonError::InvalidTransition(format!(
                "cannot stage a holon in {}",
                other.state_label()
            ))),
        }
    }

    /// Copy into a new, independent transient holon
    ///
    /// The clone has no predecessor; use [`SavedHolon::new_version`] for lineage.
    pub fn clone_holon(&self) -> Result<TransientHolon> {
        self.is_accessible_or_err(AccessType::Clone)?;
        let mut clone = TransientHolon::new(self.property_map().clone());
        match self {
            Holon::Transient(h) => clone.relationships = h.relationships.clone(),
            Holon::Staged(h) => clone.relationships = h.relationships.clone(),
            Holon::Saved(_) => {}
        }
        for collection in clone.relationships.values_mut() {
            collection.state = CollectionState::Pending;
        }
        Ok(clone)
    }

    /// One-line description for logs
    pub fn summarize(&self) -> String {
        let key = self
            .key()
            .map(|k| k.0)
            .unwrap_or_else(|| "<none>".to_string());
        format!(
            "Holon {{ {}, key: {}, version: {}, properties: {} }}",
            self.state_label(),
            key,
            self.version(),
            self.property_map().len()
        )
    }
}

impl From<TransientHolon> for Holon {
    fn from(h: TransientHolon) -> Self {
        Holon::Transient(h)
    }
}

impl From<StagedHolon> for Holon {
    fn from(h: StagedHolon) -> Self {
        Holon::Staged(h)
    }
}

impl From<SavedHolon> for Holon {
    fn from(h: SavedHolon) -> Self {
        Holon::Saved(h)
    }
}
