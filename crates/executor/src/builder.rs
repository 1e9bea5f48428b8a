//! Request builder
//!
//! [`DanceBuilder`] projects the current session state plus caller intent into
//! a [`DanceRequest`]. It only reads the session; requests are values.
//!
//! State-machine guards run here, before a request exists: a command against
//! a staged holon that the current pool already shows as inaccessible is
//! rejected locally with `NotAccessible`. An id that is not in the pool is not
//! checked; the server reports it as `HolonNotFound`.

use holons_core::{
    AccessType, Holon, HolonError, HolonId, HolonReference, LocalId, MapString, NodeCollection,
    PropertyMap, PropertyName, QueryExpression, RelationshipName, SessionState, SpaceId,
    StagedHolon, StagedReference, TemporaryId, TransientHolon, TransientReference, KEY_PROPERTY,
};
use holons_wire::{ContentSet, DanceRequest, DanceType, RequestBody};

type Result<T> = std::result::Result<T, HolonError>;

/// Builds dance requests against one session snapshot
#[derive(Debug, Clone, Copy)]
pub struct DanceBuilder<'a> {
    state: &'a SessionState,
    space: &'a SpaceId,
}

impl<'a> DanceBuilder<'a> {
    /// Builder over `state` in `space`
    pub fn new(state: &'a SessionState, space: &'a SpaceId) -> Self {
        DanceBuilder { state, space }
    }

    fn request(&self, name: &str, kind: DanceType, body: RequestBody) -> DanceRequest {
        let request = DanceRequest::new(name, kind, body, self.space.clone(), self.state.clone());
        tracing::debug!(request = %request.summarize(), "built dance request");
        request
    }

    /// Reject access to a staged holon the current pool shows as inaccessible
    pub fn check_staged_access(&self, target: &StagedReference, access: AccessType) -> Result<()> {
        HolonReference::Staged(target.clone()).check_tx(self.state.tx_id)?;
        match self.state.staged_holons.get(&target.id) {
            Some(holon) => holon.is_accessible_or_err(access),
            None => Ok(()),
        }
    }

    fn pooled_staged(&self, target: &StagedReference) -> Result<Option<&'a StagedHolon>> {
        HolonReference::Staged(target.clone()).check_tx(self.state.tx_id)?;
        Ok(self
            .state
            .staged_holons
            .get(&target.id)
            .and_then(Holon::as_staged))
    }

    fn command(
        &self,
        name: &str,
        target: StagedReference,
        access: AccessType,
        body: RequestBody,
    ) -> Result<DanceRequest> {
        self.check_staged_access(&target, access)?;
        Ok(self.request(name, DanceType::CommandMethod(target), body))
    }

    /// Create a transient holon from property values
    pub fn new_holon(&self, properties: PropertyMap) -> Result<DanceRequest> {
        Ok(self.request(
            "new_holon",
            DanceType::Standalone,
            RequestBody::ParameterValues(properties),
        ))
    }

    /// Stage a full transient holon
    pub fn stage_new_holon(&self, holon: TransientHolon) -> Result<DanceRequest> {
        if !holon.is_accessible(AccessType::Write) {
            return Err(HolonError::InvalidTransition(
                "only a mutable transient holon can be staged".into(),
            ));
        }
        Ok(self.request(
            "stage_new_holon",
            DanceType::Standalone,
            RequestBody::Holon(Holon::Transient(holon)),
        ))
    }

    /// Stage a member of the transient pool
    pub fn stage_transient(&self, target: TransientReference) -> Result<DanceRequest> {
        HolonReference::Transient(target.clone()).check_tx(self.state.tx_id)?;
        if let Some(holon) = self.state.transient_holons.get(&target.id) {
            if !holon.is_accessible(AccessType::Write) {
                return Err(HolonError::InvalidTransition(
                    "only a mutable transient holon can be staged".into(),
                ));
            }
        }
        Ok(self.request(
            "stage_new_holon",
            DanceType::Standalone,
            RequestBody::TransientReference(target),
        ))
    }

    /// Merge property values into a staged holon
    pub fn with_properties(
        &self,
        target: StagedReference,
        properties: PropertyMap,
    ) -> Result<DanceRequest> {
        self.command(
            "with_properties",
            target,
            AccessType::Write,
            RequestBody::ParameterValues(properties),
        )
    }

    /// Remove properties from a staged holon
    pub fn remove_properties(
        &self,
        target: StagedReference,
        names: Vec<PropertyName>,
    ) -> Result<DanceRequest> {
        let properties = names.into_iter().map(|name| (name, None)).collect();
        self.command(
            "remove_properties",
            target,
            AccessType::Write,
            RequestBody::ParameterValues(properties),
        )
    }

    /// Add related holons to a staged holon
    pub fn add_related_holons(
        &self,
        target: StagedReference,
        relationship: RelationshipName,
        holons: Vec<HolonReference>,
    ) -> Result<DanceRequest> {
        if relationship.as_str().is_empty() {
            return Err(HolonError::EmptyField("relationship_name".into()));
        }
        self.command(
            "add_related_holons",
            target,
            AccessType::Write,
            RequestBody::TargetHolons(relationship, holons),
        )
    }

    /// Remove related holons from a staged holon
    pub fn remove_related_holons(
        &self,
        target: StagedReference,
        relationship: RelationshipName,
        holons: Vec<HolonReference>,
    ) -> Result<DanceRequest> {
        if relationship.as_str().is_empty() {
            return Err(HolonError::EmptyField("relationship_name".into()));
        }
        self.command(
            "remove_related_holons",
            target,
            AccessType::Write,
            RequestBody::TargetHolons(relationship, holons),
        )
    }

    /// Abandon a staged holon
    ///
    /// A holon the pool already shows as abandoned or committed is refused
    /// with `DeletionNotAllowed`, as the state machine would.
    pub fn abandon_staged_changes(&self, target: StagedReference) -> Result<DanceRequest> {
        if let Some(staged) = self.pooled_staged(&target)? {
            staged.clone().abandon()?;
        }
        Ok(self.request(
            "abandon_staged_changes",
            DanceType::CommandMethod(target),
            RequestBody::None,
        ))
    }

    /// Commit every pending staged holon
    pub fn commit(&self) -> Result<DanceRequest> {
        Ok(self.request("commit", DanceType::Standalone, RequestBody::None))
    }

    /// Commit one staged holon
    pub fn commit_one(&self, target: StagedReference) -> Result<DanceRequest> {
        if let Some(staged) = self.pooled_staged(&target)? {
            if !staged.staged_state().is_pending() {
                return Err(HolonError::InvalidTransition(format!(
                    "cannot commit a holon in Staged({})",
                    staged.staged_state().as_str()
                )));
            }
        }
        Ok(self.request("commit", DanceType::CommandMethod(target), RequestBody::None))
    }

    /// Fetch every persisted holon
    pub fn get_all_holons(&self) -> Result<DanceRequest> {
        Ok(self.request("get_all_holons", DanceType::Standalone, RequestBody::None))
    }

    /// Fetch one persisted holon
    pub fn get_holon_by_id(&self, id: HolonId) -> Result<DanceRequest> {
        Ok(self.request(
            "get_holon_by_id",
            DanceType::Standalone,
            RequestBody::HolonId(id),
        ))
    }

    /// Find a staged holon by key on the server
    pub fn get_staged_holon_by_key(&self, key: MapString) -> Result<DanceRequest> {
        if key.as_str().is_empty() {
            return Err(HolonError::EmptyField(KEY_PROPERTY.into()));
        }
        let mut properties = PropertyMap::new();
        properties.insert(KEY_PROPERTY.into(), Some(key.0.into()));
        Ok(self.request(
            "get_staged_holon_by_key",
            DanceType::Standalone,
            RequestBody::ParameterValues(properties),
        ))
    }

    /// Stage an independent copy of `source`
    pub fn stage_new_from_clone(&self, source: HolonReference) -> Result<DanceRequest> {
        source.check_tx(self.state.tx_id)?;
        let local = match &source {
            HolonReference::Staged(r) => self.state.staged_holons.get(&r.id),
            HolonReference::Transient(r) => self.state.transient_holons.get(&r.id),
            HolonReference::Smart(_) => None,
        };
        if let Some(holon) = local {
            holon.is_accessible_or_err(AccessType::Clone)?;
        }
        Ok(self.request(
            "stage_new_from_clone",
            DanceType::CloneMethod(source),
            RequestBody::None,
        ))
    }

    /// Stage a successor of a persisted holon
    pub fn stage_new_version(&self, id: HolonId) -> Result<DanceRequest> {
        Ok(self.request(
            "stage_new_version",
            DanceType::NewVersionMethod(id),
            RequestBody::None,
        ))
    }

    /// Delete a persisted holon
    pub fn delete_holon(&self, id: LocalId) -> Result<DanceRequest> {
        Ok(self.request("delete_holon", DanceType::DeleteMethod(id), RequestBody::None))
    }

    /// Follow `relationship` from each source node
    pub fn query_relationships(
        &self,
        sources: NodeCollection,
        relationship: RelationshipName,
    ) -> Result<DanceRequest> {
        if relationship.as_str().is_empty() {
            return Err(HolonError::EmptyField("relationship_name".into()));
        }
        Ok(self.request(
            "query_relationships",
            DanceType::QueryMethod(sources),
            RequestBody::QueryExpression(QueryExpression {
                relationship_name: relationship,
            }),
        ))
    }

    /// Bulk-load holon content
    pub fn load_holons(&self, content: ContentSet) -> Result<DanceRequest> {
        if content.files_to_load.is_empty() {
            return Err(HolonError::EmptyField("files_to_load".into()));
        }
        Ok(self.request(
            "load_holons",
            DanceType::Standalone,
            RequestBody::LoadHolons(content),
        ))
    }

    /// Staged reference for a pool id in this session
    pub fn staged_reference(&self, id: TemporaryId) -> StagedReference {
        self.state.staged_reference(id)
    }
}
