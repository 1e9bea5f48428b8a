//! Test doubles for the transport seam
//!
//! - [`InMemoryDanceServer`]: a small dance server that runs every catalog
//!   dance against the session snapshot carried by the request and keeps
//!   committed holons in memory.
//! - [`ScriptedTransport`]: replays queued responses and records requests.
//!
//! Both record what they receive so tests can assert on the traffic.

use crate::error::{Error, Result};
use crate::transport::{JsonChannel, Transport};
use async_trait::async_trait;
use holons_core::{
    key_of, versioned_key, BaseValue, Holon, HolonCollection, HolonError, HolonId, HolonReference,
    LocalId, MapString, NodeCollection, PropertyMap, PropertyName, SavedHolon, SessionState,
    SmartReference, SpaceId, StagedHolon, StagedReference, TemporaryId, TransientHolon,
    CollectionState, KEY_PROPERTY,
};
use holons_wire::{
    decode_request, encode_response, ContentSet, DanceRequest, DanceResponse, DanceType,
    RequestBody, ResponseBody,
};
use parking_lot::Mutex;
use std::collections::{BTreeMap, VecDeque};
use std::time::Duration;

type DanceResult<T> = std::result::Result<T, HolonError>;

// =============================================================================
// In-memory dance server
// =============================================================================

#[derive(Debug, Default)]
struct ServerState {
    saved: BTreeMap<LocalId, SavedHolon>,
    next_id: u64,
    fail_next: Option<HolonError>,
    delay: Option<Duration>,
    embed_properties: bool,
    requests: Vec<DanceRequest>,
}

/// In-memory dance server
///
/// Each request is answered from the session snapshot it carries: the server
/// applies the dance to a copy and returns that copy as the authoritative
/// snapshot. A failing dance returns no snapshot and persists nothing.
#[derive(Debug)]
pub struct InMemoryDanceServer {
    space: SpaceId,
    inner: Mutex<ServerState>,
}

impl Default for InMemoryDanceServer {
    fn default() -> Self {
        Self::new(SpaceId::from("local"))
    }
}

impl InMemoryDanceServer {
    /// Empty server answering for `space`
    pub fn new(space: SpaceId) -> Self {
        InMemoryDanceServer {
            space,
            inner: Mutex::new(ServerState {
                embed_properties: true,
                ..Default::default()
            }),
        }
    }

    /// Persist a holon directly, bypassing any session
    pub fn seed(&self, properties: PropertyMap) -> LocalId {
        let mut inner = self.inner.lock();
        let id = inner.allocate();
        inner
            .saved
            .insert(id.clone(), SavedHolon::new(id.clone(), properties, None, 1));
        id
    }

    /// Answer the next request with `error` instead of running it
    pub fn fail_next(&self, error: HolonError) {
        self.inner.lock().fail_next = Some(error);
    }

    /// Delay every response by `delay`
    pub fn set_delay(&self, delay: Option<Duration>) {
        self.inner.lock().delay = delay;
    }

    /// Whether smart references in collections carry property values
    ///
    /// With this off, readers only get ids back and must fetch content.
    pub fn embed_properties(&self, embed: bool) {
        self.inner.lock().embed_properties = embed;
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<DanceRequest> {
        self.inner.lock().requests.clone()
    }

    /// Number of requests received
    pub fn call_count(&self) -> usize {
        self.inner.lock().requests.len()
    }

    /// Check if a dance with `name` was received
    pub fn was_called(&self, name: &str) -> bool {
        self.inner
            .lock()
            .requests
            .iter()
            .any(|r| r.name.as_str() == name)
    }

    /// Persisted holons in id order
    pub fn saved(&self) -> Vec<SavedHolon> {
        self.inner.lock().saved.values().cloned().collect()
    }

    /// Run one dance and build its response
    pub fn handle(&self, request: DanceRequest) -> DanceResponse {
        let mut inner = self.inner.lock();
        if let Some(error) = inner.fail_next.take() {
            return DanceResponse::from_error(self.space.clone(), error);
        }

        let mut state = request.session_context.state.clone();
        let result = inner.dispatch(&self.space, &request, &mut state);
        match result {
            Ok(body) => DanceResponse::ok(self.space.clone(), body, state),
            Err(error) => DanceResponse::from_error(self.space.clone(), error),
        }
    }
}

#[async_trait]
impl Transport for InMemoryDanceServer {
    async fn call(&self, request: DanceRequest) -> Result<DanceResponse> {
        let delay = {
            let mut inner = self.inner.lock();
            inner.requests.push(request.clone());
            inner.delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.handle(request))
    }
}

#[async_trait]
impl JsonChannel for InMemoryDanceServer {
    async fn exchange(&self, request: String) -> Result<String> {
        let request = decode_request(&request)?;
        let response = self.call(request).await?;
        Ok(encode_response(&response)?)
    }
}

impl ServerState {
    fn allocate(&mut self) -> LocalId {
        self.next_id += 1;
        LocalId(self.next_id.to_be_bytes().to_vec())
    }

    fn dispatch(
        &mut self,
        space: &SpaceId,
        request: &DanceRequest,
        state: &mut SessionState,
    ) -> DanceResult<ResponseBody> {
        let name = request.name.as_str();
        match (name, &request.operation_kind, &request.body) {
            ("new_holon", DanceType::Standalone, RequestBody::ParameterValues(properties)) => {
                let id = TemporaryId::new();
                state
                    .transient_holons
                    .insert(id, Holon::Transient(TransientHolon::new(properties.clone())));
                Ok(ResponseBody::HolonReference(HolonReference::Transient(
                    state.transient_reference(id),
                )))
            }
            ("stage_new_holon", DanceType::Standalone, RequestBody::Holon(holon)) => {
                let staged = holon.clone().stage()?;
                Ok(stage_into(state, TemporaryId::new(), staged))
            }
            ("stage_new_holon", DanceType::Standalone, RequestBody::TransientReference(target)) => {
                state.get_transient(target)?;
                let holon = state
                    .transient_holons
                    .remove(&target.id)
                    .ok_or_else(|| HolonError::HolonNotFound(format!("transient {}", target.id)))?;
                let staged = holon.stage()?;
                Ok(stage_into(state, TemporaryId::new(), staged))
            }
            ("with_properties", DanceType::CommandMethod(target), RequestBody::ParameterValues(p)) => {
                update_staged(state, target, |h| h.update_property_map(p.clone()).map(|_| ()))
            }
            ("remove_properties", DanceType::CommandMethod(target), RequestBody::ParameterValues(p)) => {
                update_staged(state, target, |h| {
                    for name in p.keys() {
                        h.remove_property_value(name)?;
                    }
                    Ok(())
                })
            }
            (
                "add_related_holons",
                DanceType::CommandMethod(target),
                RequestBody::TargetHolons(relationship, holons),
            ) => {
                let keyed: Vec<_> = holons
                    .iter()
                    .map(|r| (r.clone(), reference_key(state, &self.saved, r)))
                    .collect();
                update_staged(state, target, |h| h.add_related_holons(relationship.clone(), keyed))
            }
            (
                "remove_related_holons",
                DanceType::CommandMethod(target),
                RequestBody::TargetHolons(relationship, holons),
            ) => update_staged(state, target, |h| h.remove_related_holons(relationship, holons)),
            ("abandon_staged_changes", DanceType::CommandMethod(target), RequestBody::None) => {
                update_staged(state, target, StagedHolon::abandon)
            }
            ("commit", DanceType::Standalone, RequestBody::None) => {
                let pending = state
                    .staged_holons
                    .iter()
                    .filter(|(_, h)| h.as_staged().is_some_and(|s| s.staged_state().is_pending()))
                    .map(|(id, _)| *id)
                    .collect::<Vec<_>>();
                self.commit(state, pending)
            }
            ("commit", DanceType::CommandMethod(target), RequestBody::None) => {
                state.get_staged(target)?;
                self.commit(state, vec![target.id])
            }
            ("get_all_holons", DanceType::Standalone, RequestBody::None) => {
                let mut collection = HolonCollection::new(CollectionState::Fetched);
                let members = self
                    .saved
                    .values()
                    .map(|saved| {
                        let reference = HolonReference::Smart(SmartReference {
                            tx_id: state.tx_id,
                            holon_id: HolonId::Local(saved.saved_id().clone()),
                            smart_property_values: self
                                .embed_properties
                                .then(|| saved.property_map().clone()),
                        });
                        (reference, None)
                    })
                    .collect();
                collection.add_references(members)?;
                Ok(ResponseBody::HolonCollection(collection))
            }
            ("get_holon_by_id", DanceType::Standalone, RequestBody::HolonId(id)) => {
                let saved = self.find_saved(id.local_id())?;
                Ok(ResponseBody::Holon(Holon::Saved(saved.clone())))
            }
            ("get_staged_holon_by_key", DanceType::Standalone, RequestBody::ParameterValues(p)) => {
                let key = key_of(p).ok_or_else(|| HolonError::EmptyField(KEY_PROPERTY.into()))?;
                let id = state
                    .staged_holons
                    .get_id_by_key(&key)
                    .ok_or_else(|| HolonError::HolonNotFound(format!("staged holon with key {}", key)))?;
                Ok(ResponseBody::HolonReference(HolonReference::Staged(
                    state.staged_reference(id),
                )))
            }
            ("stage_new_from_clone", DanceType::CloneMethod(source), RequestBody::None) => {
                source.check_tx(state.tx_id)?;
                let holon = match source {
                    HolonReference::Transient(r) => state.get_transient(r)?.clone(),
                    HolonReference::Staged(r) => state.get_staged(r)?.clone(),
                    HolonReference::Smart(r) => {
                        Holon::Saved(self.find_saved(r.holon_id.local_id())?.clone())
                    }
                };
                let staged = holon.clone_holon()?.stage()?;
                Ok(stage_into(state, TemporaryId::new(), staged))
            }
            ("stage_new_version", DanceType::NewVersionMethod(id), RequestBody::None) => {
                let saved = self.find_saved(id.local_id())?;
                let temporary_id = match key_of(saved.property_map()) {
                    Some(key) => TemporaryId::from_key(&versioned_key(&key, saved.version() + 1)),
                    None => TemporaryId::new(),
                };
                let staged = saved.new_version().stage()?;
                Ok(stage_into(state, temporary_id, staged))
            }
            ("delete_holon", DanceType::DeleteMethod(id), RequestBody::None) => {
                self.find_saved(id)?;
                self.saved.remove(id);
                Ok(ResponseBody::None)
            }
            (
                "query_relationships",
                DanceType::QueryMethod(sources),
                RequestBody::QueryExpression(query),
            ) => {
                let mut members = Vec::new();
                for source in &sources.members {
                    let holon = match source {
                        HolonReference::Transient(r) => state.get_transient(r)?,
                        HolonReference::Staged(r) => state.get_staged(r)?,
                        HolonReference::Smart(_) => continue,
                    };
                    let related = match holon {
                        Holon::Transient(h) => h.relationships().get(&query.relationship_name),
                        Holon::Staged(h) => h.relationships().get(&query.relationship_name),
                        Holon::Saved(_) => None,
                    };
                    if let Some(collection) = related {
                        members.extend(collection.members.iter().cloned());
                    }
                }
                Ok(ResponseBody::NodeCollection(NodeCollection {
                    members,
                    query_spec: Some(query.clone()),
                }))
            }
            ("load_holons", DanceType::Standalone, RequestBody::LoadHolons(content)) => {
                load_content(state, content)
            }
            (
                "new_holon" | "stage_new_holon" | "with_properties" | "remove_properties"
                | "add_related_holons" | "remove_related_holons" | "abandon_staged_changes"
                | "commit" | "get_all_holons" | "get_holon_by_id" | "get_staged_holon_by_key"
                | "stage_new_from_clone" | "stage_new_version" | "delete_holon"
                | "query_relationships" | "load_holons",
                kind,
                body,
            ) => Err(HolonError::InvalidParameter(format!(
                "{} does not accept {} with {} body in {}",
                name,
                kind.as_str(),
                body.as_str(),
                space
            ))),
            _ => Err(HolonError::NotImplemented(format!("dance {}", name))),
        }
    }

    fn find_saved(&self, id: &LocalId) -> DanceResult<&SavedHolon> {
        self.saved
            .get(id)
            .ok_or_else(|| HolonError::HolonNotFound(format!("saved holon {}", id)))
    }

    /// Commit `ids`, then drop every committed or abandoned entry from the pool
    ///
    /// Nothing is persisted unless every holon commits.
    fn commit(&mut self, state: &mut SessionState, ids: Vec<TemporaryId>) -> DanceResult<ResponseBody> {
        let mut next_id = self.next_id;
        let mut committed = Vec::with_capacity(ids.len());
        for id in &ids {
            next_id += 1;
            let saved_id = LocalId(next_id.to_be_bytes().to_vec());
            let holon = state.staged_holons.update(id, |holon| {
                let staged = holon.as_staged_mut().ok_or_else(|| {
                    HolonError::InvalidTransition("only a staged holon can be committed".into())
                })?;
                staged.commit(saved_id.clone())?;
                Ok(holon.clone())
            })?;
            committed.push(holon);
        }

        let finished = state
            .staged_holons
            .iter()
            .filter(|(_, h)| h.as_staged().is_some_and(|s| !s.staged_state().is_pending()))
            .map(|(id, _)| *id)
            .collect::<Vec<_>>();
        for id in finished {
            state.staged_holons.remove(&id);
        }

        self.next_id = next_id;
        for holon in &committed {
            if let Some(saved) = holon.as_staged().and_then(StagedHolon::to_saved) {
                self.saved.insert(saved.saved_id().clone(), saved);
            }
        }
        Ok(ResponseBody::Holons(committed))
    }
}

fn stage_into(state: &mut SessionState, id: TemporaryId, staged: StagedHolon) -> ResponseBody {
    state.staged_holons.insert(id, Holon::Staged(staged));
    ResponseBody::HolonReference(HolonReference::Staged(state.staged_reference(id)))
}

fn update_staged<F>(state: &mut SessionState, target: &StagedReference, f: F) -> DanceResult<ResponseBody>
where
    F: FnOnce(&mut StagedHolon) -> DanceResult<()>,
{
    state.get_staged(target)?;
    state.staged_holons.update(&target.id, |holon| match holon.as_staged_mut() {
        Some(staged) => f(staged),
        None => Err(HolonError::InvalidHolonReference(format!(
            "{} is not a staged holon",
            target.id
        ))),
    })?;
    Ok(ResponseBody::HolonReference(HolonReference::Staged(target.clone())))
}

fn reference_key(
    state: &SessionState,
    saved: &BTreeMap<LocalId, SavedHolon>,
    reference: &HolonReference,
) -> Option<MapString> {
    match reference {
        HolonReference::Transient(r) => state.transient_holons.get(&r.id).and_then(Holon::key),
        HolonReference::Staged(r) => state.staged_holons.get(&r.id).and_then(Holon::key),
        HolonReference::Smart(r) => match &r.smart_property_values {
            Some(properties) => key_of(properties),
            None => saved.get(r.holon_id.local_id()).and_then(|h| key_of(h.property_map())),
        },
    }
}

/// Stage every holon described in `content`
///
/// Each file is a JSON array of flat objects; strings, booleans and integers
/// become property values and `null` clears a property.
fn load_content(state: &mut SessionState, content: &ContentSet) -> DanceResult<ResponseBody> {
    let mut staged = Vec::new();
    for file in &content.files_to_load {
        let records: Vec<BTreeMap<String, serde_json::Value>> =
            serde_json::from_str(&file.raw_contents).map_err(|e| {
                HolonError::InvalidParameter(format!("{}: {}", file.filename, e))
            })?;
        for record in records {
            let mut properties = PropertyMap::new();
            for (name, value) in record {
                let value = match value {
                    serde_json::Value::Null => None,
                    serde_json::Value::Bool(b) => Some(BaseValue::BooleanValue(b)),
                    serde_json::Value::String(s) => Some(BaseValue::StringValue(s)),
                    serde_json::Value::Number(n) => match n.as_i64() {
                        Some(i) => Some(BaseValue::IntegerValue(i)),
                        None => {
                            return Err(HolonError::InvalidParameter(format!(
                                "{}: {} is not an integer",
                                file.filename, name
                            )))
                        }
                    },
                    other => {
                        return Err(HolonError::InvalidParameter(format!(
                            "{}: unsupported value for {}: {}",
                            file.filename, name, other
                        )))
                    }
                };
                properties.insert(PropertyName::from(name), value);
            }
            let id = state.staged_holons.stage_holon(TransientHolon::new(properties))?;
            if let Some(holon) = state.staged_holons.get(&id) {
                staged.push(holon.clone());
            }
        }
    }
    Ok(ResponseBody::Holons(staged))
}

// =============================================================================
// Scripted transport
// =============================================================================

/// One queued reply
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    /// Return this response
    Respond(DanceResponse),
    /// Fail delivery with a transport error
    Fail(String),
}

/// Transport that replays queued replies in order
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    replies: Mutex<VecDeque<ScriptedReply>>,
    requests: Mutex<Vec<DanceRequest>>,
}

impl ScriptedTransport {
    /// Transport with nothing queued
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a response
    pub fn with_response(self, response: DanceResponse) -> Self {
        self.replies.lock().push_back(ScriptedReply::Respond(response));
        self
    }

    /// Queue a delivery failure
    pub fn with_failure(self, reason: &str) -> Self {
        self.replies
            .lock()
            .push_back(ScriptedReply::Fail(reason.to_string()));
        self
    }

    /// Queue a reply on a shared transport
    pub fn push(&self, reply: ScriptedReply) {
        self.replies.lock().push_back(reply);
    }

    /// Requests received so far
    pub fn requests(&self) -> Vec<DanceRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn call(&self, request: DanceRequest) -> Result<DanceResponse> {
        let dance = request.name.0.clone();
        self.requests.lock().push(request);
        match self.replies.lock().pop_front() {
            Some(ScriptedReply::Respond(response)) => Ok(response),
            Some(ScriptedReply::Fail(reason)) => Err(Error::Transport { reason }),
            None => Err(Error::Transport {
                reason: format!("no scripted reply for {}", dance),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::DanceBuilder;
    use holons_core::{properties, StagedState, TxId};
    use holons_wire::{FileData, ResponseStatusCode};

    fn space() -> SpaceId {
        SpaceId::from("local")
    }

    fn run(server: &InMemoryDanceServer, request: DanceRequest) -> (DanceResponse, SessionState) {
        let response = server.handle(request);
        let state = response.session_snapshot.clone().unwrap_or_default();
        (response, state)
    }

    #[test]
    fn test_stage_then_commit_persists() {
        let server = InMemoryDanceServer::default();
        let space = space();
        let state = SessionState::new(TxId(1));

        let request = DanceBuilder::new(&state, &space)
            .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
            .unwrap();
        let (response, state) = run(&server, request);
        assert_eq!(response.status_code, ResponseStatusCode::OK);
        assert_eq!(state.staged_holons.len(), 1);

        let request = DanceBuilder::new(&state, &space).commit().unwrap();
        let (response, state) = run(&server, request);
        assert!(state.staged_holons.is_empty());
        match response.body {
            ResponseBody::Holons(holons) => {
                assert_eq!(holons.len(), 1);
                assert!(matches!(
                    holons[0].as_staged().map(StagedHolon::staged_state),
                    Some(StagedState::Committed(_))
                ));
            }
            other => panic!("expected Holons, got {:?}", other),
        }
        assert_eq!(server.saved().len(), 1);
    }

    #[test]
    fn test_failed_dance_returns_no_snapshot() {
        let server = InMemoryDanceServer::default();
        let space = space();
        let state = SessionState::new(TxId(1));
        let request = DanceBuilder::new(&state, &space)
            .get_holon_by_id(HolonId::Local(LocalId(vec![42])))
            .unwrap();

        let response = server.handle(request);
        assert_eq!(response.status_code, ResponseStatusCode::NotFound);
        assert!(response.session_snapshot.is_none());
    }

    #[test]
    fn test_injected_failure_is_consumed() {
        let server = InMemoryDanceServer::default();
        server.fail_next(HolonError::CommitFailure("disk full".into()));
        let space = space();
        let state = SessionState::new(TxId(1));
        let request = DanceBuilder::new(&state, &space).commit().unwrap();

        assert_eq!(server.handle(request.clone()).status_code, ResponseStatusCode::ServerError);
        assert_eq!(server.handle(request).status_code, ResponseStatusCode::OK);
    }

    #[test]
    fn test_unknown_dance_not_implemented() {
        let server = InMemoryDanceServer::default();
        let request = DanceRequest::new(
            "dance_party",
            DanceType::Standalone,
            RequestBody::None,
            space(),
            SessionState::new(TxId(1)),
        );
        assert_eq!(server.handle(request).status_code, ResponseStatusCode::NotImplemented);
    }

    #[test]
    fn test_new_version_uses_versioned_key() {
        let server = InMemoryDanceServer::default();
        let id = server.seed(properties([("key", "book")]));
        let space = space();
        let state = SessionState::new(TxId(1));

        let request = DanceBuilder::new(&state, &space)
            .stage_new_version(HolonId::Local(id.clone()))
            .unwrap();
        let (_, state) = run(&server, request);

        let expected = TemporaryId::from_key(&versioned_key(&"book".into(), 2));
        let staged = state.staged_holons.get(&expected).unwrap();
        assert_eq!(staged.original_id(), Some(&id));
        assert!(matches!(
            staged.as_staged().map(StagedHolon::staged_state),
            Some(StagedState::ForUpdate)
        ));
    }

    #[test]
    fn test_load_holons_stages_records() {
        let server = InMemoryDanceServer::default();
        let space = space();
        let state = SessionState::new(TxId(1));
        let content = ContentSet {
            schema: None,
            files_to_load: vec![FileData {
                filename: "books.json".into(),
                raw_contents: r#"[{"key": "a", "pages": 12}, {"key": "b", "draft": true}]"#.into(),
            }],
        };

        let request = DanceBuilder::new(&state, &space).load_holons(content).unwrap();
        let (response, state) = run(&server, request);
        assert_eq!(response.status_code, ResponseStatusCode::OK);
        assert_eq!(state.staged_holons.len(), 2);
        assert!(state.staged_holons.get_by_key(&"b".into()).is_some());
    }

    #[tokio::test]
    async fn test_scripted_transport_replays_in_order() {
        let state = SessionState::new(TxId(1));
        let transport = ScriptedTransport::new()
            .with_response(DanceResponse::ok(space(), ResponseBody::None, state.clone()))
            .with_failure("connection reset");
        let request = DanceBuilder::new(&state, &space()).commit().unwrap();

        assert!(transport.call(request.clone()).await.is_ok());
        assert!(matches!(
            transport.call(request.clone()).await,
            Err(Error::Transport { .. })
        ));
        assert!(transport.call(request).await.is_err());
        assert_eq!(transport.requests().len(), 3);
    }
}
