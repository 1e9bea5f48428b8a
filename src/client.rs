//! Client facade
//!
//! [`HolonsClient`] wraps the [`Executor`] with one typed method per dance.
//! Each method:
//!
//! 1. Builds the dance against the current session pools
//! 2. Runs it through the executor (transport, reconcile)
//! 3. Extracts the typed result from the response body
//! 4. Swaps in the new pools only if extraction succeeded
//!
//! Committed holons are accumulated across calls and available from
//! [`HolonsClient::committed_holons`].

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use holons_core::{
    Holon, HolonError, HolonId, HolonReference, LocalId, MapString, NodeCollection, PropertyMap,
    PropertyName, RelationshipName, SavedHolon, SessionState, SpaceId, StagedReference,
    TransientHolon, TransientReference, TxId,
};
use holons_executor::{DanceBuilder, Executor, Reconciliation, Session, SessionEvent, Transport};
use holons_wire::{ContentSet, DanceRequest, ResponseBody};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;

/// Persisted holons returned by a read
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FetchedHolons {
    /// Holons in response order, placeholders included
    pub holons: Vec<SavedHolon>,
    /// Ids whose content was not returned
    pub placeholders: Vec<LocalId>,
}

impl FetchedHolons {
    /// Check if every holon carries its content
    pub fn is_complete(&self) -> bool {
        self.placeholders.is_empty()
    }
}

/// Client session over a holon space
///
/// Dances are serialized: concurrent calls queue behind the one in flight.
/// Reads of [`session`](Self::session) never wait.
///
/// # Example
///
/// ```ignore
/// use holons_client::prelude::*;
///
/// let client = ClientBuilder::new().space("local").build(transport)?;
///
/// let book = client
///     .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
///     .await?;
/// client.with_properties(book, properties([("title", "Holons")])).await?;
/// let saved = client.commit().await?;
/// ```
pub struct HolonsClient<T> {
    executor: Executor<T>,
    config: ClientConfig,
    committed: Mutex<Vec<SavedHolon>>,
}

impl<T: Transport> HolonsClient<T> {
    /// Create a client with `config` over `transport`
    pub fn new(transport: T, config: ClientConfig) -> Result<Self> {
        ClientBuilder::new().config(config).build(transport)
    }

    /// Configuration the client was built with
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the underlying executor
    pub fn executor(&self) -> &Executor<T> {
        &self.executor
    }

    /// Transaction id
    pub fn tx_id(&self) -> TxId {
        self.executor.session().tx_id()
    }

    /// Space every dance targets
    pub fn space(&self) -> &SpaceId {
        self.executor.session().space()
    }

    /// Current session pools
    pub fn session(&self) -> Arc<SessionState> {
        self.executor.session().snapshot()
    }

    /// Subscribe to session events
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.executor.session().subscribe()
    }

    /// Discard the response of the dance in flight, if any
    ///
    /// Returns the cancelled sequence number, or `None` if nothing was in flight.
    pub fn cancel_in_flight(&self) -> Option<u64> {
        self.executor.session().cancel_in_flight()
    }

    /// Every holon committed through this client, in commit order
    pub fn committed_holons(&self) -> Vec<SavedHolon> {
        self.committed.lock().clone()
    }

    /// Staged holon currently indexed under `key`, looked up locally
    pub fn find_staged_by_key(&self, key: &MapString) -> Option<StagedReference> {
        let session = self.session();
        session
            .staged_holons
            .get_id_by_key(key)
            .map(|id| session.staged_reference(id))
    }

    /// Staged holon behind `reference`, looked up locally
    pub fn get_staged(&self, reference: &StagedReference) -> Result<Holon> {
        Ok(self.session().get_staged(reference)?.clone())
    }

    /// Transient holon behind `reference`, looked up locally
    pub fn get_transient(&self, reference: &TransientReference) -> Result<Holon> {
        Ok(self.session().get_transient(reference)?.clone())
    }

    /// Run any dance and return the raw reconciliation
    ///
    /// Committed holons it reports are added to [`committed_holons`](Self::committed_holons).
    pub async fn dance<F>(&self, build: F) -> Result<Reconciliation>
    where
        F: FnOnce(DanceBuilder<'_>) -> std::result::Result<DanceRequest, HolonError>,
    {
        self.dance_with(build, |r| Some(r.clone())).await
    }

    /// Run a dance and extract a typed result before the pools are swapped
    ///
    /// A response whose shape `extract` rejects fails with
    /// [`Error::Internal`] and leaves the session untouched.
    async fn dance_with<F, X, R>(&self, build: F, extract: X) -> Result<R>
    where
        F: FnOnce(DanceBuilder<'_>) -> std::result::Result<DanceRequest, HolonError>,
        X: FnOnce(&Reconciliation) -> Option<R>,
    {
        let (reconciliation, extracted) = self.executor.execute_with(build, extract).await?;
        if !reconciliation.committed.is_empty() {
            self.committed
                .lock()
                .extend(reconciliation.committed.iter().cloned());
        }
        Ok(extracted)
    }

    // =========================================================================
    // Transient and staged holons
    // =========================================================================

    /// Create a transient holon on the server.
    pub async fn new_holon(&self, properties: PropertyMap) -> Result<TransientReference> {
        self.dance_with(|b| b.new_holon(properties), |r| match &r.body {
            ResponseBody::HolonReference(HolonReference::Transient(reference)) => {
                Some(reference.clone())
            }
            _ => None,
        })
        .await
    }

    /// Stage a transient holon for commit.
    pub async fn stage_new_holon(&self, holon: TransientHolon) -> Result<StagedReference> {
        self.dance_with(|b| b.stage_new_holon(holon), staged_reference)
            .await
    }

    /// Stage a member of the transient pool.
    pub async fn stage_transient(&self, holon: TransientReference) -> Result<StagedReference> {
        self.dance_with(|b| b.stage_transient(holon), staged_reference)
            .await
    }

    /// Merge property values into a staged holon.
    pub async fn with_properties(
        &self,
        target: StagedReference,
        properties: PropertyMap,
    ) -> Result<()> {
        self.dance(|b| b.with_properties(target, properties)).await?;
        Ok(())
    }

    /// Remove properties from a staged holon.
    pub async fn remove_properties(
        &self,
        target: StagedReference,
        names: Vec<PropertyName>,
    ) -> Result<()> {
        self.dance(|b| b.remove_properties(target, names)).await?;
        Ok(())
    }

    /// Relate `holons` to a staged holon.
    pub async fn add_related_holons(
        &self,
        target: StagedReference,
        relationship: RelationshipName,
        holons: Vec<HolonReference>,
    ) -> Result<()> {
        self.dance(|b| b.add_related_holons(target, relationship, holons))
            .await?;
        Ok(())
    }

    /// Unrelate `holons` from a staged holon.
    pub async fn remove_related_holons(
        &self,
        target: StagedReference,
        relationship: RelationshipName,
        holons: Vec<HolonReference>,
    ) -> Result<()> {
        self.dance(|b| b.remove_related_holons(target, relationship, holons))
            .await?;
        Ok(())
    }

    /// Abandon a staged holon.
    pub async fn abandon_staged_changes(&self, target: StagedReference) -> Result<()> {
        self.dance(|b| b.abandon_staged_changes(target)).await?;
        Ok(())
    }

    /// Stage an independent copy of `source`.
    pub async fn stage_new_from_clone(&self, source: HolonReference) -> Result<StagedReference> {
        self.dance_with(|b| b.stage_new_from_clone(source), staged_reference)
            .await
    }

    /// Stage a successor of a persisted holon.
    pub async fn stage_new_version(&self, id: HolonId) -> Result<StagedReference> {
        self.dance_with(|b| b.stage_new_version(id), staged_reference)
            .await
    }

    /// Find a staged holon by key on the server.
    pub async fn get_staged_holon_by_key(&self, key: MapString) -> Result<StagedReference> {
        self.dance_with(|b| b.get_staged_holon_by_key(key), staged_reference)
            .await
    }

    /// Bulk-load holon content; returns the holons staged.
    pub async fn load_holons(&self, content: ContentSet) -> Result<Vec<Holon>> {
        self.dance_with(|b| b.load_holons(content), |r| match &r.body {
            ResponseBody::Holons(holons) => Some(holons.clone()),
            _ => None,
        })
        .await
    }

    // =========================================================================
    // Commit
    // =========================================================================

    /// Commit every pending staged holon.
    ///
    /// Returns the holons this call persisted.
    pub async fn commit(&self) -> Result<Vec<SavedHolon>> {
        self.dance_with(|b| b.commit(), |r| Some(r.committed.clone()))
            .await
    }

    /// Commit one staged holon.
    pub async fn commit_one(&self, target: StagedReference) -> Result<SavedHolon> {
        self.dance_with(|b| b.commit_one(target), |r| r.committed.first().cloned())
            .await
    }

    // =========================================================================
    // Persisted holons
    // =========================================================================

    /// Read every persisted holon.
    ///
    /// Members the server returned without content are placeholders; see
    /// [`refresh_placeholders`](Self::refresh_placeholders).
    pub async fn get_all_holons(&self) -> Result<FetchedHolons> {
        self.dance_with(|b| b.get_all_holons(), |r| match &r.body {
            ResponseBody::HolonCollection(_) => Some(FetchedHolons {
                holons: r.fetched.clone(),
                placeholders: r.placeholders.clone(),
            }),
            _ => None,
        })
        .await
    }

    /// Read one persisted holon.
    pub async fn get_holon_by_id(&self, id: HolonId) -> Result<SavedHolon> {
        self.dance_with(|b| b.get_holon_by_id(id), |r| r.fetched.first().cloned())
            .await
    }

    /// Replace every placeholder in `fetched` with its content
    ///
    /// Issues one `get_holon_by_id` per placeholder. Stops at the first
    /// failure; already-fetched holons are not re-read.
    pub async fn refresh_placeholders(&self, fetched: FetchedHolons) -> Result<FetchedHolons> {
        let FetchedHolons {
            mut holons,
            placeholders,
        } = fetched;
        for id in placeholders {
            let holon = self.get_holon_by_id(HolonId::Local(id.clone())).await?;
            for slot in holons.iter_mut().filter(|h| h.saved_id() == &id) {
                *slot = holon.clone();
            }
        }
        tracing::debug!(holons = holons.len(), "placeholders refreshed");
        Ok(FetchedHolons {
            holons,
            placeholders: Vec::new(),
        })
    }

    /// Delete a persisted holon.
    pub async fn delete_holon(&self, id: LocalId) -> Result<()> {
        self.dance(|b| b.delete_holon(id)).await?;
        Ok(())
    }

    /// Follow `relationship` from each source node.
    pub async fn query_relationships(
        &self,
        sources: NodeCollection,
        relationship: RelationshipName,
    ) -> Result<NodeCollection> {
        self.dance_with(
            |b| b.query_relationships(sources, relationship),
            |r| match &r.body {
                ResponseBody::NodeCollection(nodes) => Some(nodes.clone()),
                _ => None,
            },
        )
        .await
    }
}

fn staged_reference(reconciliation: &Reconciliation) -> Option<StagedReference> {
    match &reconciliation.body {
        ResponseBody::HolonReference(HolonReference::Staged(reference)) => Some(reference.clone()),
        _ => None,
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Builder for client configuration.
///
/// # Example
///
/// ```ignore
/// let client = ClientBuilder::new()
///     .space("local")
///     .tx_id(7)
///     .timeout(Duration::from_secs(5))
///     .build(transport)?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ClientBuilder {
    config: ClientConfig,
    state: Option<SessionState>,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace every setting with `config`.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the space every dance targets.
    pub fn space(mut self, space: impl Into<String>) -> Self {
        self.config.space_id = space.into();
        self
    }

    /// Set the transaction id.
    pub fn tx_id(mut self, tx_id: u64) -> Self {
        self.config.tx_id = tx_id;
        self
    }

    /// Set the bound on a single remote call.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout_ms = timeout.as_millis() as u64;
        self
    }

    /// Set the event channel capacity.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.config.event_capacity = capacity;
        self
    }

    /// Resume from existing pools.
    ///
    /// The pools must belong to the configured transaction.
    pub fn state(mut self, state: SessionState) -> Self {
        self.state = Some(state);
        self
    }

    /// Build the client over `transport`.
    pub fn build<T: Transport>(self, transport: T) -> Result<HolonsClient<T>> {
        self.config.validate()?;
        let state = match self.state {
            Some(state) if state.tx_id != self.config.tx() => {
                return Err(Error::Config(format!(
                    "initial state belongs to {}, not {}",
                    state.tx_id,
                    self.config.tx()
                )))
            }
            Some(state) => {
                state.check_invariants()?;
                state
            }
            None => SessionState::new(self.config.tx()),
        };

        let session = Session::with_state(state, self.config.space(), self.config.event_capacity);
        tracing::info!(
            space = %self.config.space_id,
            tx = %self.config.tx(),
            timeout_ms = self.config.timeout_ms,
            "holons client ready"
        );
        Ok(HolonsClient {
            executor: Executor::with_timeout(transport, Arc::new(session), self.config.timeout()),
            config: self.config,
            committed: Mutex::new(Vec::new()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use holons_executor::testing::ScriptedTransport;
    use holons_wire::DanceResponse;

    #[test]
    fn test_builder_applies_settings() {
        let client = ClientBuilder::new()
            .space("remote")
            .tx_id(4)
            .timeout(Duration::from_millis(250))
            .event_capacity(8)
            .build(ScriptedTransport::new())
            .unwrap();

        assert_eq!(client.space(), &SpaceId::from("remote"));
        assert_eq!(client.tx_id(), TxId(4));
        assert_eq!(client.executor().timeout(), Duration::from_millis(250));
        assert_eq!(client.config().event_capacity, 8);
    }

    #[test]
    fn test_builder_rejects_foreign_state() {
        let result = ClientBuilder::new()
            .tx_id(1)
            .state(SessionState::new(TxId(2)))
            .build(ScriptedTransport::new());
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_unexpected_body_leaves_session_untouched() {
        let mut state = SessionState::new(TxId(1));
        state
            .staged_holons
            .stage_holon(TransientHolon::new(holons_core::properties([("key", "echo")])))
            .unwrap();
        let transport = ScriptedTransport::new().with_response(DanceResponse::ok(
            SpaceId::from("local"),
            ResponseBody::None,
            state,
        ));
        let client = ClientBuilder::new().build(transport).unwrap();
        let before = client.session();

        let err = client
            .stage_new_holon(TransientHolon::new(PropertyMap::new()))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Internal(_)));
        assert!(Arc::ptr_eq(&before, &client.session()));
        assert!(client.session().staged_holons.is_empty());
    }

    #[tokio::test]
    async fn test_commit_one_without_committed_holon_accumulates_nothing() {
        let mut state = SessionState::new(TxId(1));
        let target = state
            .staged_holons
            .stage_holon(TransientHolon::new(holons_core::properties([("key", "a")])))
            .unwrap();
        let reference = state.staged_reference(target);
        let transport = ScriptedTransport::new().with_response(DanceResponse::ok(
            SpaceId::from("local"),
            ResponseBody::None,
            SessionState::new(TxId(1)),
        ));
        let client = ClientBuilder::new().state(state).build(transport).unwrap();
        let before = client.session();

        let err = client.commit_one(reference).await.unwrap_err();

        assert!(matches!(err, Error::Internal(_)));
        assert_eq!(*client.session(), *before);
        assert_eq!(client.session().staged_holons.len(), 1);
        assert!(client.committed_holons().is_empty());
    }

    #[tokio::test]
    async fn test_transport_failure_maps_to_transport() {
        let client = ClientBuilder::new()
            .build(ScriptedTransport::new().with_failure("connection refused"))
            .unwrap();

        let err = client.commit().await.unwrap_err();
        assert!(matches!(err, Error::Transport(_)));
        assert!(err.is_retryable());
        assert!(client.committed_holons().is_empty());
    }
}
