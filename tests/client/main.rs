//! Client Test Suite
//!
//! End-to-end tests of the client facade against the in-memory dance server.
//! Every dance goes through the full build → transport → reconcile path.
//!
//! ## Key Verification Points
//!
//! 1. Lifecycle scenarios: stage, update, abandon, commit
//! 2. Failure isolation: rejected, timed-out and cancelled dances leave the
//!    pools untouched
//! 3. Serialization of concurrent dances
//! 4. Reads: idempotence, echo round-trip, placeholders
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test client
//!
//! # With logs
//! RUST_LOG=debug cargo test --test client -- --nocapture
//! ```

use std::sync::Arc;
use std::time::Duration;

use holons_client::{ClientBuilder, ClientConfig, HolonsClient, JsonTransport, SessionState};
use holons_executor::testing::InMemoryDanceServer;

// Test modules
pub mod concurrency;
pub mod failures;
pub mod reads;
pub mod relationships;
pub mod scenarios;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Client over a shared in-memory server
pub type TestClient = HolonsClient<Arc<InMemoryDanceServer>>;

/// Install a test log writer once; honours `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Create a client and the server it talks to
pub fn create_client() -> (TestClient, Arc<InMemoryDanceServer>) {
    create_client_with(ClientConfig::default())
}

/// Create a client with an explicit timeout
pub fn create_client_with_timeout(timeout: Duration) -> (TestClient, Arc<InMemoryDanceServer>) {
    create_client_with(ClientConfig {
        timeout_ms: timeout.as_millis() as u64,
        ..Default::default()
    })
}

fn create_client_with(config: ClientConfig) -> (TestClient, Arc<InMemoryDanceServer>) {
    init_tracing();
    let server = Arc::new(InMemoryDanceServer::default());
    let client = HolonsClient::new(server.clone(), config).expect("valid test config");
    (client, server)
}

/// Create a client that speaks JSON to the server
pub fn create_json_client() -> (
    HolonsClient<JsonTransport<Arc<InMemoryDanceServer>>>,
    Arc<InMemoryDanceServer>,
) {
    init_tracing();
    let server = Arc::new(InMemoryDanceServer::default());
    let client = ClientBuilder::new()
        .build(JsonTransport::new(server.clone()))
        .expect("valid test config");
    (client, server)
}

/// Encoded pools, for byte-level comparisons
pub fn pool_bytes(state: &SessionState) -> (String, String) {
    (
        serde_json::to_string(&state.transient_holons).expect("pool encodes"),
        serde_json::to_string(&state.staged_holons).expect("pool encodes"),
    )
}
