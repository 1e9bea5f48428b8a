//! Failure isolation: nothing but a successful snapshot changes the pools.

use crate::{create_client, create_client_with_timeout, pool_bytes};
use holons_client::holons_core::HolonError;
use holons_client::{
    properties, Error, HolonId, LocalId, PropertyMap, ResponseStatusCode, SessionEvent,
    TransientHolon,
};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_server_error_leaves_pools_byte_identical() {
    let (client, server) = create_client();
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();
    client.new_holon(properties([("key", "loose")])).await.unwrap();
    let before = pool_bytes(&client.session());

    server.fail_next(HolonError::Misc("backend fault".into()));
    let err = client.commit().await.unwrap_err();

    match err {
        Error::Server {
            status,
            description,
        } => {
            assert_eq!(status, ResponseStatusCode::ServerError);
            assert!(description.contains("backend fault"));
        }
        other => panic!("expected Server error, got {:?}", other),
    }
    assert_eq!(pool_bytes(&client.session()), before);
    assert!(client.committed_holons().is_empty());
    assert!(server.saved().is_empty());
}

#[tokio::test]
async fn test_rejection_emits_event() {
    let (client, server) = create_client();
    let mut events = client.subscribe();

    server.fail_next(HolonError::ServiceNotAvailable("maintenance".into()));
    let err = client.get_all_holons().await.unwrap_err();

    assert!(err.is_retryable());
    assert!(matches!(
        events.try_recv().unwrap(),
        SessionEvent::Rejected {
            status: ResponseStatusCode::ServiceUnavailable,
            ..
        }
    ));
}

#[tokio::test]
async fn test_not_found_surfaces_as_not_found() {
    let (client, _server) = create_client();
    let err = client
        .get_holon_by_id(HolonId::Local(LocalId(vec![0xAB])))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_local_guards_never_reach_server() {
    let (client, server) = create_client();
    let staged = client
        .stage_new_holon(TransientHolon::new(properties([("key", "x")])))
        .await
        .unwrap();
    client.abandon_staged_changes(staged.clone()).await.unwrap();
    let calls = server.call_count();

    let write = client
        .with_properties(staged.clone(), PropertyMap::new())
        .await
        .unwrap_err();
    let abandon = client.abandon_staged_changes(staged.clone()).await.unwrap_err();
    let commit = client.commit_one(staged).await.unwrap_err();

    assert!(matches!(write, Error::NotAccessible(_)));
    assert!(abandon.is_conflict());
    assert!(matches!(commit, Error::InvalidTransition(_)));
    assert_eq!(server.call_count(), calls);
}

#[tokio::test]
async fn test_empty_inputs_rejected_locally() {
    let (client, server) = create_client();
    let staged = client
        .stage_new_holon(TransientHolon::new(PropertyMap::new()))
        .await
        .unwrap();
    let calls = server.call_count();

    let err = client
        .add_related_holons(staged, "".into(), Vec::new())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::InvalidParameter(_)));
    assert_eq!(server.call_count(), calls);
}

#[tokio::test]
async fn test_timeout_is_distinct_and_harmless() {
    let (client, server) = create_client_with_timeout(Duration::from_millis(25));
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();
    let before = client.session();
    server.set_delay(Some(Duration::from_millis(300)));

    let err = client.commit().await.unwrap_err();

    assert!(err.is_timeout());
    assert!(err.outcome_unknown());
    assert!(Arc::ptr_eq(&before, &client.session()));
    assert!(client.committed_holons().is_empty());
}

#[tokio::test]
async fn test_cancelled_dance_is_discarded() {
    let (client, server) = create_client();
    let client = Arc::new(client);
    server.set_delay(Some(Duration::from_millis(100)));

    let pending = {
        let client = client.clone();
        tokio::spawn(async move {
            client
                .stage_new_holon(TransientHolon::new(properties([("key", "late")])))
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(client.cancel_in_flight().is_some());

    let err = pending.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Cancelled { .. }));
    assert!(err.outcome_unknown());
    assert!(client.session().staged_holons.is_empty());

    server.set_delay(None);
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "next")])))
        .await
        .unwrap();
    assert_eq!(client.session().staged_holons.len(), 1);
    assert_eq!(client.cancel_in_flight(), None);
}
