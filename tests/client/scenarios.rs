//! Lifecycle scenarios: stage, update, abandon, commit.

use crate::create_client;
use holons_client::holons_core::{AccessType, StagedState};
use holons_client::{properties, HolonId, PropertyMap, TransientHolon};
use std::collections::BTreeSet;

#[tokio::test]
async fn test_empty_holon_commits_to_fresh_id() {
    let (client, server) = create_client();

    client
        .stage_new_holon(TransientHolon::new(PropertyMap::new()))
        .await
        .unwrap();
    let saved = client.commit().await.unwrap();

    assert_eq!(saved.len(), 1);
    assert!(saved[0].property_map().is_empty());
    assert!(!saved[0].saved_id().as_bytes().is_empty());
    assert_eq!(server.saved(), saved);
    assert_eq!(client.committed_holons(), saved);
}

#[tokio::test]
async fn test_update_of_new_version_marks_changed() {
    let (client, _server) = create_client();
    client
        .stage_new_holon(TransientHolon::new(properties([("title", "mybook")])))
        .await
        .unwrap();
    let original = client.commit().await.unwrap().remove(0);

    let staged = client
        .stage_new_version(HolonId::Local(original.saved_id().clone()))
        .await
        .unwrap();
    let before = client.get_staged(&staged).unwrap();
    assert_eq!(
        before.as_staged().map(|s| s.staged_state().clone()),
        Some(StagedState::ForUpdate)
    );

    client
        .with_properties(staged.clone(), properties([("description", "x")]))
        .await
        .unwrap();

    let after = client.get_staged(&staged).unwrap();
    assert_eq!(
        after.as_staged().map(|s| s.staged_state().clone()),
        Some(StagedState::ForUpdateChanged)
    );
    assert_eq!(
        after.property_map(),
        &properties([("title", "mybook"), ("description", "x")])
    );
    assert_eq!(after.original_id(), Some(original.saved_id()));
}

#[tokio::test]
async fn test_update_of_new_holon_stays_for_create() {
    let (client, _server) = create_client();
    let staged = client
        .stage_new_holon(TransientHolon::new(properties([("title", "mybook")])))
        .await
        .unwrap();

    client
        .with_properties(staged.clone(), properties([("description", "x")]))
        .await
        .unwrap();

    let holon = client.get_staged(&staged).unwrap();
    assert_eq!(
        holon.as_staged().map(|s| s.staged_state().clone()),
        Some(StagedState::ForCreate)
    );
    assert_eq!(holon.property_map().len(), 2);
}

#[tokio::test]
async fn test_abandoned_holon_is_read_only() {
    let (client, _server) = create_client();
    let staged = client
        .stage_new_holon(TransientHolon::new(properties([("key", "draft")])))
        .await
        .unwrap();

    client.abandon_staged_changes(staged.clone()).await.unwrap();

    let holon = client.get_staged(&staged).unwrap();
    assert!(!holon.is_accessible(AccessType::Write));
    assert!(holon.is_accessible(AccessType::Read));
    assert!(client.commit().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_commit_two_in_one_call() {
    let (client, _server) = create_client();
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "a")])))
        .await
        .unwrap();
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "b")])))
        .await
        .unwrap();

    let saved = client.commit().await.unwrap();

    assert_eq!(saved.len(), 2);
    let ids: BTreeSet<_> = saved.iter().map(|h| h.saved_id().clone()).collect();
    assert_eq!(ids.len(), 2);
    assert!(client.session().staged_holons.is_empty());
}

#[tokio::test]
async fn test_committed_holons_accumulate() {
    let (client, _server) = create_client();
    for key in ["a", "b", "c"] {
        client
            .stage_new_holon(TransientHolon::new(properties([("key", key)])))
            .await
            .unwrap();
        client.commit().await.unwrap();
    }

    let keys: Vec<_> = client
        .committed_holons()
        .iter()
        .map(|h| h.property_map().clone())
        .collect();
    assert_eq!(
        keys,
        vec![
            properties([("key", "a")]),
            properties([("key", "b")]),
            properties([("key", "c")])
        ]
    );
}

#[tokio::test]
async fn test_commit_one_leaves_others_staged() {
    let (client, _server) = create_client();
    let a = client
        .stage_new_holon(TransientHolon::new(properties([("key", "a")])))
        .await
        .unwrap();
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "b")])))
        .await
        .unwrap();

    let saved = client.commit_one(a).await.unwrap();

    assert_eq!(saved.property_map(), &properties([("key", "a")]));
    let session = client.session();
    assert_eq!(session.staged_holons.len(), 1);
    assert!(client.find_staged_by_key(&"b".into()).is_some());
    assert!(client.find_staged_by_key(&"a".into()).is_none());
}

#[tokio::test]
async fn test_transient_then_stage() {
    let (client, _server) = create_client();
    let transient = client
        .new_holon(properties([("key", "t")]))
        .await
        .unwrap();
    assert_eq!(client.session().transient_holons.len(), 1);

    let staged = client.stage_transient(transient).await.unwrap();

    let session = client.session();
    assert!(session.transient_holons.is_empty());
    assert_eq!(session.staged_holons.get_id_by_key(&"t".into()), Some(staged.id));
}

#[tokio::test]
async fn test_clone_has_no_lineage() {
    let (client, _server) = create_client();
    let source = client
        .stage_new_holon(TransientHolon::new(properties([("title", "original")])))
        .await
        .unwrap();

    let copy = client
        .stage_new_from_clone(source.clone().into())
        .await
        .unwrap();

    assert_ne!(copy.id, source.id);
    let holon = client.get_staged(&copy).unwrap();
    assert_eq!(holon.property_map(), &properties([("title", "original")]));
    assert_eq!(holon.original_id(), None);
}

#[tokio::test]
async fn test_remove_properties() {
    let (client, _server) = create_client();
    let staged = client
        .stage_new_holon(TransientHolon::new(properties([("title", "t"), ("draft", "yes")])))
        .await
        .unwrap();

    client
        .remove_properties(staged.clone(), vec!["draft".into()])
        .await
        .unwrap();

    let holon = client.get_staged(&staged).unwrap();
    assert_eq!(holon.property_map(), &properties([("title", "t")]));
}
