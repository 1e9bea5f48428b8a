//! Reads: idempotence, echo round-trip, placeholders, the JSON path.

use crate::{create_client, create_json_client};
use holons_client::{
    properties, ContentSet, Error, FileData, HolonId, MapString, TransientHolon,
};

#[tokio::test]
async fn test_get_all_requests_are_identical() {
    let (client, server) = create_client();
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();

    client.get_all_holons().await.unwrap();
    client.get_all_holons().await.unwrap();

    let requests = server.requests();
    let n = requests.len();
    assert_eq!(requests[n - 1], requests[n - 2]);
}

#[tokio::test]
async fn test_echoed_pool_round_trips() {
    let (client, server) = create_client();
    server.seed(properties([("key", "persisted")]));
    client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();
    client.new_holon(properties([("key", "loose")])).await.unwrap();
    let before = client.session();

    client.get_all_holons().await.unwrap();

    assert_eq!(*client.session(), *before);
}

#[tokio::test]
async fn test_get_all_with_embedded_properties_is_complete() {
    let (client, server) = create_client();
    server.seed(properties([("key", "a")]));
    server.seed(properties([("key", "b")]));

    let fetched = client.get_all_holons().await.unwrap();

    assert!(fetched.is_complete());
    assert_eq!(fetched.holons.len(), 2);
    assert_eq!(fetched.holons[0].property_map(), &properties([("key", "a")]));
}

#[tokio::test]
async fn test_placeholders_are_refreshed_by_id() {
    let (client, server) = create_client();
    let a = server.seed(properties([("key", "a")]));
    let b = server.seed(properties([("key", "b")]));
    server.embed_properties(false);

    let fetched = client.get_all_holons().await.unwrap();
    assert_eq!(fetched.placeholders, vec![a.clone(), b.clone()]);
    assert!(fetched.holons.iter().all(|h| h.property_map().is_empty()));
    assert_eq!(fetched.holons[0].saved_id(), &a);

    let refreshed = client.refresh_placeholders(fetched).await.unwrap();

    assert!(refreshed.is_complete());
    assert_eq!(refreshed.holons[0].property_map(), &properties([("key", "a")]));
    assert_eq!(refreshed.holons[1].property_map(), &properties([("key", "b")]));
    assert_eq!(
        server
            .requests()
            .iter()
            .filter(|r| r.name.as_str() == "get_holon_by_id")
            .count(),
        2
    );
}

#[tokio::test]
async fn test_get_holon_by_id() {
    let (client, server) = create_client();
    let id = server.seed(properties([("title", "x")]));

    let holon = client.get_holon_by_id(HolonId::Local(id.clone())).await.unwrap();

    assert_eq!(holon.saved_id(), &id);
    assert_eq!(holon.property_map(), &properties([("title", "x")]));
}

#[tokio::test]
async fn test_delete_then_get_is_not_found() {
    let (client, server) = create_client();
    let id = server.seed(properties([("title", "x")]));

    client.delete_holon(id.clone()).await.unwrap();

    let err = client.get_holon_by_id(HolonId::Local(id)).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn test_staged_lookup_by_key_local_and_remote_agree() {
    let (client, _server) = create_client();
    let staged = client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();

    let remote = client
        .get_staged_holon_by_key(MapString::from("book"))
        .await
        .unwrap();
    let local = client.find_staged_by_key(&"book".into()).unwrap();

    assert_eq!(remote, staged);
    assert_eq!(local, staged);
    assert!(client
        .get_staged_holon_by_key(MapString::from("missing"))
        .await
        .unwrap_err()
        .is_not_found());
}

#[tokio::test]
async fn test_load_holons_stages_file_content() {
    let (client, _server) = create_client();
    let content = ContentSet {
        schema: None,
        files_to_load: vec![FileData {
            filename: "books.json".into(),
            raw_contents: r#"[{"key": "one"}, {"key": "two", "pages": 300}]"#.into(),
        }],
    };

    let loaded = client.load_holons(content).await.unwrap();

    assert_eq!(loaded.len(), 2);
    assert!(client.find_staged_by_key(&"one".into()).is_some());
    assert!(client.find_staged_by_key(&"two".into()).is_some());
}

#[tokio::test]
async fn test_load_holons_rejects_malformed_file() {
    let (client, _server) = create_client();
    let content = ContentSet {
        schema: None,
        files_to_load: vec![FileData {
            filename: "broken.json".into(),
            raw_contents: "not json".into(),
        }],
    };

    let err = client.load_holons(content).await.unwrap_err();
    assert!(matches!(err, Error::InvalidParameter(_)));
    assert!(client.session().staged_holons.is_empty());
}

#[tokio::test]
async fn test_json_transport_full_cycle() {
    let (client, server) = create_json_client();
    let staged = client
        .stage_new_holon(TransientHolon::new(properties([("key", "wire")])))
        .await
        .unwrap();
    client
        .with_properties(staged, properties([("title", "over json")]))
        .await
        .unwrap();

    let saved = client.commit().await.unwrap();

    assert_eq!(saved.len(), 1);
    assert_eq!(
        saved[0].property_map(),
        &properties([("key", "wire"), ("title", "over json")])
    );
    assert_eq!(server.saved(), saved);
}
