//! Relationships between staged holons, and queries over them.

use crate::create_client;
use holons_client::holons_core::NodeCollection;
use holons_client::{properties, Error, HolonReference, RelationshipName, TransientHolon};

#[tokio::test]
async fn test_add_then_query_related() {
    let (client, _server) = create_client();
    let author = client
        .stage_new_holon(TransientHolon::new(properties([("key", "author")])))
        .await
        .unwrap();
    let book_a = client
        .stage_new_holon(TransientHolon::new(properties([("key", "book-a")])))
        .await
        .unwrap();
    let book_b = client
        .stage_new_holon(TransientHolon::new(properties([("key", "book-b")])))
        .await
        .unwrap();
    let wrote = RelationshipName::from("WROTE");

    client
        .add_related_holons(
            author.clone(),
            wrote.clone(),
            vec![book_a.clone().into(), book_b.clone().into()],
        )
        .await
        .unwrap();

    let related = client
        .query_relationships(
            NodeCollection::from_references(vec![author.clone().into()]),
            wrote.clone(),
        )
        .await
        .unwrap();
    assert_eq!(
        related.members,
        vec![
            HolonReference::from(book_a.clone()),
            HolonReference::from(book_b.clone())
        ]
    );
    assert_eq!(
        related.query_spec.map(|q| q.relationship_name),
        Some(wrote.clone())
    );

    let holon = client.get_staged(&author).unwrap();
    let collection = holon
        .as_staged()
        .and_then(|s| s.relationships().get(&wrote))
        .unwrap();
    assert!(collection.get_by_key(&"book-a".into()).is_some());
}

#[tokio::test]
async fn test_remove_related() {
    let (client, _server) = create_client();
    let author = client
        .stage_new_holon(TransientHolon::new(properties([("key", "author")])))
        .await
        .unwrap();
    let book = client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();
    let wrote = RelationshipName::from("WROTE");

    client
        .add_related_holons(author.clone(), wrote.clone(), vec![book.clone().into()])
        .await
        .unwrap();
    client
        .remove_related_holons(author.clone(), wrote.clone(), vec![book.into()])
        .await
        .unwrap();

    let related = client
        .query_relationships(NodeCollection::from_references(vec![author.into()]), wrote)
        .await
        .unwrap();
    assert!(related.members.is_empty());
}

#[tokio::test]
async fn test_duplicate_key_in_relationship_is_conflict() {
    let (client, _server) = create_client();
    let author = client
        .stage_new_holon(TransientHolon::new(properties([("key", "author")])))
        .await
        .unwrap();
    let book = client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();
    let wrote = RelationshipName::from("WROTE");
    client
        .add_related_holons(author.clone(), wrote.clone(), vec![book.clone().into()])
        .await
        .unwrap();
    let before = client.session();

    let err = client
        .add_related_holons(author, wrote, vec![book.into()])
        .await
        .unwrap_err();

    assert!(err.is_conflict(), "got {:?}", err);
    assert_eq!(*client.session(), *before);
    assert!(!matches!(err, Error::Internal(_)));
}

#[tokio::test]
async fn test_repeated_member_in_one_call_is_conflict() {
    let (client, _server) = create_client();
    let author = client
        .stage_new_holon(TransientHolon::new(properties([("key", "author")])))
        .await
        .unwrap();
    let book = client
        .stage_new_holon(TransientHolon::new(properties([("key", "book")])))
        .await
        .unwrap();
    let before = client.session();

    let err = client
        .add_related_holons(
            author.clone(),
            "WROTE".into(),
            vec![book.clone().into(), book.into()],
        )
        .await
        .unwrap_err();

    assert!(err.is_conflict(), "got {:?}", err);
    assert_eq!(*client.session(), *before);
    let holon = client.get_staged(&author).unwrap();
    assert!(holon
        .as_staged()
        .and_then(|s| s.relationships().get(&RelationshipName::from("WROTE")))
        .map_or(true, |c| c.is_empty()));
}
