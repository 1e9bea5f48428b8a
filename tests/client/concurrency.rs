//! Concurrent callers share one session; dances run one at a time.

use crate::create_client;
use holons_client::{properties, SessionEvent, TransientHolon};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_parallel_stages_all_land() {
    let (client, server) = create_client();
    let client = Arc::new(client);
    server.set_delay(Some(Duration::from_millis(5)));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                client
                    .stage_new_holon(TransientHolon::new(properties([(
                        "key",
                        format!("holon-{}", i),
                    )])))
                    .await
            })
        })
        .collect();
    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let session = client.session();
    assert_eq!(session.staged_holons.len(), 8);
    for i in 0..8 {
        assert!(session
            .staged_holons
            .get_by_key(&format!("holon-{}", i).into())
            .is_some());
    }
    assert_eq!(server.call_count(), 8);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_readers_never_see_partial_state() {
    let (client, server) = create_client();
    let client = Arc::new(client);
    server.set_delay(Some(Duration::from_millis(2)));

    let writer = {
        let client = client.clone();
        tokio::spawn(async move {
            for i in 0..10 {
                client
                    .stage_new_holon(TransientHolon::new(properties([(
                        "key",
                        format!("k{}", i),
                    )])))
                    .await
                    .unwrap();
            }
        })
    };

    let mut last = 0;
    while !writer.is_finished() {
        let session = client.session();
        session.check_invariants().unwrap();
        assert!(session.staged_holons.len() >= last);
        last = session.staged_holons.len();
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();
    assert_eq!(client.session().staged_holons.len(), 10);
}

#[tokio::test]
async fn test_events_follow_dance_order() {
    let (client, _server) = create_client();
    let mut events = client.subscribe();

    client
        .stage_new_holon(TransientHolon::new(properties([("key", "a")])))
        .await
        .unwrap();
    client.commit().await.unwrap();

    let first = events.recv().await.unwrap();
    let second = events.recv().await.unwrap();
    assert!(matches!(first, SessionEvent::Reconciled { staged: 1, .. }));
    assert!(matches!(
        second,
        SessionEvent::Reconciled {
            staged: 0,
            committed: 1,
            ..
        }
    ));
    assert!(first.seq() < second.seq());
}
