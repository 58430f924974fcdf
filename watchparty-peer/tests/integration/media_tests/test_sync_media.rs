use serde_json::json;
use watchparty_core::{MemberId, SignalMessage};
use watchparty_peer::{NegotiationPhase, SessionEvent, TransportEvent};

use crate::utils::{candidate, init_tracing, start_session};

#[tokio::test]
async fn test_sync_media_both_directions() {
    init_tracing();
    let mut session = start_session("a").await;

    session.deliver(SignalMessage::SyncMedia {
        sender_id: Some(MemberId::from("b")),
        payload: json!({ "state": "paused", "time": 12.5 }),
    });
    let event = session
        .wait_for_event(|e| matches!(e, SessionEvent::SyncMedia { .. }))
        .await;
    assert_eq!(
        event,
        Some(SessionEvent::SyncMedia {
            sender: Some(MemberId::from("b")),
            payload: json!({ "state": "paused", "time": 12.5 }),
        })
    );

    session
        .handle
        .send_sync_media(json!({ "state": "playing" }))
        .unwrap();

    let mut sent = Vec::new();
    for _ in 0..100 {
        sent = session.signaling.get_signals().await;
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(
        sent,
        vec![SignalMessage::SyncMedia {
            sender_id: Some(MemberId::from("a")),
            payload: json!({ "state": "playing" }),
        }]
    );
}

#[tokio::test]
async fn test_local_candidates_are_sent_to_their_peer() {
    init_tracing();
    let mut session = start_session("a").await;

    session.user_joined("b");
    assert!(session.wait_for_phase("b", NegotiationPhase::Offering).await);
    let tag = session.factory.tags_for("b")[0].clone();

    session
        .factory
        .emit(&tag, TransportEvent::CandidateGenerated(tag.clone(), candidate("candidate:local")))
        .await;

    let b = MemberId::from("b");
    let mut sent = Vec::new();
    for _ in 0..100 {
        sent = session.signaling.candidates_to(&b).await;
        if !sent.is_empty() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    assert_eq!(sent, vec![candidate("candidate:local")]);
}
