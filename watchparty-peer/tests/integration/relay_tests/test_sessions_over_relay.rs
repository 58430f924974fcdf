use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use watchparty_core::{MemberId, RoomToken, SessionRole};
use watchparty_peer::{
    NegotiationPhase, SessionConfig, SessionEvent, SessionEvents, SessionHandle, begin_session,
    connect_relay, spawn_session,
};
use watchparty_relay::{RoomRegistry, serve_on};

use crate::utils::{MockTransportFactory, TransportCall, init_tracing};

const TIMEOUT: Duration = Duration::from_secs(10);

async fn spawn_relay() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(serve_on(listener, RoomRegistry::default()));
    addr
}

async fn next_matching(
    events: &mut SessionEvents,
    mut pred: impl FnMut(&SessionEvent) -> bool,
) -> Option<SessionEvent> {
    tokio::time::timeout(TIMEOUT, async {
        while let Some(event) = events.recv().await {
            if pred(&event) {
                return Some(event);
            }
        }
        None
    })
    .await
    .ok()
    .flatten()
}

async fn joined_id(events: &mut SessionEvents) -> MemberId {
    match next_matching(events, |e| matches!(e, SessionEvent::Joined { .. })).await {
        Some(SessionEvent::Joined { local_id }) => local_id,
        other => panic!("expected Joined, got {:?}", other),
    }
}

async fn connected_to(events: &mut SessionEvents, remote: &MemberId) -> bool {
    next_matching(events, |e| {
        matches!(e, SessionEvent::PeerPhase { remote: r, phase: NegotiationPhase::Connected } if r == remote)
    })
    .await
    .is_some()
}

async fn join_with_mocks(
    addr: SocketAddr,
    room: &str,
    role: SessionRole,
    factory: MockTransportFactory,
) -> (SessionHandle, SessionEvents) {
    let room = RoomToken(room.to_owned());
    let (sink, inbound) = connect_relay(&format!("ws://{}", addr), &room).await.unwrap();
    sink.join(room, role).unwrap();
    spawn_session(Arc::new(sink), Arc::new(factory), None, inbound)
}

#[tokio::test]
async fn test_pair_negotiates_exactly_once_through_relay() {
    init_tracing();
    let addr = spawn_relay().await;

    let host_factory = MockTransportFactory::new();
    let guest_factory = MockTransportFactory::new();

    let (host, mut host_events) =
        join_with_mocks(addr, "abc", SessionRole::Host, host_factory.clone()).await;
    let host_id = joined_id(&mut host_events).await;

    let (_guest, mut guest_events) =
        join_with_mocks(addr, "abc", SessionRole::Guest, guest_factory.clone()).await;
    let guest_id = joined_id(&mut guest_events).await;

    assert!(connected_to(&mut host_events, &guest_id).await);
    assert!(connected_to(&mut guest_events, &host_id).await);

    let offers = host_factory.count_calls(&TransportCall::CreateOffer)
        + guest_factory.count_calls(&TransportCall::CreateOffer);
    let answers = host_factory.count_calls(&TransportCall::CreateAnswer)
        + guest_factory.count_calls(&TransportCall::CreateAnswer);
    assert_eq!(offers, 1);
    assert_eq!(answers, 1);

    // The host going away ends the guest's session too.
    host.end().await.unwrap();
    let host_left = next_matching(&mut guest_events, |e| {
        matches!(e, SessionEvent::PeerLeft { .. } | SessionEvent::HostLeft { .. })
    })
    .await;
    assert_eq!(host_left, Some(SessionEvent::PeerLeft { remote: host_id.clone() }));
    let ended = next_matching(&mut guest_events, |e| matches!(e, SessionEvent::Ended)).await;
    assert_eq!(ended, Some(SessionEvent::Ended));
}

#[tokio::test]
async fn test_webrtc_sessions_complete_negotiation() {
    init_tracing();
    let addr = spawn_relay().await;
    let config = SessionConfig {
        relay_url: format!("ws://{}", addr),
        ice_servers: vec![],
    };

    let (a, mut a_events) =
        begin_session(&config, RoomToken("xyz".into()), SessionRole::Host, None)
            .await
            .unwrap();
    let a_id = joined_id(&mut a_events).await;

    let (b, mut b_events) =
        begin_session(&config, RoomToken("xyz".into()), SessionRole::Guest, None)
            .await
            .unwrap();
    let b_id = joined_id(&mut b_events).await;

    assert!(connected_to(&mut a_events, &b_id).await);
    assert!(connected_to(&mut b_events, &a_id).await);

    b.end().await.unwrap();
    a.end().await.unwrap();
}
