use watchparty_core::{MemberId, SignalMessage};
use watchparty_peer::{NegotiationPhase, SessionEvent};

use crate::utils::{TransportCall, init_tracing, start_session};

#[tokio::test]
async fn test_host_left_ends_session() {
    init_tracing();
    let mut session = start_session("g").await;

    session.offer_from("h");
    assert!(session.wait_for_phase("h", NegotiationPhase::Connected).await);

    session.user_left("h");
    session.deliver(SignalMessage::HostLeft {
        remote_id: MemberId::from("h"),
    });

    let host_left = session
        .wait_for_event(|e| matches!(e, SessionEvent::HostLeft { .. }))
        .await;
    assert_eq!(
        host_left,
        Some(SessionEvent::HostLeft {
            remote: MemberId::from("h")
        })
    );
    let ended = session
        .wait_for_event(|e| matches!(e, SessionEvent::Ended))
        .await;
    assert_eq!(ended, Some(SessionEvent::Ended));

    assert!(session.signaling.is_closed());
    assert_eq!(session.factory.calls_for("h").last(), Some(&TransportCall::Close));
}
