use watchparty_core::{MemberId, SdpType};
use watchparty_peer::NegotiationPhase;

use crate::utils::{
    MockTransportFactory, TransportCall, init_tracing, start_session_with, wait_until,
};

#[tokio::test]
async fn test_slow_offer_does_not_block_other_peers() {
    init_tracing();
    let factory = MockTransportFactory::new();
    factory.hold_negotiation_for("b");
    let mut session = start_session_with("a", factory).await;

    session.user_joined("b");
    assert!(session.wait_for_phase("b", NegotiationPhase::Offering).await);
    let offer_started = wait_until(1000, || {
        session.factory.calls_for("b") == [TransportCall::CreateOffer]
    })
    .await;
    assert!(offer_started);

    // "b" is stuck creating its offer; "c" negotiates end to end meanwhile.
    session.user_joined("c");
    session.answer_from("c");
    assert!(session.wait_for_phase("c", NegotiationPhase::Connected).await);
    assert_eq!(session.phase_of("b"), Some(NegotiationPhase::Offering));
    assert!(session.signaling.offers_to(&MemberId::from("b")).await.is_empty());

    // Messages for "b" that arrive mid-step wait for the step to resolve.
    session.answer_from("b");
    session.candidate_from("b", "candidate:1");
    session.candidate_from("b", "candidate:2");
    assert!(!wait_until(200, || session.factory.calls_for("b").len() > 1).await);

    session.factory.release_negotiation_for("b");
    assert!(session.wait_for_phase("b", NegotiationPhase::Connected).await);
    assert!(wait_until(1000, || session.factory.calls_for("b").len() == 4).await);

    assert_eq!(
        session.factory.calls_for("b"),
        vec![
            TransportCall::CreateOffer,
            TransportCall::SetRemote(SdpType::Answer),
            TransportCall::AddCandidate("candidate:1".into()),
            TransportCall::AddCandidate("candidate:2".into()),
        ]
    );
    assert_eq!(session.signaling.offers_to(&MemberId::from("b")).await.len(), 1);
}

#[tokio::test]
async fn test_slow_answer_does_not_block_other_peers() {
    init_tracing();
    let factory = MockTransportFactory::new();
    factory.hold_negotiation_for("b");
    let mut session = start_session_with("m", factory).await;

    session.offer_from("b");
    assert!(session.wait_for_phase("b", NegotiationPhase::Answering).await);
    session.candidate_from("b", "candidate:late");

    session.user_joined("z");
    session.answer_from("z");
    assert!(session.wait_for_phase("z", NegotiationPhase::Connected).await);
    assert_eq!(session.phase_of("b"), Some(NegotiationPhase::Answering));
    assert!(session.signaling.answers_to(&MemberId::from("b")).await.is_empty());

    session.factory.release_negotiation_for("b");
    assert!(session.wait_for_phase("b", NegotiationPhase::Connected).await);
    assert!(wait_until(1000, || session.factory.calls_for("b").len() == 3).await);

    assert_eq!(
        session.factory.calls_for("b"),
        vec![
            TransportCall::SetRemote(SdpType::Offer),
            TransportCall::CreateAnswer,
            TransportCall::AddCandidate("candidate:late".into()),
        ]
    );
    assert_eq!(session.signaling.answers_to(&MemberId::from("b")).await.len(), 1);
}
