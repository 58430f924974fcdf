use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::Level;
use watchparty_core::{IceCandidate, MemberId, SessionDescription, SignalMessage};
use watchparty_peer::{
    NegotiationPhase, SessionEvent, SessionEvents, SessionHandle, spawn_session,
};

use super::mock_capture::MockCapture;
use super::mock_signaling::MockSignalingOutput;
use super::mock_transport::MockTransportFactory;

/// Timeout for a session to react to one input (ms).
pub const EVENT_TIMEOUT_MS: u64 = 2000;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(Level::DEBUG)
        .with_test_writer()
        .try_init();
}

/// A session wired to mocks, with the relay side under test control.
pub struct TestSession {
    pub local: MemberId,
    pub handle: SessionHandle,
    pub events: SessionEvents,
    pub relay: mpsc::UnboundedSender<SignalMessage>,
    pub signaling: MockSignalingOutput,
    pub factory: MockTransportFactory,
    pub capture: MockCapture,
}

/// Starts a session and delivers its `welcome` as `local`.
pub async fn start_session(local: &str) -> TestSession {
    start_session_with(local, MockTransportFactory::new()).await
}

pub async fn start_session_with(local: &str, factory: MockTransportFactory) -> TestSession {
    let (signaling, _signal_rx) = MockSignalingOutput::new();
    let capture = MockCapture::new();
    let (relay, inbound) = mpsc::unbounded_channel();
    let (handle, events) = spawn_session(
        Arc::new(signaling.clone()),
        Arc::new(factory.clone()),
        Some(Arc::new(capture.clone())),
        inbound,
    );

    let mut session = TestSession {
        local: MemberId::from(local),
        handle,
        events,
        relay,
        signaling,
        factory,
        capture,
    };
    session.deliver(SignalMessage::Welcome {
        member_id: session.local.clone(),
    });
    session
        .wait_for_event(|e| matches!(e, SessionEvent::Joined { .. }))
        .await
        .expect("session never joined");
    session
}

pub fn candidate(line: &str) -> IceCandidate {
    IceCandidate {
        candidate: line.to_owned(),
        sdp_mid: Some("0".to_owned()),
        sdp_m_line_index: Some(0),
        username_fragment: None,
    }
}

impl TestSession {
    pub fn deliver(&self, msg: SignalMessage) {
        self.relay.send(msg).expect("session loop is gone");
    }

    pub fn user_joined(&self, remote: &str) {
        self.deliver(SignalMessage::UserJoined {
            remote_id: MemberId::from(remote),
        });
    }

    pub fn user_left(&self, remote: &str) {
        self.deliver(SignalMessage::UserLeft {
            remote_id: MemberId::from(remote),
        });
    }

    pub fn offer_from(&self, remote: &str) {
        self.deliver(SignalMessage::Offer {
            target_id: self.local.clone(),
            sender_id: MemberId::from(remote),
            offer: SessionDescription::offer(format!("v=0 offer from {}", remote)),
        });
    }

    pub fn answer_from(&self, remote: &str) {
        self.deliver(SignalMessage::Answer {
            target_id: self.local.clone(),
            sender_id: MemberId::from(remote),
            answer: SessionDescription::answer(format!("v=0 answer from {}", remote)),
        });
    }

    pub fn candidate_from(&self, remote: &str, line: &str) {
        self.deliver(SignalMessage::IceCandidate {
            target_id: self.local.clone(),
            sender_id: MemberId::from(remote),
            candidate: candidate(line),
        });
    }

    /// Next event matching `pred`, skipping others.
    pub async fn wait_for_event(
        &mut self,
        mut pred: impl FnMut(&SessionEvent) -> bool,
    ) -> Option<SessionEvent> {
        let deadline = Duration::from_millis(EVENT_TIMEOUT_MS);
        tokio::time::timeout(deadline, async {
            while let Some(event) = self.events.recv().await {
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

    pub async fn wait_for_phase(&mut self, remote: &str, phase: NegotiationPhase) -> bool {
        let remote = MemberId::from(remote);
        self.wait_for_event(|e| {
            matches!(e, SessionEvent::PeerPhase { remote: r, phase: p } if *r == remote && *p == phase)
        })
        .await
        .is_some()
    }

    pub fn phase_of(&self, remote: &str) -> Option<NegotiationPhase> {
        self.handle.peers().get(&MemberId::from(remote)).copied()
    }
}

/// Poll `check` until it holds or `timeout_ms` passes.
pub async fn wait_until(timeout_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
