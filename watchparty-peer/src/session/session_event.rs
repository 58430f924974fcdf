use crate::media::TrackKind;
use std::fmt;
use tokio::sync::mpsc;
use watchparty_core::MemberId;

/// Negotiation progress of one peer entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NegotiationPhase {
    /// Known, waiting for the remote's offer.
    Idle,
    Offering,
    Answering,
    /// Offer/answer complete. Media may still be establishing.
    Connected,
    Terminated,
}

impl fmt::Display for NegotiationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NegotiationPhase::Idle => "idle",
            NegotiationPhase::Offering => "offering",
            NegotiationPhase::Answering => "answering",
            NegotiationPhase::Connected => "connected",
            NegotiationPhase::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// What the session reports to its UI.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// The relay registered us under `local_id`.
    Joined { local_id: MemberId },
    PeerPhase {
        remote: MemberId,
        phase: NegotiationPhase,
    },
    /// Negotiation with `remote` failed; its entry is gone, others are unaffected.
    PeerFailed { remote: MemberId, reason: String },
    RemoteTrack {
        remote: MemberId,
        track_id: String,
        kind: TrackKind,
    },
    /// `remote` left the room; its video should be removed.
    PeerLeft { remote: MemberId },
    SyncMedia {
        sender: Option<MemberId>,
        payload: serde_json::Value,
    },
    /// The host is gone and the party is over. Teardown follows.
    HostLeft { remote: MemberId },
    /// Teardown finished: capture released, peers closed, relay closed.
    Ended,
}

pub type SessionEvents = mpsc::UnboundedReceiver<SessionEvent>;
