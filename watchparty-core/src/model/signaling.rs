use crate::model::member::MemberId;
use crate::model::room::{RoomToken, SessionRole};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IceServerConfig {
    pub urls: Vec<String>,
    pub username: Option<String>,
    pub credential: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SdpType {
    Offer,
    Answer,
}

/// Browser-shaped session description: `{"type": "offer", "sdp": "v=0..."}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionDescription {
    #[serde(rename = "type")]
    pub sdp_type: SdpType,
    pub sdp: String,
}

impl SessionDescription {
    pub fn offer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Offer,
            sdp: sdp.into(),
        }
    }

    pub fn answer(sdp: impl Into<String>) -> Self {
        Self {
            sdp_type: SdpType::Answer,
            sdp: sdp.into(),
        }
    }
}

/// One connectivity candidate, in the JSON shape browsers emit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct IceCandidate {
    pub candidate: String,
    #[serde(default)]
    pub sdp_mid: Option<String>,
    #[serde(default)]
    pub sdp_m_line_index: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username_fragment: Option<String>,
}

/// Every message that travels through the relay, keyed by its `action` field.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "kebab-case", rename_all_fields = "camelCase")]
pub enum SignalMessage {
    /// client → relay: register this connection in a room.
    Join {
        room_token: RoomToken,
        #[serde(default)]
        role: SessionRole,
    },
    /// relay → client: the identity assigned to this connection.
    Welcome { member_id: MemberId },
    /// relay → client: another member is (or just became) part of the room.
    UserJoined { remote_id: MemberId },
    /// relay → client: a member's connection closed.
    UserLeft { remote_id: MemberId },
    /// relay → client: the member that hosted the room is gone.
    HostLeft { remote_id: MemberId },
    Offer {
        target_id: MemberId,
        sender_id: MemberId,
        offer: SessionDescription,
    },
    Answer {
        target_id: MemberId,
        sender_id: MemberId,
        answer: SessionDescription,
    },
    IceCandidate {
        target_id: MemberId,
        sender_id: MemberId,
        candidate: IceCandidate,
    },
    /// Playback-sync extension point; the payload is never inspected.
    SyncMedia {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sender_id: Option<MemberId>,
        #[serde(default)]
        payload: serde_json::Value,
    },
}

impl SignalMessage {
    pub fn action(&self) -> &'static str {
        match self {
            SignalMessage::Join { .. } => "join",
            SignalMessage::Welcome { .. } => "welcome",
            SignalMessage::UserJoined { .. } => "user-joined",
            SignalMessage::UserLeft { .. } => "user-left",
            SignalMessage::HostLeft { .. } => "host-left",
            SignalMessage::Offer { .. } => "offer",
            SignalMessage::Answer { .. } => "answer",
            SignalMessage::IceCandidate { .. } => "ice-candidate",
            SignalMessage::SyncMedia { .. } => "sync-media",
        }
    }

    /// Whether a member with identity `id` is meant to act on this message.
    /// Peer-to-peer negotiation messages are broadcast by the relay, so every
    /// recipient other than the target must ignore them.
    pub fn addressed_to(&self, id: &MemberId) -> bool {
        match self {
            SignalMessage::Offer { target_id, .. }
            | SignalMessage::Answer { target_id, .. }
            | SignalMessage::IceCandidate { target_id, .. } => target_id == id,
            _ => true,
        }
    }

    /// Messages the relay forwards verbatim to the rest of the room.
    pub fn is_relayed(&self) -> bool {
        matches!(
            self,
            SignalMessage::Offer { .. }
                | SignalMessage::Answer { .. }
                | SignalMessage::IceCandidate { .. }
                | SignalMessage::SyncMedia { .. }
        )
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}
