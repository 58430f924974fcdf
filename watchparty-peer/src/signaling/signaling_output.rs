use async_trait::async_trait;
use watchparty_core::{IceCandidate, MemberId, SessionDescription};

/// Outbound half of the relay as seen by the session manager.
///
/// Every call is fire-and-forget: the relay gives no acknowledgement, so
/// implementations log delivery problems instead of returning them.
#[async_trait]
pub trait SignalingOutput: Send + Sync {
    async fn send_offer(&self, from: MemberId, to: MemberId, offer: SessionDescription);

    async fn send_answer(&self, from: MemberId, to: MemberId, answer: SessionDescription);

    async fn send_ice(&self, from: MemberId, to: MemberId, candidate: IceCandidate);

    async fn send_sync_media(&self, from: Option<MemberId>, payload: serde_json::Value);

    /// Close the relay connection. Later sends are dropped.
    async fn close(&self);
}
