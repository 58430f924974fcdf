use crate::media::LocalTrack;
use crate::transport::{EntryTag, TransportEvent};
use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::mpsc;
use watchparty_core::{IceCandidate, SessionDescription};

/// Builds one point-to-point connection per peer entry.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    /// `events` receives everything the new connection raises, tagged with `tag`.
    async fn create(
        &self,
        tag: EntryTag,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>>;
}

/// One point-to-point connection to a remote member.
#[async_trait]
pub trait PeerTransport: Send + Sync {
    /// Create an offer and install it as the local description.
    async fn create_offer(&self) -> Result<SessionDescription>;

    /// Create an answer to the installed remote offer and install it locally.
    async fn create_answer(&self) -> Result<SessionDescription>;

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()>;

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()>;

    /// Start sending `tracks`, replacing whatever was sent before.
    async fn attach_tracks(&self, tracks: &[LocalTrack]) -> Result<()>;

    async fn detach_tracks(&self) -> Result<()>;

    /// Swap the audio sender to silence or back, without renegotiation.
    async fn set_audio_muted(&self, muted: bool) -> Result<()>;

    async fn close(&self) -> Result<()>;
}
