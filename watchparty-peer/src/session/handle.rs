use crate::error::SessionError;
use crate::media::LocalTrack;
use crate::session::NegotiationPhase;
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use watchparty_core::MemberId;

pub(crate) enum SessionCommand {
    LocalMediaStarted(Vec<LocalTrack>),
    LocalMediaStopped,
    AudioMuteToggled(bool),
    SyncMedia(serde_json::Value),
    End(oneshot::Sender<()>),
}

/// Local controls of a running session. Cheap to clone.
#[derive(Clone)]
pub struct SessionHandle {
    pub(crate) commands: mpsc::UnboundedSender<SessionCommand>,
    pub(crate) peers: Arc<DashMap<MemberId, NegotiationPhase>>,
}

impl SessionHandle {
    /// Share `tracks` with every current peer and every later one.
    pub fn on_local_media_started(&self, tracks: Vec<LocalTrack>) -> Result<(), SessionError> {
        self.send(SessionCommand::LocalMediaStarted(tracks))
    }

    pub fn on_local_media_stopped(&self) -> Result<(), SessionError> {
        self.send(SessionCommand::LocalMediaStopped)
    }

    pub fn on_audio_mute_toggled(&self, muted: bool) -> Result<(), SessionError> {
        self.send(SessionCommand::AudioMuteToggled(muted))
    }

    /// Broadcast a playback-sync payload to the room.
    pub fn send_sync_media(&self, payload: serde_json::Value) -> Result<(), SessionError> {
        self.send(SessionCommand::SyncMedia(payload))
    }

    /// Snapshot of every live peer entry and its phase.
    pub fn peers(&self) -> HashMap<MemberId, NegotiationPhase> {
        self.peers
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }

    pub fn is_ended(&self) -> bool {
        self.commands.is_closed()
    }

    /// Stop local media, close every peer and the relay, and wait for all of it.
    /// Ending an already ended session is a no-op.
    pub async fn end(&self) -> Result<(), SessionError> {
        let (ack_tx, ack_rx) = oneshot::channel();
        if self.commands.send(SessionCommand::End(ack_tx)).is_err() {
            return Ok(());
        }
        let _ = ack_rx.await;
        Ok(())
    }

    fn send(&self, cmd: SessionCommand) -> Result<(), SessionError> {
        self.commands.send(cmd).map_err(|_| SessionError::Ended)
    }
}
