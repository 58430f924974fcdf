use crate::media::{LocalMedia, LocalTrack};
use crate::session::NegotiationPhase;
use crate::signaling::SignalingOutput;
use crate::transport::{EntryTag, PeerTransport, TransportEvent, TransportFactory};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchparty_core::{IceCandidate, MemberId, SessionDescription};

/// Work queued for one peer entry, applied strictly in order.
#[derive(Debug)]
pub(crate) enum PeerCommand {
    /// Start the offering side of the handshake.
    Offer,
    RemoteOffer(SessionDescription),
    RemoteAnswer(SessionDescription),
    RemoteCandidate(IceCandidate),
    AttachTracks(Vec<LocalTrack>),
    DetachTracks,
    SetAudioMuted(bool),
    Close,
}

/// What a worker tells the session loop.
#[derive(Debug)]
pub(crate) enum WorkerReport {
    Phase(EntryTag, NegotiationPhase),
    Failed(EntryTag, String),
}

pub(crate) struct WorkerSetup {
    pub tag: EntryTag,
    pub local_id: MemberId,
    pub media: LocalMedia,
    pub factory: Arc<dyn TransportFactory>,
    pub signaling: Arc<dyn SignalingOutput>,
    pub transport_tx: mpsc::Sender<TransportEvent>,
    pub reports: mpsc::UnboundedSender<WorkerReport>,
}

/// Owns one peer connection for its whole life.
///
/// Candidates that arrive before the remote description is installed are
/// held in `pending_candidates` and applied right after it is.
struct PeerWorker {
    tag: EntryTag,
    local_id: MemberId,
    transport: Box<dyn PeerTransport>,
    signaling: Arc<dyn SignalingOutput>,
    reports: mpsc::UnboundedSender<WorkerReport>,
    phase: NegotiationPhase,
    remote_desc_set: bool,
    pending_candidates: Vec<IceCandidate>,
}

/// Creates the transport, then drains `commands` until `Close` or failure.
pub(crate) async fn run_peer_worker(
    setup: WorkerSetup,
    mut commands: mpsc::UnboundedReceiver<PeerCommand>,
) {
    let WorkerSetup {
        tag,
        local_id,
        media,
        factory,
        signaling,
        transport_tx,
        reports,
    } = setup;

    let transport = match factory.create(tag.clone(), transport_tx).await {
        Ok(transport) => transport,
        Err(e) => {
            warn!("Failed to create transport for {}: {:?}", tag, e);
            let _ = reports.send(WorkerReport::Failed(tag, format!("{:#}", e)));
            return;
        }
    };

    let mut worker = PeerWorker {
        tag,
        local_id,
        transport,
        signaling,
        reports,
        phase: NegotiationPhase::Idle,
        remote_desc_set: false,
        pending_candidates: Vec::new(),
    };

    worker.attach_initial(media).await;

    while let Some(cmd) = commands.recv().await {
        if matches!(cmd, PeerCommand::Close) {
            break;
        }
        if let Err(e) = worker.handle(cmd).await {
            warn!("Negotiation with {} failed: {:?}", worker.tag, e);
            let _ = worker
                .reports
                .send(WorkerReport::Failed(worker.tag.clone(), format!("{:#}", e)));
            break;
        }
    }

    worker.shutdown().await;
}

impl PeerWorker {
    async fn attach_initial(&mut self, media: LocalMedia) {
        if !media.is_active() {
            return;
        }
        if let Err(e) = self.transport.attach_tracks(&media.tracks).await {
            warn!("Failed to attach local media to {}: {:?}", self.tag, e);
            return;
        }
        if media.audio_muted {
            if let Err(e) = self.transport.set_audio_muted(true).await {
                warn!("Failed to mute audio for {}: {:?}", self.tag, e);
            }
        }
    }

    async fn handle(&mut self, cmd: PeerCommand) -> anyhow::Result<()> {
        match cmd {
            PeerCommand::Offer => {
                if self.phase != NegotiationPhase::Idle {
                    debug!("{} already negotiating ({}), not offering", self.tag, self.phase);
                    return Ok(());
                }
                self.set_phase(NegotiationPhase::Offering);
                let offer = self.transport.create_offer().await?;
                self.signaling
                    .send_offer(self.local_id.clone(), self.tag.remote.clone(), offer)
                    .await;
                info!("Sent offer to {}", self.tag);
            }

            PeerCommand::RemoteOffer(offer) => {
                if self.phase != NegotiationPhase::Idle {
                    warn!("Ignoring offer from {} while {}", self.tag, self.phase);
                    return Ok(());
                }
                self.set_phase(NegotiationPhase::Answering);
                self.install_remote(offer).await?;
                let answer = self.transport.create_answer().await?;
                self.signaling
                    .send_answer(self.local_id.clone(), self.tag.remote.clone(), answer)
                    .await;
                info!("Sent answer to {}", self.tag);
                self.set_phase(NegotiationPhase::Connected);
            }

            PeerCommand::RemoteAnswer(answer) => {
                if self.phase != NegotiationPhase::Offering {
                    debug!("Stray answer from {} while {}, ignoring", self.tag, self.phase);
                    return Ok(());
                }
                self.install_remote(answer).await?;
                self.set_phase(NegotiationPhase::Connected);
            }

            PeerCommand::RemoteCandidate(candidate) => {
                if !self.remote_desc_set {
                    debug!("Buffering candidate from {}", self.tag);
                    self.pending_candidates.push(candidate);
                    return Ok(());
                }
                // A bad candidate only loses one path, not the connection.
                if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                    warn!("Failed to add ICE candidate for {}: {:?}", self.tag, e);
                }
            }

            PeerCommand::AttachTracks(tracks) => {
                if let Err(e) = self.transport.attach_tracks(&tracks).await {
                    warn!("Failed to attach local media to {}: {:?}", self.tag, e);
                }
            }

            PeerCommand::DetachTracks => {
                if let Err(e) = self.transport.detach_tracks().await {
                    warn!("Failed to detach local media from {}: {:?}", self.tag, e);
                }
            }

            PeerCommand::SetAudioMuted(muted) => {
                if let Err(e) = self.transport.set_audio_muted(muted).await {
                    warn!("Failed to toggle audio for {}: {:?}", self.tag, e);
                }
            }

            PeerCommand::Close => {}
        }
        Ok(())
    }

    async fn install_remote(&mut self, desc: SessionDescription) -> anyhow::Result<()> {
        self.transport.set_remote_description(desc).await?;
        self.remote_desc_set = true;

        let pending = std::mem::take(&mut self.pending_candidates);
        if !pending.is_empty() {
            debug!("Flushing {} buffered candidates for {}", pending.len(), self.tag);
        }
        for candidate in pending {
            if let Err(e) = self.transport.add_ice_candidate(candidate).await {
                warn!("Failed to add buffered ICE candidate for {}: {:?}", self.tag, e);
            }
        }
        Ok(())
    }

    fn set_phase(&mut self, phase: NegotiationPhase) {
        self.phase = phase;
        let _ = self
            .reports
            .send(WorkerReport::Phase(self.tag.clone(), phase));
    }

    async fn shutdown(self) {
        if let Err(e) = self.transport.close().await {
            warn!("Failed to close transport for {}: {:?}", self.tag, e);
        }
        debug!("Peer worker for {} finished", self.tag);
    }
}
