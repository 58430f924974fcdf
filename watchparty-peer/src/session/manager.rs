use crate::media::{LocalCapture, LocalMedia};
use crate::session::handle::SessionCommand;
use crate::session::peer_worker::{PeerCommand, WorkerReport, WorkerSetup, run_peer_worker};
use crate::session::{NegotiationPhase, SessionEvent, SessionEvents, SessionHandle};
use crate::signaling::{RelayInbound, SignalingOutput};
use crate::transport::{EntryTag, TransportEvent, TransportFactory};
use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use watchparty_core::{IceCandidate, MemberId, SignalMessage};

/// Candidates kept per identity while it has no entry yet.
const MAX_PENDING_CANDIDATES: usize = 32;

struct PeerEntry {
    generation: u64,
    /// Created on `user-joined` by the side that does not offer.
    awaiting_offer: bool,
    commands: mpsc::UnboundedSender<PeerCommand>,
    task: JoinHandle<()>,
}

impl PeerEntry {
    fn send(&self, remote: &MemberId, cmd: PeerCommand) {
        if self.commands.send(cmd).is_err() {
            debug!("Peer worker for {} already finished", remote);
        }
    }
}

/// One participant's side of the mesh.
///
/// A single event loop owns the peer map. Negotiation work runs in one worker
/// task per entry, so a slow handshake with one member never delays another.
pub struct PeerSessionManager {
    local_id: Option<MemberId>,
    signaling: Arc<dyn SignalingOutput>,
    factory: Arc<dyn TransportFactory>,
    capture: Option<Arc<dyn LocalCapture>>,

    entries: HashMap<MemberId, PeerEntry>,
    /// Candidates from identities that have no entry yet, drained by the next
    /// entry created for them.
    early_candidates: HashMap<MemberId, Vec<IceCandidate>>,
    /// Phase snapshot shared with every [`SessionHandle`].
    peers: Arc<DashMap<MemberId, NegotiationPhase>>,
    media: LocalMedia,
    next_generation: u64,

    inbound: RelayInbound,
    command_rx: mpsc::UnboundedReceiver<SessionCommand>,

    transport_rx: mpsc::Receiver<TransportEvent>,
    transport_tx: mpsc::Sender<TransportEvent>,

    report_rx: mpsc::UnboundedReceiver<WorkerReport>,
    report_tx: mpsc::UnboundedSender<WorkerReport>,

    events: mpsc::UnboundedSender<SessionEvent>,
}

impl PeerSessionManager {
    pub fn new(
        signaling: Arc<dyn SignalingOutput>,
        factory: Arc<dyn TransportFactory>,
        capture: Option<Arc<dyn LocalCapture>>,
        inbound: RelayInbound,
    ) -> (Self, SessionHandle, SessionEvents) {
        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let (transport_tx, transport_rx) = mpsc::channel(256);
        let (report_tx, report_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let peers = Arc::new(DashMap::new());

        let handle = SessionHandle {
            commands: command_tx,
            peers: peers.clone(),
        };

        let manager = Self {
            local_id: None,
            signaling,
            factory,
            capture,
            entries: HashMap::new(),
            early_candidates: HashMap::new(),
            peers,
            media: LocalMedia::default(),
            next_generation: 0,
            inbound,
            command_rx,
            transport_rx,
            transport_tx,
            report_rx,
            report_tx,
            events: event_tx,
        };

        (manager, handle, event_rx)
    }

    /// Runs until the session ends: local `end()`, host departure, every
    /// handle dropped, or loss of the relay connection.
    pub async fn run(mut self) {
        info!("Peer session started");

        let ack = loop {
            tokio::select! {
                msg = self.inbound.recv() => {
                    match msg {
                        Some(msg) => {
                            if self.handle_signal(msg).await {
                                break None;
                            }
                        }
                        None => {
                            info!("Relay connection closed, ending session");
                            break None;
                        }
                    }
                }

                cmd = self.command_rx.recv() => {
                    match cmd {
                        Some(SessionCommand::End(ack)) => break Some(ack),
                        Some(cmd) => self.handle_command(cmd).await,
                        None => {
                            info!("All session handles dropped, ending session");
                            break None;
                        }
                    }
                }

                Some(evt) = self.transport_rx.recv() => self.handle_transport_event(evt).await,

                Some(report) = self.report_rx.recv() => self.handle_report(report),
            }
        };

        self.teardown().await;
        if let Some(ack) = ack {
            let _ = ack.send(());
        }
        info!("Peer session finished");
    }

    /// Returns `true` when the session must end.
    async fn handle_signal(&mut self, msg: SignalMessage) -> bool {
        if let Some(local) = &self.local_id {
            if !msg.addressed_to(local) {
                return false;
            }
        }

        match msg {
            SignalMessage::Welcome { member_id } => {
                info!("Joined room as {}", member_id);
                self.local_id = Some(member_id.clone());
                self.emit(SessionEvent::Joined {
                    local_id: member_id,
                });
            }

            SignalMessage::UserJoined { remote_id } => {
                let Some(local) = self.local_id.clone() else {
                    warn!("user-joined for {} before welcome, ignoring", remote_id);
                    return false;
                };
                if remote_id == local || self.entries.contains_key(&remote_id) {
                    return false;
                }
                if local < remote_id {
                    self.spawn_entry(remote_id, Some(PeerCommand::Offer), false);
                } else {
                    debug!("Waiting for {} to offer", remote_id);
                    self.spawn_entry(remote_id, None, true);
                }
            }

            SignalMessage::UserLeft { remote_id } => {
                self.early_candidates.remove(&remote_id);
                if self.close_entry(&remote_id) {
                    info!("Peer {} left", remote_id);
                    self.emit(SessionEvent::PeerLeft { remote: remote_id });
                }
            }

            SignalMessage::HostLeft { remote_id } => {
                info!("Host {} left, the party has ended", remote_id);
                self.emit(SessionEvent::HostLeft { remote: remote_id });
                return true;
            }

            SignalMessage::Offer {
                sender_id, offer, ..
            } => {
                if self.local_id.is_none() {
                    warn!("Offer from {} before welcome, ignoring", sender_id);
                    return false;
                }
                if let Some(entry) = self.entries.get_mut(&sender_id) {
                    if entry.awaiting_offer {
                        entry.awaiting_offer = false;
                        entry.send(&sender_id, PeerCommand::RemoteOffer(offer));
                        return false;
                    }
                }
                if self.close_entry(&sender_id) {
                    info!("Replaced entry for {} on new offer", sender_id);
                }
                self.spawn_entry(sender_id, Some(PeerCommand::RemoteOffer(offer)), false);
            }

            SignalMessage::Answer {
                sender_id, answer, ..
            } => match self.entries.get(&sender_id) {
                Some(entry) => entry.send(&sender_id, PeerCommand::RemoteAnswer(answer)),
                None => debug!("Answer from unknown peer {}, ignoring", sender_id),
            },

            SignalMessage::IceCandidate {
                sender_id,
                candidate,
                ..
            } => match self.entries.get(&sender_id) {
                Some(entry) => entry.send(&sender_id, PeerCommand::RemoteCandidate(candidate)),
                None => self.hold_candidate(sender_id, candidate),
            },

            SignalMessage::SyncMedia { sender_id, payload } => {
                self.emit(SessionEvent::SyncMedia {
                    sender: sender_id,
                    payload,
                });
            }

            SignalMessage::Join { .. } => {
                warn!("Relay delivered a join, ignoring");
            }
        }
        false
    }

    async fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::LocalMediaStarted(tracks) => {
                info!("Local media started with {} tracks", tracks.len());
                self.media.tracks = tracks.clone();
                for (remote, entry) in &self.entries {
                    entry.send(remote, PeerCommand::AttachTracks(tracks.clone()));
                }
            }

            SessionCommand::LocalMediaStopped => {
                info!("Local media stopped");
                self.media.stop();
                self.broadcast(|| PeerCommand::DetachTracks);
            }

            SessionCommand::AudioMuteToggled(muted) => {
                self.media.audio_muted = muted;
                self.broadcast(|| PeerCommand::SetAudioMuted(muted));
            }

            SessionCommand::SyncMedia(payload) => {
                self.signaling
                    .send_sync_media(self.local_id.clone(), payload)
                    .await;
            }

            // Handled by the run loop.
            SessionCommand::End(_) => {}
        }
    }

    async fn handle_transport_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::CandidateGenerated(tag, candidate) => {
                if !self.is_current(&tag) {
                    return;
                }
                let Some(local) = self.local_id.clone() else {
                    return;
                };
                self.signaling.send_ice(local, tag.remote, candidate).await;
            }

            TransportEvent::RemoteTrack {
                tag,
                track_id,
                kind,
            } => {
                if self.is_current(&tag) {
                    self.emit(SessionEvent::RemoteTrack {
                        remote: tag.remote,
                        track_id,
                        kind,
                    });
                }
            }

            TransportEvent::Failed(tag) => {
                if self.is_current(&tag) {
                    self.fail_entry(tag.remote, "connection failed".to_owned());
                }
            }
        }
    }

    fn handle_report(&mut self, report: WorkerReport) {
        match report {
            WorkerReport::Phase(tag, phase) => {
                if !self.is_current(&tag) {
                    return;
                }
                self.peers.insert(tag.remote.clone(), phase);
                self.emit(SessionEvent::PeerPhase {
                    remote: tag.remote,
                    phase,
                });
            }
            WorkerReport::Failed(tag, reason) => {
                if self.is_current(&tag) {
                    self.fail_entry(tag.remote, reason);
                }
            }
        }
    }

    fn spawn_entry(&mut self, remote: MemberId, first: Option<PeerCommand>, awaiting_offer: bool) {
        let Some(local_id) = self.local_id.clone() else {
            return;
        };
        self.next_generation += 1;
        let tag = EntryTag {
            remote: remote.clone(),
            generation: self.next_generation,
        };

        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        if let Some(cmd) = first {
            let _ = cmd_tx.send(cmd);
        }
        if let Some(early) = self.early_candidates.remove(&remote) {
            debug!("Handing {} early candidates to {}", early.len(), tag);
            for candidate in early {
                let _ = cmd_tx.send(PeerCommand::RemoteCandidate(candidate));
            }
        }

        let setup = WorkerSetup {
            tag: tag.clone(),
            local_id,
            media: self.media.clone(),
            factory: self.factory.clone(),
            signaling: self.signaling.clone(),
            transport_tx: self.transport_tx.clone(),
            reports: self.report_tx.clone(),
        };
        let task = tokio::spawn(run_peer_worker(setup, cmd_rx));

        debug!("Created entry {}", tag);
        self.entries.insert(
            remote.clone(),
            PeerEntry {
                generation: tag.generation,
                awaiting_offer,
                commands: cmd_tx,
                task,
            },
        );
        self.peers.insert(remote.clone(), NegotiationPhase::Idle);
        self.emit(SessionEvent::PeerPhase {
            remote,
            phase: NegotiationPhase::Idle,
        });
    }

    /// Drops the entry for `remote`, letting its worker close the transport.
    /// Returns whether there was one.
    fn close_entry(&mut self, remote: &MemberId) -> bool {
        let Some(entry) = self.entries.remove(remote) else {
            return false;
        };
        entry.send(remote, PeerCommand::Close);
        self.peers.remove(remote);
        self.emit(SessionEvent::PeerPhase {
            remote: remote.clone(),
            phase: NegotiationPhase::Terminated,
        });
        true
    }

    fn fail_entry(&mut self, remote: MemberId, reason: String) {
        warn!("Dropping peer {}: {}", remote, reason);
        self.close_entry(&remote);
        self.emit(SessionEvent::PeerFailed { remote, reason });
    }

    fn hold_candidate(&mut self, remote: MemberId, candidate: IceCandidate) {
        if self.local_id.is_none() {
            debug!("Candidate from {} before welcome, ignoring", remote);
            return;
        }
        let held = self.early_candidates.entry(remote.clone()).or_default();
        if held.len() >= MAX_PENDING_CANDIDATES {
            debug!("Too many early candidates from {}, dropping one", remote);
            return;
        }
        debug!("Holding candidate from {} until its entry exists", remote);
        held.push(candidate);
    }

    fn is_current(&self, tag: &EntryTag) -> bool {
        self.entries
            .get(&tag.remote)
            .is_some_and(|entry| entry.generation == tag.generation)
    }

    fn broadcast(&self, cmd: impl Fn() -> PeerCommand) {
        for (remote, entry) in &self.entries {
            entry.send(remote, cmd());
        }
    }

    fn emit(&self, event: SessionEvent) {
        let _ = self.events.send(event);
    }

    /// Stops local capture, detaches and closes every entry and waits for
    /// them, then closes the relay.
    async fn teardown(&mut self) {
        if let Some(capture) = &self.capture {
            capture.stop().await;
            info!("Local capture stopped");
        }
        let had_media = self.media.is_active();
        self.media.stop();
        self.early_candidates.clear();

        let remotes: Vec<MemberId> = self.entries.keys().cloned().collect();
        let mut tasks = Vec::with_capacity(remotes.len());
        for remote in remotes {
            if let Some(entry) = self.entries.remove(&remote) {
                if had_media {
                    entry.send(&remote, PeerCommand::DetachTracks);
                }
                entry.send(&remote, PeerCommand::Close);
                tasks.push(entry.task);
                self.emit(SessionEvent::PeerPhase {
                    remote,
                    phase: NegotiationPhase::Terminated,
                });
            }
        }
        for result in futures::future::join_all(tasks).await {
            if let Err(e) = result {
                warn!("Peer worker ended abnormally: {}", e);
            }
        }
        self.peers.clear();

        self.signaling.close().await;
        info!("Session torn down");
        self.emit(SessionEvent::Ended);
    }
}

/// Wires a manager to its collaborators and spawns its event loop.
///
/// `capture`, when given, is stopped as part of ending the session.
pub fn spawn_session(
    signaling: Arc<dyn SignalingOutput>,
    factory: Arc<dyn TransportFactory>,
    capture: Option<Arc<dyn LocalCapture>>,
    inbound: RelayInbound,
) -> (SessionHandle, SessionEvents) {
    let (manager, handle, events) = PeerSessionManager::new(signaling, factory, capture, inbound);
    tokio::spawn(manager.run());
    (handle, events)
}
