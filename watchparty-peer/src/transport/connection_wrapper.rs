use crate::media::{LocalTrack, TrackKind};
use crate::transport::{EntryTag, PeerTransport, TransportEvent, TransportFactory};
use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use watchparty_core::{IceCandidate, IceServerConfig, SdpType, SessionDescription};
use webrtc::api::APIBuilder;
use webrtc::api::interceptor_registry::register_default_interceptors;
use webrtc::api::media_engine::MediaEngine;
use webrtc::ice_transport::ice_candidate::{RTCIceCandidate, RTCIceCandidateInit};
use webrtc::ice_transport::ice_server::RTCIceServer;
use webrtc::interceptor::registry::Registry;
use webrtc::peer_connection::RTCPeerConnection;
use webrtc::peer_connection::configuration::RTCConfiguration;
use webrtc::peer_connection::peer_connection_state::RTCPeerConnectionState;
use webrtc::peer_connection::sdp::sdp_type::RTCSdpType;
use webrtc::peer_connection::sdp::session_description::RTCSessionDescription;
use webrtc::rtp_transceiver::rtp_receiver::RTCRtpReceiver;
use webrtc::rtp_transceiver::rtp_transceiver_direction::RTCRtpTransceiverDirection;
use webrtc::rtp_transceiver::{RTCRtpTransceiver, RTCRtpTransceiverInit};
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_remote::TrackRemote;

/// Creates [`ConnectionWrapper`]s on the `webrtc` crate.
#[derive(Debug, Clone)]
pub struct WebRtcTransportFactory {
    ice_servers: Vec<IceServerConfig>,
}

impl WebRtcTransportFactory {
    pub fn new(ice_servers: Vec<IceServerConfig>) -> Self {
        Self { ice_servers }
    }
}

#[async_trait]
impl TransportFactory for WebRtcTransportFactory {
    async fn create(
        &self,
        tag: EntryTag,
        events: mpsc::Sender<TransportEvent>,
    ) -> Result<Box<dyn PeerTransport>> {
        let wrapper = ConnectionWrapper::new(tag, &self.ice_servers, events).await?;
        Ok(Box::new(wrapper))
    }
}

#[derive(Default)]
struct SenderState {
    audio: Option<LocalTrack>,
    video: Option<LocalTrack>,
    audio_muted: bool,
}

/// A `RTCPeerConnection` with one audio and one video transceiver.
///
/// Both transceivers exist from the start, so attaching, detaching and muting
/// local media are sender track swaps and never need a new offer.
pub struct ConnectionWrapper {
    pub tag: EntryTag,
    pub peer_connection: Arc<RTCPeerConnection>,
    audio: Arc<RTCRtpTransceiver>,
    video: Arc<RTCRtpTransceiver>,
    senders: Mutex<SenderState>,
}

impl ConnectionWrapper {
    pub async fn new(
        tag: EntryTag,
        ice_servers: &[IceServerConfig],
        event_tx: mpsc::Sender<TransportEvent>,
    ) -> Result<Self> {
        let mut m = MediaEngine::default();
        m.register_default_codecs()?;
        let registry = register_default_interceptors(Registry::new(), &mut m)?;

        let api = APIBuilder::new()
            .with_media_engine(m)
            .with_interceptor_registry(registry)
            .build();

        let rtc_config = RTCConfiguration {
            ice_servers: ice_servers
                .iter()
                .map(|server| RTCIceServer {
                    urls: server.urls.clone(),
                    username: server.username.clone().unwrap_or_default(),
                    credential: server.credential.clone().unwrap_or_default(),
                })
                .collect(),
            ..Default::default()
        };

        let peer_connection = Arc::new(api.new_peer_connection(rtc_config).await?);

        let audio = add_sendrecv(&peer_connection, TrackKind::Audio).await?;
        let video = add_sendrecv(&peer_connection, TrackKind::Video).await?;

        let state_tx = event_tx.clone();
        let tag_state = tag.clone();
        peer_connection.on_peer_connection_state_change(Box::new(
            move |s: RTCPeerConnectionState| {
                let tx = state_tx.clone();
                let tag = tag_state.clone();

                Box::pin(async move {
                    info!("Peer connection state changed for {}: {}", tag, s);
                    if s == RTCPeerConnectionState::Failed {
                        let _ = tx.send(TransportEvent::Failed(tag)).await;
                    }
                })
            },
        ));

        let ice_tx = event_tx.clone();
        let tag_ice = tag.clone();
        peer_connection.on_ice_candidate(Box::new(move |c: Option<RTCIceCandidate>| {
            let tx = ice_tx.clone();
            let tag = tag_ice.clone();

            Box::pin(async move {
                let Some(candidate) = c else { return };
                let Ok(init) = candidate.to_json() else {
                    return;
                };
                let _ = tx
                    .send(TransportEvent::CandidateGenerated(tag, from_rtc_candidate(init)))
                    .await;
            })
        }));

        let track_tx = event_tx;
        let tag_track = tag.clone();
        peer_connection.on_track(Box::new(
            move |track: Arc<TrackRemote>,
                  _receiver: Arc<RTCRtpReceiver>,
                  _transceiver: Arc<RTCRtpTransceiver>| {
                let tx = track_tx.clone();
                let tag = tag_track.clone();

                Box::pin(async move {
                    let Some(kind) = TrackKind::from_codec_type(track.kind()) else {
                        return;
                    };
                    debug!("Remote {} track {} from {}", kind, track.id(), tag);
                    let _ = tx
                        .send(TransportEvent::RemoteTrack {
                            tag,
                            track_id: track.id(),
                            kind,
                        })
                        .await;
                })
            },
        ));

        Ok(Self {
            tag,
            peer_connection,
            audio,
            video,
            senders: Mutex::new(SenderState::default()),
        })
    }

    async fn replace(
        transceiver: &RTCRtpTransceiver,
        track: Option<&LocalTrack>,
    ) -> Result<()> {
        let sink = track.map(|t| t.sink() as Arc<dyn TrackLocal + Send + Sync>);
        transceiver.sender().await.replace_track(sink).await?;
        Ok(())
    }

    fn sender_state(&self) -> Result<std::sync::MutexGuard<'_, SenderState>> {
        self.senders
            .lock()
            .map_err(|_| anyhow::anyhow!("sender state poisoned for {}", self.tag))
    }
}

#[async_trait]
impl PeerTransport for ConnectionWrapper {
    async fn create_offer(&self) -> Result<SessionDescription> {
        let offer = self.peer_connection.create_offer(None).await?;
        self.peer_connection
            .set_local_description(offer.clone())
            .await?;
        to_wire_description(offer)
    }

    async fn create_answer(&self) -> Result<SessionDescription> {
        let answer = self.peer_connection.create_answer(None).await?;
        self.peer_connection
            .set_local_description(answer.clone())
            .await?;
        to_wire_description(answer)
    }

    async fn set_remote_description(&self, desc: SessionDescription) -> Result<()> {
        let rtc = match desc.sdp_type {
            SdpType::Offer => RTCSessionDescription::offer(desc.sdp)?,
            SdpType::Answer => RTCSessionDescription::answer(desc.sdp)?,
        };
        self.peer_connection.set_remote_description(rtc).await?;
        Ok(())
    }

    async fn add_ice_candidate(&self, candidate: IceCandidate) -> Result<()> {
        self.peer_connection
            .add_ice_candidate(to_rtc_candidate(candidate))
            .await
            .context("Failed to add ICE candidate")?;
        Ok(())
    }

    async fn attach_tracks(&self, tracks: &[LocalTrack]) -> Result<()> {
        let audio = tracks.iter().find(|t| t.kind == TrackKind::Audio).cloned();
        let video = tracks.iter().find(|t| t.kind == TrackKind::Video).cloned();

        let muted = {
            let mut state = self.sender_state()?;
            state.audio = audio.clone();
            state.video = video.clone();
            state.audio_muted
        };

        let audio_out = if muted { None } else { audio.as_ref() };
        Self::replace(&self.audio, audio_out).await?;
        Self::replace(&self.video, video.as_ref()).await?;
        debug!("Attached {} local tracks to {}", tracks.len(), self.tag);
        Ok(())
    }

    async fn detach_tracks(&self) -> Result<()> {
        {
            let mut state = self.sender_state()?;
            state.audio = None;
            state.video = None;
        }
        Self::replace(&self.audio, None).await?;
        Self::replace(&self.video, None).await?;
        Ok(())
    }

    async fn set_audio_muted(&self, muted: bool) -> Result<()> {
        let audio = {
            let mut state = self.sender_state()?;
            state.audio_muted = muted;
            state.audio.clone()
        };
        let out = if muted { None } else { audio.as_ref() };
        Self::replace(&self.audio, out).await
    }

    async fn close(&self) -> Result<()> {
        self.peer_connection.close().await?;
        Ok(())
    }
}

async fn add_sendrecv(pc: &RTCPeerConnection, kind: TrackKind) -> Result<Arc<RTCRtpTransceiver>> {
    let transceiver = pc
        .add_transceiver_from_kind(
            kind.codec_type(),
            Some(RTCRtpTransceiverInit {
                direction: RTCRtpTransceiverDirection::Sendrecv,
                send_encodings: vec![],
            }),
        )
        .await
        .with_context(|| format!("Failed to add {} transceiver", kind))?;
    Ok(transceiver)
}

fn from_rtc_candidate(init: RTCIceCandidateInit) -> IceCandidate {
    IceCandidate {
        candidate: init.candidate,
        sdp_mid: init.sdp_mid,
        sdp_m_line_index: init.sdp_mline_index,
        username_fragment: init.username_fragment,
    }
}

fn to_rtc_candidate(candidate: IceCandidate) -> RTCIceCandidateInit {
    RTCIceCandidateInit {
        candidate: candidate.candidate,
        sdp_mid: candidate.sdp_mid,
        sdp_mline_index: candidate.sdp_m_line_index,
        username_fragment: candidate.username_fragment,
    }
}

fn to_wire_description(desc: RTCSessionDescription) -> Result<SessionDescription> {
    match desc.sdp_type {
        RTCSdpType::Offer => Ok(SessionDescription::offer(desc.sdp)),
        RTCSdpType::Answer => Ok(SessionDescription::answer(desc.sdp)),
        other => {
            warn!("Unsupported description type {}", other);
            bail!("unsupported description type {}", other)
        }
    }
}
