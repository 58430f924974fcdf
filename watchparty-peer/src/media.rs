use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use webrtc::api::media_engine::{MIME_TYPE_OPUS, MIME_TYPE_VP8};
use webrtc::rtp_transceiver::rtp_codec::{RTCRtpCodecCapability, RTPCodecType};
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrackKind {
    Audio,
    Video,
}

impl TrackKind {
    pub(crate) fn codec_type(self) -> RTPCodecType {
        match self {
            TrackKind::Audio => RTPCodecType::Audio,
            TrackKind::Video => RTPCodecType::Video,
        }
    }

    pub(crate) fn from_codec_type(kind: RTPCodecType) -> Option<Self> {
        match kind {
            RTPCodecType::Audio => Some(TrackKind::Audio),
            RTPCodecType::Video => Some(TrackKind::Video),
            _ => None,
        }
    }
}

impl fmt::Display for TrackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// One locally captured track, shared by every peer connection it is attached to.
///
/// The capture side writes encoded samples into [`LocalTrack::sink`]; the
/// session only decides which connections carry it.
#[derive(Clone)]
pub struct LocalTrack {
    pub id: String,
    pub kind: TrackKind,
    pub stream_id: String,
    sink: Arc<TrackLocalStaticSample>,
}

impl LocalTrack {
    pub fn new(kind: TrackKind, id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        let id = id.into();
        let stream_id = stream_id.into();
        let mime_type = match kind {
            TrackKind::Audio => MIME_TYPE_OPUS,
            TrackKind::Video => MIME_TYPE_VP8,
        };
        let sink = Arc::new(TrackLocalStaticSample::new(
            RTCRtpCodecCapability {
                mime_type: mime_type.to_owned(),
                ..Default::default()
            },
            id.clone(),
            stream_id.clone(),
        ));

        Self {
            id,
            kind,
            stream_id,
            sink,
        }
    }

    pub fn audio(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::new(TrackKind::Audio, id, stream_id)
    }

    pub fn video(id: impl Into<String>, stream_id: impl Into<String>) -> Self {
        Self::new(TrackKind::Video, id, stream_id)
    }

    pub fn sink(&self) -> Arc<TrackLocalStaticSample> {
        self.sink.clone()
    }
}

impl fmt::Debug for LocalTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalTrack")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("stream_id", &self.stream_id)
            .finish()
    }
}

/// Owner of the capture devices that write into [`LocalTrack`] sinks.
#[async_trait]
pub trait LocalCapture: Send + Sync {
    /// Release every capture device. Called once when the session ends,
    /// whether or not capture is currently running.
    async fn stop(&self);
}

/// What the session currently shares with every peer.
#[derive(Debug, Clone, Default)]
pub(crate) struct LocalMedia {
    pub tracks: Vec<LocalTrack>,
    pub audio_muted: bool,
}

impl LocalMedia {
    pub fn is_active(&self) -> bool {
        !self.tracks.is_empty()
    }

    pub fn stop(&mut self) {
        self.tracks.clear();
        self.audio_muted = false;
    }
}
