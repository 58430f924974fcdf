use crate::error::SessionError;
use crate::signaling::SignalingOutput;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};
use url::Url;
use watchparty_core::utils::ROOM_TOKEN_PARAM;
use watchparty_core::{
    IceCandidate, MemberId, RoomToken, SessionDescription, SessionRole, SignalMessage,
};

/// Inbound relay messages in arrival order. Closes when the relay connection does.
pub type RelayInbound = mpsc::UnboundedReceiver<SignalMessage>;

/// Writes signaling messages onto the relay websocket.
#[derive(Clone)]
pub struct RelaySink {
    tx: mpsc::UnboundedSender<Message>,
}

/// `{relay_url}/ws?roomToken=<token>`
pub fn relay_ws_url(relay_url: &str, room: &RoomToken) -> Result<Url, SessionError> {
    let mut url = Url::parse(relay_url)?.join("ws")?;
    url.query_pairs_mut()
        .append_pair(ROOM_TOKEN_PARAM, room.as_str());
    Ok(url)
}

/// Opens the relay websocket for `room` and starts its reader and writer tasks.
pub async fn connect_relay(
    relay_url: &str,
    room: &RoomToken,
) -> Result<(RelaySink, RelayInbound), SessionError> {
    let url = relay_ws_url(relay_url, room)?;
    let (ws_stream, _) = connect_async(url.as_str()).await?;
    info!("Connected to relay at {}", url);

    let (mut write, mut read) = ws_stream.split();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Message>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<SignalMessage>();

    tokio::spawn(async move {
        while let Some(msg) = out_rx.recv().await {
            let closing = matches!(msg, Message::Close(_));
            if let Err(e) = write.send(msg).await {
                warn!("Relay write failed: {}", e);
                break;
            }
            if closing {
                break;
            }
        }
        debug!("Relay writer finished");
    });

    tokio::spawn(async move {
        while let Some(frame) = read.next().await {
            match frame {
                Ok(Message::Text(text)) => match SignalMessage::from_json(text.as_str()) {
                    Ok(signal) => {
                        if in_tx.send(signal).is_err() {
                            break;
                        }
                    }
                    Err(e) => warn!("Invalid SignalMessage from relay: {}", e),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(e) => {
                    warn!("Relay read failed: {}", e);
                    break;
                }
            }
        }
        info!("Relay connection closed");
    });

    Ok((RelaySink { tx: out_tx }, in_rx))
}

impl RelaySink {
    /// Register this connection in `room`.
    pub fn join(&self, room: RoomToken, role: SessionRole) -> Result<(), SessionError> {
        self.send(&SignalMessage::Join {
            room_token: room,
            role,
        })
    }

    fn send(&self, msg: &SignalMessage) -> Result<(), SessionError> {
        let json = msg.to_json()?;
        self.tx
            .send(Message::Text(json.into()))
            .map_err(|_| SessionError::Ended)
    }

    fn send_logged(&self, msg: SignalMessage) {
        if let Err(e) = self.send(&msg) {
            warn!("Dropping {}: {}", msg.action(), e);
        }
    }
}

#[async_trait]
impl SignalingOutput for RelaySink {
    async fn send_offer(&self, from: MemberId, to: MemberId, offer: SessionDescription) {
        self.send_logged(SignalMessage::Offer {
            target_id: to,
            sender_id: from,
            offer,
        });
    }

    async fn send_answer(&self, from: MemberId, to: MemberId, answer: SessionDescription) {
        self.send_logged(SignalMessage::Answer {
            target_id: to,
            sender_id: from,
            answer,
        });
    }

    async fn send_ice(&self, from: MemberId, to: MemberId, candidate: IceCandidate) {
        self.send_logged(SignalMessage::IceCandidate {
            target_id: to,
            sender_id: from,
            candidate,
        });
    }

    async fn send_sync_media(&self, from: Option<MemberId>, payload: serde_json::Value) {
        self.send_logged(SignalMessage::SyncMedia {
            sender_id: from,
            payload,
        });
    }

    async fn close(&self) {
        let _ = self.tx.send(Message::Close(None));
    }
}
