use crate::error::RelayError;
use crate::room::RoomRegistry;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use watchparty_core::{MemberId, RoomToken, SignalMessage};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectParams {
    pub room_token: Option<String>,
}

/// `GET /ws?roomToken=<token>`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<ConnectParams>,
    State(registry): State<RoomRegistry>,
) -> Result<impl IntoResponse, RelayError> {
    let room = params
        .room_token
        .as_deref()
        .and_then(RoomToken::parse)
        .ok_or(RelayError::MissingRoomToken)?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, room, registry)))
}

async fn handle_socket(socket: WebSocket, room: RoomToken, registry: RoomRegistry) {
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let member_id = match registry.register_connection(tx) {
        Ok(id) => id,
        Err(e) => {
            error!("Rejecting connection for room {}: {}", room, e);
            return;
        }
    };
    info!("New WebSocket connection {} for room {}", member_id, room);

    let (mut sender, mut receiver) = socket.split();

    let mut send_task = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            if sender.send(Message::Text(frame.into())).await.is_err() {
                break;
            }
        }
    });

    let mut recv_task = tokio::spawn({
        let registry = registry.clone();
        let member_id = member_id.clone();
        let room = room.clone();

        async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => {
                        handle_frame(&registry, &member_id, &room, text.as_str())
                    }
                    Message::Close(_) => break,
                    _ => {}
                }
            }
        }
    });

    tokio::select! {
        _ = (&mut send_task) => recv_task.abort(),
        _ = (&mut recv_task) => send_task.abort(),
    };

    registry.disconnect(&member_id);
    info!("WebSocket disconnected: {}", member_id);
}

/// Applies one inbound text frame. Nothing here can end the connection.
pub fn handle_frame(registry: &RoomRegistry, member_id: &MemberId, room: &RoomToken, text: &str) {
    let signal = match SignalMessage::from_json(text) {
        Ok(signal) => signal,
        Err(e) => {
            warn!("Invalid SignalMessage from {}: {}", member_id, e);
            return;
        }
    };

    match signal {
        SignalMessage::Join { room_token, role } => {
            if &room_token != room {
                let e = RelayError::RoomMismatch {
                    connected: room.clone(),
                    requested: room_token,
                };
                warn!("Dropping join from {}: {}", member_id, e);
                return;
            }
            if let Err(e) = registry.join(member_id, room, role) {
                warn!("Dropping join from {}: {}", member_id, e);
            }
        }

        SignalMessage::Offer { .. }
        | SignalMessage::Answer { .. }
        | SignalMessage::IceCandidate { .. }
        | SignalMessage::SyncMedia { .. } => {
            if let Err(e) = registry.relay(member_id, text) {
                warn!("Dropping {} from {}: {}", signal.action(), member_id, e);
            }
        }

        SignalMessage::Welcome { .. }
        | SignalMessage::UserJoined { .. }
        | SignalMessage::UserLeft { .. }
        | SignalMessage::HostLeft { .. } => {
            warn!(
                "Member {} sent relay-only action '{}', ignoring",
                member_id,
                signal.action()
            );
        }
    }
}
