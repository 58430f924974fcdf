use anyhow::{Context, Result};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

use watchparty_core::{MemberId, RoomToken, SessionRole, SignalMessage};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A bare relay participant speaking the wire protocol directly.
pub struct TestClient {
    /// Identity announced by the relay's `welcome`.
    pub member_id: Option<MemberId>,
    room: String,
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
}

impl TestClient {
    /// Open a relay connection for `room` without joining yet.
    pub async fn connect(addr: SocketAddr, room: &str) -> Result<Self> {
        let url = format!("ws://{}/ws?roomToken={}", addr, room);
        let (stream, _) = connect_async(url.as_str())
            .await
            .context("Failed to connect to relay")?;
        let (write, read) = stream.split();

        Ok(Self {
            member_id: None,
            room: room.to_owned(),
            write,
            read,
        })
    }

    /// Connect and join as a guest, returning once `welcome` arrives.
    pub async fn join(addr: SocketAddr, room: &str) -> Result<Self> {
        Self::join_as(addr, room, SessionRole::Guest).await
    }

    pub async fn join_as(addr: SocketAddr, room: &str, role: SessionRole) -> Result<Self> {
        let mut client = Self::connect(addr, room).await?;
        client
            .send(&SignalMessage::Join {
                room_token: RoomToken(room.to_owned()),
                role,
            })
            .await?;

        match client.recv(2000).await? {
            SignalMessage::Welcome { member_id } => {
                tracing::debug!("[TestClient] welcomed as {} in {}", member_id, client.room);
                client.member_id = Some(member_id);
                Ok(client)
            }
            other => anyhow::bail!("Expected welcome, got {:?}", other),
        }
    }

    pub fn id(&self) -> MemberId {
        self.member_id.clone().expect("client has not joined")
    }

    pub fn room_token(&self) -> RoomToken {
        RoomToken(self.room.clone())
    }

    pub async fn send(&mut self, msg: &SignalMessage) -> Result<()> {
        self.send_text(&msg.to_json()?).await
    }

    pub async fn send_text(&mut self, text: &str) -> Result<()> {
        self.write
            .send(Message::Text(text.to_owned().into()))
            .await
            .context("Failed to send frame")
    }

    /// Next text frame, raw.
    pub async fn recv_text(&mut self, timeout_ms: u64) -> Result<String> {
        let deadline = Duration::from_millis(timeout_ms);
        loop {
            let next = tokio::time::timeout(deadline, self.read.next())
                .await
                .context("Timeout waiting for relay frame")?;
            match next {
                Some(Ok(Message::Text(text))) => return Ok(text.to_string()),
                Some(Ok(Message::Close(_))) | None => anyhow::bail!("Relay closed the connection"),
                Some(Ok(_)) => continue,
                Some(Err(e)) => return Err(e.into()),
            }
        }
    }

    pub async fn recv(&mut self, timeout_ms: u64) -> Result<SignalMessage> {
        let text = self.recv_text(timeout_ms).await?;
        Ok(SignalMessage::from_json(&text)?)
    }

    /// True when nothing arrives within `ms`.
    pub async fn is_silent_for(&mut self, ms: u64) -> bool {
        self.recv_text(ms).await.is_err()
    }

    pub async fn close(mut self) -> Result<()> {
        self.write
            .send(Message::Close(None))
            .await
            .context("Failed to close relay connection")?;
        Ok(())
    }
}
