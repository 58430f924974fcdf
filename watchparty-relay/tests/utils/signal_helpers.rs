use anyhow::Result;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;

use watchparty_core::{MemberId, SignalMessage};
use watchparty_relay::{RoomRegistry, serve_on};

use super::test_client::TestClient;

/// Timeout for a single relay round trip (ms).
pub const SIGNAL_TIMEOUT_MS: u64 = 2000;

/// Window in which a frame that should not arrive would have arrived (ms).
pub const SILENCE_MS: u64 = 300;

/// Starts a relay on an ephemeral port with a fresh registry.
pub async fn spawn_test_relay() -> Result<(SocketAddr, RoomRegistry)> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let registry = RoomRegistry::default();

    tokio::spawn(serve_on(listener, registry.clone()));

    Ok((addr, registry))
}

/// Expect a `user-joined` naming `remote`.
pub async fn expect_user_joined(client: &mut TestClient, remote: &MemberId) -> Result<()> {
    match client.recv(SIGNAL_TIMEOUT_MS).await? {
        SignalMessage::UserJoined { remote_id } if &remote_id == remote => Ok(()),
        other => anyhow::bail!("Expected user-joined for {}, got {:?}", remote, other),
    }
}

/// Expect a `user-left` naming `remote`.
pub async fn expect_user_left(client: &mut TestClient, remote: &MemberId) -> Result<()> {
    match client.recv(SIGNAL_TIMEOUT_MS).await? {
        SignalMessage::UserLeft { remote_id } if &remote_id == remote => Ok(()),
        other => anyhow::bail!("Expected user-left for {}, got {:?}", remote, other),
    }
}

/// Collect `count` `user-joined` notices in arrival order.
pub async fn collect_user_joined(client: &mut TestClient, count: usize) -> Result<Vec<MemberId>> {
    let mut ids = Vec::with_capacity(count);
    while ids.len() < count {
        match client.recv(SIGNAL_TIMEOUT_MS).await? {
            SignalMessage::UserJoined { remote_id } => ids.push(remote_id),
            other => anyhow::bail!("Expected user-joined, got {:?}", other),
        }
    }
    Ok(ids)
}

/// Poll `check` until it holds or `timeout_ms` passes.
pub async fn wait_until(timeout_ms: u64, mut check: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(timeout_ms);
    while Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    check()
}
