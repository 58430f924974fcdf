use crate::config::SessionConfig;
use crate::error::SessionError;
use crate::media::LocalCapture;
use crate::session::{SessionEvents, SessionHandle, spawn_session};
use crate::signaling::connect_relay;
use crate::transport::WebRtcTransportFactory;
use std::sync::Arc;
use tracing::info;
use watchparty_core::{RoomToken, SessionRole};

/// Connects to the relay, registers in `room` and starts the session loop.
///
/// Call once room membership is confirmed by the directory. `capture` is
/// stopped when the session ends.
pub async fn begin_session(
    config: &SessionConfig,
    room: RoomToken,
    role: SessionRole,
    capture: Option<Arc<dyn LocalCapture>>,
) -> Result<(SessionHandle, SessionEvents), SessionError> {
    let (sink, inbound) = connect_relay(&config.relay_url, &room).await?;
    sink.join(room.clone(), role)?;
    info!("Joining room {} as {:?}", room, role);

    let factory = WebRtcTransportFactory::new(config.ice_servers.clone());
    Ok(spawn_session(
        Arc::new(sink),
        Arc::new(factory),
        capture,
        inbound,
    ))
}
