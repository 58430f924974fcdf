use watchparty_core::IceServerConfig;
use watchparty_core::utils::{
    DEFAULT_STUN_ADDR, DEFAULT_STUN_ADDR_2, DEFAULT_STUN_ADDR_3, DEFAULT_STUN_ADDR_4,
};

/// Settings for one participant's session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Base URL of the relay, e.g. `ws://127.0.0.1:3000`. The websocket
    /// endpoint and the room directory are both derived from it.
    pub relay_url: String,
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            relay_url: "ws://127.0.0.1:3000".to_owned(),
            ice_servers: vec![IceServerConfig {
                urls: [
                    DEFAULT_STUN_ADDR,
                    DEFAULT_STUN_ADDR_2,
                    DEFAULT_STUN_ADDR_3,
                    DEFAULT_STUN_ADDR_4,
                ]
                .map(str::to_owned)
                .to_vec(),
                username: None,
                credential: None,
            }],
        }
    }
}
