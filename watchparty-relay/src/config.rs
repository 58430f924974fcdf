use std::net::SocketAddr;
use std::time::Duration;
use watchparty_core::utils::DEFAULT_MEMBER_ID_LEN;

/// Tunables of a single [`RoomRegistry`](crate::RoomRegistry).
#[derive(Clone, Debug)]
pub struct RegistryConfig {
    pub member_id_len: usize,
    /// Attempts at drawing an unused identity before giving up.
    pub max_id_attempts: usize,
    /// How long a directory reservation survives without any member joining.
    pub reservation_ttl: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            member_id_len: DEFAULT_MEMBER_ID_LEN,
            max_id_attempts: 8,
            reservation_ttl: Duration::from_secs(10 * 60),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RelayConfig {
    pub bind: SocketAddr,
    pub registry: RegistryConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], 3000)),
            registry: RegistryConfig::default(),
        }
    }
}
