pub use watchparty_core::{MemberId, RoomToken, SessionRole, SignalMessage};

pub mod model {
    pub use watchparty_core::model::*;
    pub use watchparty_core::utils;
}

#[cfg(feature = "relay")]
pub mod relay {
    pub use watchparty_relay::*;
}

#[cfg(feature = "peer")]
pub mod peer {
    pub use watchparty_peer::*;
}
