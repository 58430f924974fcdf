mod directory;
mod member;
mod room;
mod signaling;

pub use directory::{CreateRoomRequest, RoomResponse};
pub use member::MemberId;
pub use room::{RoomToken, SessionRole};
pub use signaling::{IceCandidate, IceServerConfig, SdpType, SessionDescription, SignalMessage};
