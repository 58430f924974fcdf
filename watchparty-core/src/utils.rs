pub const DEFAULT_STUN_ADDR: &str = "stun:stun.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_2: &str = "stun:stun1.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_3: &str = "stun:stun2.l.google.com:19302";
pub const DEFAULT_STUN_ADDR_4: &str = "stun:stun3.l.google.com:19302";

/// Length of relay-assigned member identities.
pub const DEFAULT_MEMBER_ID_LEN: usize = 9;

/// Query parameter carrying the room token on the relay websocket URL.
pub const ROOM_TOKEN_PARAM: &str = "roomToken";
