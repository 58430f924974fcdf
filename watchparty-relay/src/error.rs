use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;
use thiserror::Error;
use watchparty_core::{MemberId, RoomToken};

#[derive(Debug, Error)]
pub enum RelayError {
    #[error("connection carries no room token")]
    MissingRoomToken,

    #[error("could not allocate a free member identity after {attempts} attempts")]
    IdentityExhausted { attempts: usize },

    #[error("unknown member {0}")]
    UnknownMember(MemberId),

    #[error("member {member} already joined room {room}")]
    AlreadyJoined { member: MemberId, room: RoomToken },

    #[error("join for room {requested} on a connection opened for room {connected}")]
    RoomMismatch {
        connected: RoomToken,
        requested: RoomToken,
    },

    #[error("member {0} has not joined a room")]
    NotInRoom(MemberId),
}

impl IntoResponse for RelayError {
    fn into_response(self) -> Response {
        let status = match self {
            RelayError::IdentityExhausted { .. } => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::BAD_REQUEST,
        };
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
