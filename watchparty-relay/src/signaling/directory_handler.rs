use crate::room::RoomRegistry;
use axum::Json;
use axum::extract::{Path, State};
use watchparty_core::{CreateRoomRequest, RoomResponse, RoomToken};

/// `POST /rooms`
pub async fn create_room(
    State(registry): State<RoomRegistry>,
    Json(request): Json<CreateRoomRequest>,
) -> Json<RoomResponse> {
    match RoomToken::parse(request.room_token.as_str()) {
        Some(room) => Json(registry.create_room(room, request.content_url)),
        None => Json(RoomResponse::failed("Room token must not be empty")),
    }
}

/// `POST /rooms/{token}/join`
pub async fn join_room(
    State(registry): State<RoomRegistry>,
    Path(token): Path<String>,
) -> Json<RoomResponse> {
    match RoomToken::parse(&token) {
        Some(room) => Json(registry.join_room(&room)),
        None => Json(RoomResponse::failed("Room token must not be empty")),
    }
}
