use crate::model::room::RoomToken;
use serde::{Deserialize, Serialize};

/// Body of `POST /rooms`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomRequest {
    pub room_token: RoomToken,
    /// What the host is watching; handed to every guest that joins.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

/// Reply of the room directory to `createRoom` / `joinRoom`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RoomResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_url: Option<String>,
}

impl RoomResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            content_url: None,
        }
    }

    /// Successful join, pointing the guest at the host's content.
    pub fn joined(content_url: Option<String>) -> Self {
        Self {
            content_url,
            ..Self::ok()
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            content_url: None,
        }
    }
}
