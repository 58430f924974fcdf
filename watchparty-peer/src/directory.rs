use crate::error::SessionError;
use tracing::debug;
use url::Url;
use watchparty_core::{CreateRoomRequest, RoomResponse, RoomToken};

/// HTTP client for the relay's room directory.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    base: Url,
}

impl DirectoryClient {
    /// `base` is the relay's HTTP origin, e.g. `http://127.0.0.1:3000`.
    pub fn new(base: &str) -> Result<Self, SessionError> {
        Ok(Self {
            http: reqwest::Client::new(),
            base: Url::parse(base)?,
        })
    }

    /// Derives the directory origin from a `ws://` / `wss://` relay URL.
    pub fn for_relay(relay_url: &str) -> Result<Self, SessionError> {
        let mut base = Url::parse(relay_url)?;
        let scheme = match base.scheme() {
            "ws" | "http" => "http",
            "wss" | "https" => "https",
            other => return Err(SessionError::UnsupportedScheme(other.to_owned())),
        };
        base.set_scheme(scheme)
            .map_err(|()| SessionError::UnsupportedScheme(scheme.to_owned()))?;

        Ok(Self {
            http: reqwest::Client::new(),
            base,
        })
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Reserves `room`, advertising `content_url` to the guests that join it.
    pub async fn create_room(
        &self,
        room: &RoomToken,
        content_url: Option<&str>,
    ) -> Result<(), SessionError> {
        let url = self.base.join("rooms")?;
        let response: RoomResponse = self
            .http
            .post(url)
            .json(&CreateRoomRequest {
                room_token: room.clone(),
                content_url: content_url.map(str::to_owned),
            })
            .send()
            .await?
            .json()
            .await?;
        debug!("create_room {} -> {:?}", room, response);
        into_result(response).map(|_| ())
    }

    /// Checks that `room` is open and returns the host's content url, if any.
    pub async fn join_room(&self, room: &RoomToken) -> Result<Option<String>, SessionError> {
        let mut url = self.base.join("rooms")?;
        url.path_segments_mut()
            .map_err(|_| url::ParseError::RelativeUrlWithCannotBeABaseBase)?
            .push(room.as_str())
            .push("join");
        let response: RoomResponse = self.http.post(url).send().await?.json().await?;
        debug!("join_room {} -> {:?}", room, response);
        into_result(response)
    }
}

fn into_result(response: RoomResponse) -> Result<Option<String>, SessionError> {
    if response.success {
        Ok(response.content_url)
    } else {
        Err(SessionError::Directory(
            response.error.unwrap_or_else(|| "Unknown error".to_owned()),
        ))
    }
}
