use thiserror::Error;
use tokio_tungstenite::tungstenite;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Invalid relay url: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Unsupported relay scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Relay connection failed: {0}")]
    Relay(#[from] tungstenite::Error),

    #[error("Directory request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The directory answered with `success: false`.
    #[error("{0}")]
    Directory(String),

    #[error("Failed to encode signal: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(#[from] anyhow::Error),

    #[error("Session has already ended")]
    Ended,
}
