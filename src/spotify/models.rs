use serde::{Deserialize, Serialize};

pub const TRACK_URL_PREFIX: &str = "https://open.spotify.com/track/";

/// Failures while resolving or fetching a playlist through the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum SpotifyError {
    InvalidUrl(String),
    NetworkError(String),
    ParseError(String),
    ApiError(String),
    PlaylistNotFound(String),
    RateLimited,
}

impl std::fmt::Display for SpotifyError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SpotifyError::InvalidUrl(msg) => write!(f, "Not a playlist link: {}", msg),
            SpotifyError::NetworkError(msg) => write!(f, "Playlist proxy unreachable: {}", msg),
            SpotifyError::ParseError(msg) => write!(f, "Unexpected playlist payload: {}", msg),
            SpotifyError::ApiError(msg) => write!(f, "Playlist proxy returned {}", msg),
            SpotifyError::PlaylistNotFound(id) => write!(f, "No public playlist with id {}", id),
            SpotifyError::RateLimited => write!(f, "Rate limited by playlist proxy"),
        }
    }
}

impl std::error::Error for SpotifyError {}

impl From<reqwest::Error> for SpotifyError {
    fn from(err: reqwest::Error) -> Self {
        SpotifyError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for SpotifyError {
    fn from(err: serde_json::Error) -> Self {
        SpotifyError::ParseError(err.to_string())
    }
}
