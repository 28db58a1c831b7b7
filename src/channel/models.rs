use serde::{Deserialize, Serialize};

/// Row created in the `tracks` table.
#[derive(Debug, Clone, Deserialize)]
pub struct CreatedTrack {
    pub id: String,
}

/// Link between a channel and one of its tracks.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelTrackLink<'a> {
    pub channel_id: &'a str,
    pub track_id: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<&'a str>,
}

#[derive(Debug)]
pub enum ChannelError {
    NotConfigured(String),
    NetworkError(String),
    ParseError(String),
    Unauthorized,
    RateLimited,
    Rejected(String),
}

impl std::fmt::Display for ChannelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChannelError::NotConfigured(field) => {
                write!(f, "Channel import is not configured: missing channel.{}", field)
            }
            ChannelError::NetworkError(msg) => write!(f, "Channel backend unreachable: {}", msg),
            ChannelError::ParseError(msg) => write!(f, "Unexpected channel response: {}", msg),
            ChannelError::Unauthorized => write!(f, "Channel access token was refused"),
            ChannelError::RateLimited => write!(f, "Rate limited by channel backend"),
            ChannelError::Rejected(msg) => write!(f, "Channel backend rejected the track: {}", msg),
        }
    }
}

impl std::error::Error for ChannelError {}

impl From<reqwest::Error> for ChannelError {
    fn from(err: reqwest::Error) -> Self {
        ChannelError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for ChannelError {
    fn from(err: serde_json::Error) -> Self {
        ChannelError::ParseError(err.to_string())
    }
}
