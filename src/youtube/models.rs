use crate::models::CandidateVideo;
use serde::{Deserialize, Serialize};

/// One entry of the proxy's search response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResult {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub channel_title: Option<String>,
    #[serde(default)]
    pub views: Option<String>,
    #[serde(default)]
    pub published_at: Option<String>,
}

impl From<SearchResult> for CandidateVideo {
    fn from(result: SearchResult) -> Self {
        let thumbnail_url = result
            .thumbnail
            .unwrap_or_else(|| format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", result.id));
        CandidateVideo {
            id: result.id,
            title: result.title,
            thumbnail_url,
            channel_title: result.channel_title.filter(|s| !s.is_empty()),
            view_count_text: result.views.filter(|s| !s.is_empty()),
            published_text: result.published_at.filter(|s| !s.is_empty()),
        }
    }
}

#[derive(Debug)]
pub enum YoutubeError {
    NetworkError(String),
    ParseError(String),
    RateLimited,
    InvalidResponse(String),
}

impl std::fmt::Display for YoutubeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            YoutubeError::NetworkError(msg) => write!(f, "Network error: {}", msg),
            YoutubeError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            YoutubeError::RateLimited => write!(f, "Rate limited by video search"),
            YoutubeError::InvalidResponse(msg) => write!(f, "Invalid response: {}", msg),
        }
    }
}

impl std::error::Error for YoutubeError {}

impl From<reqwest::Error> for YoutubeError {
    fn from(err: reqwest::Error) -> Self {
        YoutubeError::NetworkError(err.to_string())
    }
}

impl From<serde_json::Error> for YoutubeError {
    fn from(err: serde_json::Error) -> Self {
        YoutubeError::ParseError(err.to_string())
    }
}
