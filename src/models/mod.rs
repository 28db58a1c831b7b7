use serde::{Deserialize, Serialize};

pub const WATCH_URL_PREFIX: &str = "https://www.youtube.com/watch?v=";

/// Canonical watch URL for an external video id.
pub fn watch_url(video_id: &str) -> String {
    format!("{}{}", WATCH_URL_PREFIX, video_id)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Empty,
    Searching,
    Reviewing,
    Confirmed,
}

impl Phase {
    pub fn as_str(&self) -> &str {
        match self {
            Phase::Empty => "empty",
            Phase::Searching => "searching",
            Phase::Reviewing => "reviewing",
            Phase::Confirmed => "confirmed",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where a track stands in the candidate search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStatus {
    #[default]
    Pending,
    Found,
    NotFound,
    Failed,
}

impl SearchStatus {
    pub fn is_settled(&self) -> bool {
        !matches!(self, SearchStatus::Pending)
    }
}

/// A search result from the video search service, not yet chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVideo {
    pub id: String,
    pub title: String,
    pub thumbnail_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_text: Option<String>,
}

impl CandidateVideo {
    pub fn watch_url(&self) -> String {
        watch_url(&self.id)
    }
}

/// A track entry as imported from a playlist or a text block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceTrack {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artist: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    /// Relevance order as returned by the search service.
    #[serde(default)]
    pub candidates: Vec<CandidateVideo>,
    #[serde(default)]
    pub status: SearchStatus,
}

impl SourceTrack {
    pub fn new(id: impl Into<String>, title: impl Into<String>, artist: Option<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            artist: artist.filter(|a| !a.trim().is_empty()),
            source_url: None,
            image_url: None,
            candidates: Vec::new(),
            status: SearchStatus::Pending,
        }
    }

    pub fn search_query(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} {}", artist, self.title),
            None => self.title.clone(),
        }
    }

    pub fn display_title(&self) -> String {
        match &self.artist {
            Some(artist) => format!("{} - {}", artist, self.title),
            None => self.title.clone(),
        }
    }

    pub fn top_candidate(&self) -> Option<&CandidateVideo> {
        self.candidates.first()
    }
}

/// The user-confirmed pairing of a source track to one external video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Match {
    pub source_id: String,
    pub external_video_id: String,
    pub title: String,
    pub url: String,
}

impl Match {
    pub fn new(track: &SourceTrack, external_video_id: &str) -> Self {
        Self {
            source_id: track.id.clone(),
            external_video_id: external_video_id.to_string(),
            title: track.display_title(),
            url: watch_url(external_video_id),
        }
    }
}

/// Result of fetching a remote playlist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaylistImport {
    pub name: String,
    pub owner: String,
    pub tracks: Vec<SourceTrack>,
}

/// What the channel import sink receives for each match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelTrack {
    pub url: String,
    pub title: String,
}

impl From<&Match> for ChannelTrack {
    fn from(m: &Match) -> Self {
        Self {
            url: m.url.clone(),
            title: m.title.clone(),
        }
    }
}
