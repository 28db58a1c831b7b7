use crate::models::{Match, Phase, SearchStatus, SourceTrack};
use crate::session::Session;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a search pass schedules its per-track searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchStrategy {
    /// One request outstanding at a time, in list order.
    Sequential,
    /// Every search in flight at once; the pass waits for all to settle.
    Concurrent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlaylistOrigin {
    Spotify,
    Text,
}

impl PlaylistOrigin {
    pub fn strategy(&self) -> SearchStrategy {
        match self {
            PlaylistOrigin::Spotify => SearchStrategy::Sequential,
            PlaylistOrigin::Text => SearchStrategy::Concurrent,
        }
    }
}

/// Search progress update sent to subscribers
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchProgress {
    pub current: usize,
    pub total: usize,
    pub current_track: String,
    pub found_count: usize,
}

impl SearchProgress {
    pub fn from_session(session: &Session) -> Self {
        let tracks = session.tracks();
        let current_track = tracks
            .iter()
            .find(|t| !t.status.is_settled())
            .map(SourceTrack::display_title)
            .unwrap_or_else(|| "Complete".to_string());

        Self {
            current: tracks.iter().filter(|t| t.status.is_settled()).count(),
            total: tracks.len(),
            current_track,
            found_count: tracks
                .iter()
                .filter(|t| t.status == SearchStatus::Found)
                .count(),
        }
    }
}

/// Read-only view handed to the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub phase: Phase,
    pub search_index: usize,
    pub progress: SearchProgress,
    pub tracks: Vec<SourceTrack>,
    pub matches: Vec<Match>,
    pub selections: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
}

impl SessionView {
    pub fn new(session: &Session, last_error: Option<String>) -> Self {
        Self {
            phase: session.phase(),
            search_index: session.search_index(),
            progress: SearchProgress::from_session(session),
            tracks: session.tracks().to_vec(),
            matches: session.matches().to_vec(),
            selections: session.selections().clone(),
            last_error,
        }
    }
}

/// Outcome of one search pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchReport {
    /// Searches that settled and were attached (including empty results).
    pub searched: usize,
    pub found: usize,
    pub failed: usize,
    /// Results dropped because their track was skipped or the session replaced.
    pub discarded: usize,
    /// Session-level message, set when the first search to settle failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    pub(crate) settled: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportFailure {
    #[serde(rename = "match")]
    pub track: Match,
    pub reason: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImportSummary {
    pub succeeded: usize,
    pub failed: Vec<ImportFailure>,
}

impl ImportSummary {
    pub fn attempted(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}
