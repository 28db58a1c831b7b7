//! Matching session state.
//!
//! A [`Session`] is an immutable value: every change is expressed as a
//! [`SessionEvent`] and applied with [`Session::apply`], which returns the
//! next session. The [`SessionStore`] owns the canonical copy and mirrors it
//! to durable storage after each transition.

pub mod storage;
pub mod store;

pub use storage::{FileStorage, MemoryStorage, SnapshotStorage};
pub use store::SessionStore;

use crate::errors::{AppError, AppResult};
use crate::models::{CandidateVideo, Match, Phase, SearchStatus, SourceTrack};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    tracks: Vec<SourceTrack>,
    matches: Vec<Match>,
    /// Live choices keyed by source track id; only folded into `matches` on confirmation.
    #[serde(default)]
    selections: BTreeMap<String, String>,
}

#[derive(Debug, Clone)]
pub enum SessionEvent {
    ReplaceTracks(Vec<SourceTrack>),
    SetCandidates {
        source_id: String,
        candidates: Vec<CandidateVideo>,
    },
    MarkFailed {
        source_id: String,
    },
    RemoveTrack {
        source_id: String,
    },
    Select {
        source_id: String,
        video_id: String,
    },
    CommitMatches(Vec<Match>),
}

impl SessionEvent {
    fn name(&self) -> &'static str {
        match self {
            SessionEvent::ReplaceTracks(_) => "replace tracks",
            SessionEvent::SetCandidates { .. } => "set candidates",
            SessionEvent::MarkFailed { .. } => "mark failed",
            SessionEvent::RemoveTrack { .. } => "remove track",
            SessionEvent::Select { .. } => "select candidate",
            SessionEvent::CommitMatches(_) => "commit matches",
        }
    }
}

impl Session {
    pub fn tracks(&self) -> &[SourceTrack] {
        &self.tracks
    }

    pub fn matches(&self) -> &[Match] {
        &self.matches
    }

    pub fn selections(&self) -> &BTreeMap<String, String> {
        &self.selections
    }

    pub fn track(&self, source_id: &str) -> Option<&SourceTrack> {
        self.tracks.iter().find(|t| t.id == source_id)
    }

    pub fn contains(&self, source_id: &str) -> bool {
        self.track(source_id).is_some()
    }

    pub fn selection(&self, source_id: &str) -> Option<&str> {
        self.selections.get(source_id).map(String::as_str)
    }

    /// Derived from tracks and matches, never stored.
    pub fn phase(&self) -> Phase {
        if !self.matches.is_empty() {
            Phase::Confirmed
        } else if self.tracks.is_empty() {
            Phase::Empty
        } else if self.tracks.iter().any(|t| !t.status.is_settled()) {
            Phase::Searching
        } else {
            Phase::Reviewing
        }
    }

    pub fn pending_ids(&self) -> Vec<String> {
        self.tracks
            .iter()
            .filter(|t| !t.status.is_settled())
            .map(|t| t.id.clone())
            .collect()
    }

    /// Index of the first unsettled track, or the track count once all have settled.
    pub fn search_index(&self) -> usize {
        self.tracks
            .iter()
            .position(|t| !t.status.is_settled())
            .unwrap_or(self.tracks.len())
    }

    pub fn apply(mut self, event: SessionEvent) -> AppResult<Session> {
        if self.phase() == Phase::Confirmed {
            return Err(AppError::InvalidPhase(format!(
                "cannot {} on a confirmed session",
                event.name()
            )));
        }

        match event {
            SessionEvent::ReplaceTracks(tracks) => {
                let mut seen = HashSet::new();
                self.tracks = tracks
                    .into_iter()
                    .filter(|t| {
                        let fresh = seen.insert(t.id.clone());
                        if !fresh {
                            log::warn!("Dropping duplicate track id {}", t.id);
                        }
                        fresh
                    })
                    .collect();
                self.matches.clear();
                self.selections.clear();
            }
            SessionEvent::SetCandidates {
                source_id,
                candidates,
            } => {
                let track = self.track_mut(&source_id)?;
                track.status = if candidates.is_empty() {
                    SearchStatus::NotFound
                } else {
                    SearchStatus::Found
                };
                track.candidates = candidates;
            }
            SessionEvent::MarkFailed { source_id } => {
                let track = self.track_mut(&source_id)?;
                track.candidates.clear();
                track.status = SearchStatus::Failed;
            }
            SessionEvent::RemoveTrack { source_id } => {
                self.tracks.retain(|t| t.id != source_id);
                self.selections.remove(&source_id);
            }
            SessionEvent::Select {
                source_id,
                video_id,
            } => {
                self.track_mut(&source_id)?;
                self.selections.insert(source_id, video_id);
            }
            SessionEvent::CommitMatches(matches) => {
                if matches.is_empty() {
                    return Err(AppError::Confirmation(
                        "no matches to commit".to_string(),
                    ));
                }
                if let Some(orphan) = matches.iter().find(|m| !self.contains(&m.source_id)) {
                    return Err(AppError::Confirmation(format!(
                        "match refers to unknown track {}",
                        orphan.source_id
                    )));
                }
                if self.phase() != Phase::Reviewing {
                    return Err(AppError::InvalidPhase(format!(
                        "cannot commit matches while {}",
                        self.phase()
                    )));
                }
                self.matches = matches;
            }
        }

        Ok(self)
    }

    fn track_mut(&mut self, source_id: &str) -> AppResult<&mut SourceTrack> {
        self.tracks
            .iter_mut()
            .find(|t| t.id == source_id)
            .ok_or_else(|| AppError::TrackNotFound(source_id.to_string()))
    }

    /// Rejects snapshots that break the session invariants.
    fn validate(&self) -> AppResult<()> {
        let mut seen = HashSet::new();
        for track in &self.tracks {
            if !seen.insert(track.id.as_str()) {
                return Err(AppError::SessionLoad(format!(
                    "duplicate track id {}",
                    track.id
                )));
            }
        }
        if let Some(orphan) = self.matches.iter().find(|m| !seen.contains(m.source_id.as_str())) {
            return Err(AppError::SessionLoad(format!(
                "match refers to unknown track {}",
                orphan.source_id
            )));
        }
        Ok(())
    }
}

/// Durable record; the phase is re-derived on load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(flatten)]
    pub session: Session,
    pub saved_at: DateTime<Utc>,
}

impl SessionSnapshot {
    pub fn new(session: &Session) -> Self {
        Self {
            session: session.clone(),
            saved_at: Utc::now(),
        }
    }

    pub fn decode(raw: &str) -> AppResult<Session> {
        let snapshot: SessionSnapshot = serde_json::from_str(raw)
            .map_err(|e| AppError::SessionLoad(format!("corrupt snapshot: {}", e)))?;
        snapshot.session.validate()?;
        Ok(snapshot.session)
    }
}
