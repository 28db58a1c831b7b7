use super::storage::SnapshotStorage;
use super::{Session, SessionEvent, SessionSnapshot};
use crate::errors::AppResult;
use crate::models::{CandidateVideo, Match, Phase, SourceTrack};

/// Single owner of the canonical session. Every mutation is computed on a
/// copy, written to storage, and only then made current, so the in-memory
/// and durable views never disagree.
pub struct SessionStore {
    session: Session,
    storage: Box<dyn SnapshotStorage>,
    key: String,
}

impl SessionStore {
    /// Open the store and resume whatever snapshot is saved under `key`.
    pub fn open(storage: Box<dyn SnapshotStorage>, key: impl Into<String>) -> Self {
        let key = key.into();
        let session = Self::read(storage.as_ref(), &key);
        Self {
            session,
            storage,
            key,
        }
    }

    /// Read the durable snapshot. Missing or corrupt data yields an empty session.
    pub fn read(storage: &dyn SnapshotStorage, key: &str) -> Session {
        let raw = match storage.load(key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Session::default(),
            Err(e) => {
                log::warn!("Could not read session snapshot '{}': {}", key, e);
                return Session::default();
            }
        };

        match SessionSnapshot::decode(&raw) {
            Ok(session) => {
                log::info!(
                    "Resumed session with {} tracks ({})",
                    session.tracks().len(),
                    session.phase()
                );
                session
            }
            Err(e) => {
                log::warn!("Discarding session snapshot '{}': {}", key, e);
                Session::default()
            }
        }
    }

    /// Re-read the snapshot from storage, replacing the in-memory session.
    pub fn load(&mut self) -> &Session {
        self.session = Self::read(self.storage.as_ref(), &self.key);
        &self.session
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn phase(&self) -> Phase {
        self.session.phase()
    }

    pub fn replace_tracks(&mut self, tracks: Vec<SourceTrack>) -> AppResult<()> {
        self.transition(SessionEvent::ReplaceTracks(tracks))?;
        log::info!(
            "Session now holds {} tracks ({})",
            self.session.tracks().len(),
            self.session.phase()
        );
        Ok(())
    }

    /// Returns `false` when the track is gone, in which case the result is discarded.
    pub fn set_candidates(
        &mut self,
        source_id: &str,
        candidates: Vec<CandidateVideo>,
    ) -> AppResult<bool> {
        if !self.session.contains(source_id) {
            log::debug!("Discarding candidates for removed track {}", source_id);
            return Ok(false);
        }
        self.transition(SessionEvent::SetCandidates {
            source_id: source_id.to_string(),
            candidates,
        })?;
        Ok(true)
    }

    /// Settle a track whose search failed. Returns `false` if it was removed meanwhile.
    pub fn mark_failed(&mut self, source_id: &str) -> AppResult<bool> {
        if !self.session.contains(source_id) {
            log::debug!("Ignoring failure for removed track {}", source_id);
            return Ok(false);
        }
        self.transition(SessionEvent::MarkFailed {
            source_id: source_id.to_string(),
        })?;
        Ok(true)
    }

    /// Removing an id that is not present is a no-op and returns `false`.
    pub fn remove_track(&mut self, source_id: &str) -> AppResult<bool> {
        if !self.session.contains(source_id) {
            return Ok(false);
        }
        self.transition(SessionEvent::RemoveTrack {
            source_id: source_id.to_string(),
        })?;
        Ok(true)
    }

    pub fn select(&mut self, source_id: &str, video_id: &str) -> AppResult<()> {
        self.transition(SessionEvent::Select {
            source_id: source_id.to_string(),
            video_id: video_id.to_string(),
        })
    }

    pub fn commit_matches(&mut self, matches: Vec<Match>) -> AppResult<()> {
        self.transition(SessionEvent::CommitMatches(matches))?;
        log::info!("Committed {} matches", self.session.matches().len());
        Ok(())
    }

    /// Empty the session and erase the durable snapshot.
    pub fn clear(&mut self) -> AppResult<()> {
        self.storage.remove(&self.key)?;
        self.session = Session::default();
        log::info!("Session cleared");
        Ok(())
    }

    fn transition(&mut self, event: SessionEvent) -> AppResult<()> {
        let next = self.session.clone().apply(event)?;
        self.persist(&next)?;
        self.session = next;
        Ok(())
    }

    fn persist(&self, session: &Session) -> AppResult<()> {
        let raw = serde_json::to_string(&SessionSnapshot::new(session))?;
        self.storage
            .save(&self.key, &raw)
            .inspect_err(|e| log::error!("Failed to persist session '{}': {}", self.key, e))
    }
}
