//! Matching controller.
//!
//! Drives a session through `Empty → Searching → Reviewing → Confirmed`
//! and mediates every call to the search, playlist and import services.
//! All session mutations go through the [`SessionStore`]; the controller
//! never holds the store lock across an `.await`, so a skip or clear can
//! land while a search is in flight. Responses that arrive for a removed
//! track, or for a session that has since been replaced, are discarded.

pub mod import;
pub mod models;
pub mod search;

pub use models::*;

use crate::config::AppConfig;
use crate::errors::{AppError, AppResult};
use crate::models::{Match, Phase, SearchStatus, SourceTrack};
use crate::providers::{ImportSink, PlaylistSource, VideoSearch};
use crate::session::SessionStore;
use crate::text::parse_text_playlist;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;

pub struct MatchingController {
    store: Mutex<SessionStore>,
    search: Arc<dyn VideoSearch>,
    sink: Option<Arc<dyn ImportSink>>,
    config: AppConfig,
    /// Bumped whenever the track list is replaced or cleared.
    generation: AtomicU64,
    last_error: Mutex<Option<String>>,
    updates: watch::Sender<SessionView>,
}

impl MatchingController {
    pub fn new(store: SessionStore, search: Arc<dyn VideoSearch>, config: AppConfig) -> Self {
        let (updates, _) = watch::channel(SessionView::new(store.session(), None));
        Self {
            store: Mutex::new(store),
            search,
            sink: None,
            config,
            generation: AtomicU64::new(0),
            last_error: Mutex::new(None),
            updates,
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn ImportSink>) -> Self {
        log::info!("Using import sink: {}", sink.id());
        self.sink = Some(sink);
        self
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.store.lock().phase()
    }

    pub fn snapshot(&self) -> SessionView {
        let store = self.store.lock();
        SessionView::new(store.session(), self.last_error.lock().clone())
    }

    /// Receive a fresh [`SessionView`] after every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.updates.subscribe()
    }

    /// Fetch a playlist and match it, one search at a time.
    pub async fn import_spotify(
        &self,
        source: &dyn PlaylistSource,
        input: &str,
    ) -> AppResult<SearchReport> {
        self.ensure_not_confirmed("import a playlist")?;

        let playlist_id = match source.extract_playlist_id(input) {
            Ok(id) => id,
            Err(e) => return Err(self.fail_ingest(e.to_string())),
        };

        let playlist = match source.fetch_playlist(&playlist_id).await {
            Ok(playlist) => playlist,
            Err(e) => {
                log::error!("Failed to fetch playlist {}: {}", playlist_id, e);
                return Err(self.fail_ingest(format!(
                    "Failed to fetch {} playlist: {}",
                    source.id(),
                    e
                )));
            }
        };

        log::info!(
            "Importing '{}' by {} ({} tracks)",
            playlist.name,
            playlist.owner,
            playlist.tracks.len()
        );
        self.ingest(playlist.tracks, PlaylistOrigin::Spotify.strategy())
            .await
    }

    /// Parse a free-text block and match every line concurrently.
    pub async fn import_text(&self, raw: &str) -> AppResult<SearchReport> {
        self.ensure_not_confirmed("import a text playlist")?;

        let tracks = match parse_text_playlist(raw) {
            Ok(tracks) => tracks,
            Err(e) => return Err(self.fail_ingest(e.to_string())),
        };
        self.ingest(tracks, PlaylistOrigin::Text.strategy()).await
    }

    /// Replace the session's tracks and run a search pass over them.
    pub async fn ingest(
        &self,
        tracks: Vec<SourceTrack>,
        strategy: SearchStrategy,
    ) -> AppResult<SearchReport> {
        self.ensure_not_confirmed("ingest tracks")?;

        let limit = self.config.max_tracks.unwrap_or(usize::MAX);
        let tracks: Vec<SourceTrack> = tracks
            .into_iter()
            .take(limit)
            .map(|mut t| {
                t.candidates.clear();
                t.status = SearchStatus::Pending;
                t
            })
            .collect();

        if tracks.is_empty() {
            return Err(self.fail_ingest("No tracks to match".to_string()));
        }

        self.generation.fetch_add(1, Ordering::SeqCst);
        *self.last_error.lock() = None;
        self.store.lock().replace_tracks(tracks)?;
        self.publish();

        Ok(self.run_search_pass(strategy).await)
    }

    /// Continue a reloaded session that still has unsearched tracks.
    pub async fn resume(&self) -> SearchReport {
        if self.phase() != Phase::Searching {
            return SearchReport::default();
        }
        log::info!("Resuming search for unsearched tracks");
        self.run_search_pass(SearchStrategy::Sequential).await
    }

    /// Drop a track from the active set. Skipping an unknown id is a no-op.
    pub fn skip(&self, source_id: &str) -> AppResult<bool> {
        let removed = self.store.lock().remove_track(source_id)?;
        if removed {
            log::info!("Skipped track {}", source_id);
            self.publish();
        }
        Ok(removed)
    }

    /// Record the user's live choice for a track. Last write wins.
    pub fn select_candidate(&self, source_id: &str, video_id: &str) -> AppResult<()> {
        {
            let mut store = self.store.lock();
            let listed = store
                .session()
                .track(source_id)
                .is_some_and(|t| t.candidates.iter().any(|c| c.id == video_id));
            if !listed {
                log::debug!("Manual video {} for track {}", video_id, source_id);
            }
            store.select(source_id, video_id)?;
        }
        self.publish();
        Ok(())
    }

    /// Resolve one match per remaining track: the live selection, else the
    /// top-ranked candidate. Tracks with neither are left out.
    pub fn confirm(&self) -> AppResult<Vec<Match>> {
        let matches = {
            let mut store = self.store.lock();
            let session = store.session();

            match session.phase() {
                Phase::Confirmed => return Ok(session.matches().to_vec()),
                Phase::Reviewing => {}
                phase => {
                    return Err(AppError::InvalidPhase(format!(
                        "cannot confirm while {}",
                        phase
                    )))
                }
            }

            let mut matches = Vec::with_capacity(session.tracks().len());
            for track in session.tracks() {
                let chosen = session
                    .selection(&track.id)
                    .or_else(|| track.top_candidate().map(|c| c.id.as_str()));
                match chosen {
                    Some(video_id) => matches.push(Match::new(track, video_id)),
                    None => log::warn!(
                        "Dropping '{}' from confirmation: no candidates",
                        track.display_title()
                    ),
                }
            }

            if matches.is_empty() {
                return Err(AppError::Confirmation(
                    "None of the remaining tracks has a video to confirm".to_string(),
                ));
            }

            store.commit_matches(matches.clone())?;
            matches
        };

        self.publish();
        Ok(matches)
    }

    /// Start over. In-flight searches keep running but their results are ignored.
    pub fn clear(&self) -> AppResult<()> {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.store.lock().clear()?;
        *self.last_error.lock() = None;
        self.publish();
        Ok(())
    }

    pub(crate) fn current_generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    pub(crate) fn publish(&self) {
        let view = self.snapshot();
        self.updates.send_replace(view);
    }

    pub(crate) fn set_last_error(&self, message: String) {
        *self.last_error.lock() = Some(message);
    }

    fn ensure_not_confirmed(&self, action: &str) -> AppResult<()> {
        if self.phase() == Phase::Confirmed {
            return Err(AppError::InvalidPhase(format!(
                "cannot {} on a confirmed session; clear it first",
                action
            )));
        }
        Ok(())
    }

    /// Ingest failures leave the session empty with the message attached.
    fn fail_ingest(&self, message: String) -> AppError {
        log::warn!("Ingest failed: {}", message);
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Err(e) = self.store.lock().clear() {
            log::error!("Failed to reset session after ingest error: {}", e);
        }
        self.set_last_error(message.clone());
        self.publish();
        AppError::Ingest(message)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::models::{CandidateVideo, ChannelTrack, PlaylistImport};
    use crate::session::MemoryStorage;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use tokio::sync::Notify;

    pub const KEY: &str = "syr.session";

    pub fn video(id: &str) -> CandidateVideo {
        CandidateVideo {
            id: id.to_string(),
            title: format!("Video {}", id),
            thumbnail_url: format!("https://i.ytimg.com/vi/{}/hqdefault.jpg", id),
            channel_title: None,
            view_count_text: None,
            published_text: None,
        }
    }

    pub fn track(id: &str, artist: &str, title: &str) -> SourceTrack {
        SourceTrack::new(id, title, Some(artist.to_string()))
    }

    /// Canned results keyed by query. Unknown queries fail; gated queries
    /// wait for `release` before answering.
    #[derive(Default)]
    pub struct FakeSearch {
        pub results: HashMap<String, Vec<CandidateVideo>>,
        pub gated: HashSet<String>,
        pub started: Notify,
        pub release: Notify,
        pub calls: Mutex<Vec<String>>,
        pub in_flight: std::sync::atomic::AtomicUsize,
        pub max_in_flight: std::sync::atomic::AtomicUsize,
    }

    impl FakeSearch {
        pub fn with(mut self, query: &str, videos: &[&str]) -> Self {
            self.results
                .insert(query.to_string(), videos.iter().map(|v| video(v)).collect());
            self
        }

        pub fn gate(mut self, query: &str) -> Self {
            self.gated.insert(query.to_string());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl VideoSearch for FakeSearch {
        fn id(&self) -> &str {
            "fake"
        }

        async fn search_candidates(
            &self,
            query: &str,
            limit: usize,
        ) -> anyhow::Result<Vec<CandidateVideo>> {
            self.calls.lock().push(query.to_string());
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);

            if self.gated.contains(query) {
                self.started.notify_one();
                self.release.notified().await;
            } else {
                tokio::task::yield_now().await;
            }

            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            match self.results.get(query) {
                Some(videos) => Ok(videos.iter().take(limit).cloned().collect()),
                None => Err(anyhow::anyhow!("search unavailable for '{}'", query)),
            }
        }
    }

    pub struct FakePlaylist {
        pub playlist: Option<PlaylistImport>,
    }

    #[async_trait]
    impl PlaylistSource for FakePlaylist {
        fn id(&self) -> &str {
            "spotify"
        }

        fn extract_playlist_id(&self, input: &str) -> anyhow::Result<String> {
            Ok(crate::spotify::SpotifyClient::extract_playlist_id(input)?)
        }

        async fn fetch_playlist(&self, _playlist_id: &str) -> anyhow::Result<PlaylistImport> {
            self.playlist
                .clone()
                .ok_or_else(|| anyhow::anyhow!("Failed to fetch Spotify playlist."))
        }
    }

    /// Records every import; titles listed in `reject` fail.
    #[derive(Default)]
    pub struct FakeSink {
        pub reject: HashSet<String>,
        pub imported: Mutex<Vec<(String, ChannelTrack)>>,
    }

    #[async_trait]
    impl ImportSink for FakeSink {
        fn id(&self) -> &str {
            "fake-channel"
        }

        async fn import_track(&self, channel_id: &str, track: &ChannelTrack) -> anyhow::Result<()> {
            if self.reject.contains(&track.title) {
                anyhow::bail!("channel rejected '{}'", track.title);
            }
            self.imported
                .lock()
                .push((channel_id.to_string(), track.clone()));
            Ok(())
        }
    }

    pub fn config() -> AppConfig {
        AppConfig {
            search_delay_ms: 0,
            ..AppConfig::default()
        }
    }

    pub fn controller(search: FakeSearch) -> (MatchingController, Arc<FakeSearch>, MemoryStorage) {
        let storage = MemoryStorage::new();
        let search = Arc::new(search);
        let store = SessionStore::open(Box::new(storage.clone()), KEY);
        let controller = MatchingController::new(store, search.clone(), config());
        (controller, search, storage)
    }
}
