use crate::models::{CandidateVideo, ChannelTrack, PlaylistImport};
use anyhow::Result;
use async_trait::async_trait;

/// Source of remote playlists (e.g. Spotify).
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    /// Unique identifier (e.g., "spotify")
    fn id(&self) -> &str;

    /// Turn whatever the user pasted into a playlist id.
    fn extract_playlist_id(&self, input: &str) -> Result<String>;

    async fn fetch_playlist(&self, playlist_id: &str) -> Result<PlaylistImport>;
}

/// External video search. Result order is relevance order and is kept as-is.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    fn id(&self) -> &str;

    async fn search_candidates(&self, query: &str, limit: usize) -> Result<Vec<CandidateVideo>>;
}

/// Destination channel that confirmed matches are forwarded to.
#[async_trait]
pub trait ImportSink: Send + Sync {
    fn id(&self) -> &str;

    async fn import_track(&self, channel_id: &str, track: &ChannelTrack) -> Result<()>;
}
