use super::models::{SpotifyError, TRACK_URL_PREFIX};
use crate::config::REQUEST_TIMEOUT_SECONDS;
use crate::models::{PlaylistImport, SourceTrack};
use crate::providers::PlaylistSource;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;

/// Fetches public playlists through the metadata proxy.
#[derive(Clone)]
pub struct SpotifyClient {
    client: Client,
    api_base: String,
}

impl SpotifyClient {
    pub fn new(api_base: &str) -> Result<Self, SpotifyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    /// Extract playlist ID from various Spotify URL formats
    pub fn extract_playlist_id(url_or_id: &str) -> Result<String, SpotifyError> {
        let trimmed = url_or_id.trim();

        if let Some(id) = trimmed.strip_prefix("spotify:playlist:") {
            if !id.is_empty() {
                return Ok(id.to_string());
            }
        }

        if trimmed.contains("spotify.link/") {
            return Err(SpotifyError::InvalidUrl(
                "Share links are not supported. Please use the full playlist URL.".to_string(),
            ));
        }

        if let Some(id_part) = trimmed.split("playlist/").nth(1) {
            let id: String = id_part
                .chars()
                .take_while(|c| c.is_alphanumeric() || *c == '_')
                .collect();
            if !id.is_empty() {
                return Ok(id);
            }
        }

        if trimmed.len() == 22 && trimmed.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Ok(trimmed.to_string());
        }

        Err(SpotifyError::InvalidUrl(format!(
            "Could not extract playlist ID from: {}",
            url_or_id
        )))
    }

    pub async fn fetch_playlist(&self, playlist_id: &str) -> Result<PlaylistImport, SpotifyError> {
        log::info!("Fetching Spotify playlist: {}", playlist_id);

        let url = format!(
            "{}/spotify/playlists/{}",
            self.api_base,
            urlencoding::encode(playlist_id)
        );
        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if status.as_u16() == 404 {
            return Err(SpotifyError::PlaylistNotFound(playlist_id.to_string()));
        }
        if status.as_u16() == 429 {
            return Err(SpotifyError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            log::warn!("Playlist request failed ({}) at {}: {}", status, url, text);
            return Err(SpotifyError::ApiError(format!("HTTP {}", status)));
        }

        let body: Value = response.json().await?;
        let playlist = Self::parse_playlist(&body)?;

        log::info!(
            "Fetched '{}' by {} with {} tracks",
            playlist.name,
            playlist.owner,
            playlist.tracks.len()
        );

        Ok(playlist)
    }

    pub fn parse_playlist(body: &Value) -> Result<PlaylistImport, SpotifyError> {
        let playlist = body
            .get("data")
            .and_then(|d| d.get("playlistV2"))
            .ok_or_else(|| SpotifyError::ParseError("missing data.playlistV2".to_string()))?;

        let name = playlist
            .get("name")
            .and_then(|v| v.as_str())
            .unwrap_or("Imported Playlist")
            .to_string();

        let owner = playlist
            .get("ownerV2")
            .and_then(|o| o.get("data"))
            .and_then(|d| d.get("username"))
            .and_then(|v| v.as_str())
            .unwrap_or("")
            .to_string();

        let items = playlist
            .get("content")
            .and_then(|c| c.get("items"))
            .and_then(|i| i.as_array())
            .ok_or_else(|| SpotifyError::ParseError("missing content.items".to_string()))?;

        let tracks: Vec<SourceTrack> = items
            .iter()
            .filter_map(|item| {
                let parsed = Self::parse_track(item);
                if parsed.is_none() {
                    log::debug!("Skipping unparseable playlist item: {}", item);
                }
                parsed
            })
            .collect();

        Ok(PlaylistImport {
            name,
            owner,
            tracks,
        })
    }

    fn parse_track(item: &Value) -> Option<SourceTrack> {
        let data = item.get("item")?.get("data")?;

        let title = data.get("name").and_then(|v| v.as_str())?.to_string();

        // Prefer the track URI; fall back to the playlist item uid
        let id = data
            .get("uri")
            .and_then(|v| v.as_str())
            .and_then(|uri| uri.strip_prefix("spotify:track:"))
            .or_else(|| item.get("uid").and_then(|v| v.as_str()))?
            .to_string();

        let artist = data
            .get("artists")
            .and_then(|a| a.get("items"))
            .and_then(|i| i.as_array())
            .and_then(|items| items.first())
            .and_then(|a| a.get("profile"))
            .and_then(|p| p.get("name"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let image_url = data
            .get("albumOfTrack")
            .and_then(|a| a.get("coverArt"))
            .and_then(|c| c.get("sources"))
            .and_then(|s| s.as_array())
            .and_then(|sources| sources.first())
            .and_then(|s| s.get("url"))
            .and_then(|v| v.as_str())
            .map(str::to_string);

        let mut track = SourceTrack::new(id, title, artist);
        track.source_url = Some(format!("{}{}", TRACK_URL_PREFIX, track.id));
        track.image_url = image_url;
        Some(track)
    }
}

#[async_trait]
impl PlaylistSource for SpotifyClient {
    fn id(&self) -> &str {
        "spotify"
    }

    fn extract_playlist_id(&self, input: &str) -> anyhow::Result<String> {
        Ok(Self::extract_playlist_id(input)?)
    }

    async fn fetch_playlist(&self, playlist_id: &str) -> anyhow::Result<PlaylistImport> {
        Ok(SpotifyClient::fetch_playlist(self, playlist_id).await?)
    }
}
