use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const APP_NAME: &str = "tubematch";
pub const DEFAULT_API_BASE: &str = "https://medianow.deno.dev";
pub const DEFAULT_MAX_SEARCH_RESULTS: usize = 3;
pub const DEFAULT_SEARCH_DELAY_MS: u64 = 50;
pub const REQUEST_TIMEOUT_SECONDS: u64 = 10;
pub const SESSION_KEY: &str = "syr.session";

pub fn get_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn get_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
}

pub fn get_config_file_path() -> PathBuf {
    get_config_dir().join("config.json")
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Base URL of the proxy serving playlist and video search endpoints.
    pub api_base: String,
    /// Result cap passed to every candidate search.
    pub max_search_results: usize,
    /// Truncate ingested playlists to this many tracks.
    pub max_tracks: Option<usize>,
    /// Pause between searches in a sequential pass.
    pub search_delay_ms: u64,
    pub session_key: String,
    /// Overrides the snapshot directory (defaults to the data dir).
    pub storage_dir: Option<PathBuf>,
    pub channel: ChannelConfig,
}

/// Where confirmed matches are imported to. The access token is obtained
/// out of band; nothing here signs in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelConfig {
    /// Project URL of the channel backend, e.g. `https://<project>.supabase.co`.
    pub api_base: Option<String>,
    /// Public API key sent as `apikey`.
    pub api_key: Option<String>,
    pub access_token: Option<String>,
    /// Owner recorded on each channel/track link, when the backend wants it.
    pub user_id: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            max_search_results: DEFAULT_MAX_SEARCH_RESULTS,
            max_tracks: None,
            search_delay_ms: DEFAULT_SEARCH_DELAY_MS,
            session_key: SESSION_KEY.to_string(),
            storage_dir: None,
            channel: ChannelConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load from the default config file location.
    pub fn load() -> Self {
        Self::load_from(&get_config_file_path())
    }

    /// A missing file yields defaults; an unreadable or malformed one is
    /// logged and also yields defaults.
    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Self::default();
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                return Self::default();
            }
        };

        match serde_json::from_str::<AppConfig>(&contents) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.storage_dir.clone().unwrap_or_else(get_data_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let config = AppConfig::load_from(&dir.path().join("config.json"));
        assert_eq!(config.max_search_results, DEFAULT_MAX_SEARCH_RESULTS);
        assert_eq!(config.session_key, SESSION_KEY);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"max_tracks": 2, "search_delay_ms": 0}"#).unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.max_tracks, Some(2));
        assert_eq!(config.search_delay_ms, 0);
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_channel_section_is_optional() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{"channel": {"api_base": "https://r4.example", "access_token": "tok"}}"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.channel.api_base.as_deref(), Some("https://r4.example"));
        assert_eq!(config.channel.access_token.as_deref(), Some("tok"));
        assert_eq!(config.channel.api_key, None);
        assert_eq!(AppConfig::default().channel.api_base, None);
    }

    #[test]
    fn test_malformed_file_uses_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let config = AppConfig::load_from(&path);
        assert_eq!(config.max_tracks, None);
    }
}
