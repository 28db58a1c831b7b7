use super::models::{ChannelError, ChannelTrackLink, CreatedTrack};
use crate::config::{ChannelConfig, REQUEST_TIMEOUT_SECONDS};
use crate::models::ChannelTrack;
use crate::providers::ImportSink;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use std::time::Duration;

/// Adds tracks to a Radio4000 channel through its REST tables.
#[derive(Clone)]
pub struct ChannelClient {
    client: Client,
    api_base: String,
    api_key: String,
    access_token: String,
    user_id: Option<String>,
}

impl ChannelClient {
    pub fn from_config(config: &ChannelConfig) -> Result<Self, ChannelError> {
        let required = |value: &Option<String>, field: &str| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
                .ok_or_else(|| ChannelError::NotConfigured(field.to_string()))
        };

        let api_base = required(&config.api_base, "api_base")?;
        let api_key = required(&config.api_key, "api_key")?;
        let access_token = required(&config.access_token, "access_token")?;

        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key,
            access_token,
            user_id: config.user_id.clone().filter(|id| !id.is_empty()),
        })
    }

    pub fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_base, table)
    }

    /// Insert the track row and return its id.
    pub async fn create_track(&self, track: &ChannelTrack) -> Result<String, ChannelError> {
        let request = self.post("tracks").json(track);
        let body = Self::check(request.send().await?).await?;
        Self::parse_created_id(&body)
    }

    pub async fn link_track(&self, channel_id: &str, track_id: &str) -> Result<(), ChannelError> {
        let link = ChannelTrackLink {
            channel_id,
            track_id,
            user_id: self.user_id.as_deref(),
        };
        let request = self.post("channel_track").json(&link);
        Self::check(request.send().await?).await?;
        Ok(())
    }

    /// The backend answers inserts with the created rows as a list.
    pub fn parse_created_id(body: &str) -> Result<String, ChannelError> {
        let rows: Vec<CreatedTrack> = serde_json::from_str(body)?;
        rows.into_iter()
            .next()
            .map(|row| row.id)
            .ok_or_else(|| ChannelError::ParseError("insert returned no rows".to_string()))
    }

    fn post(&self, table: &str) -> RequestBuilder {
        self.client
            .post(self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Prefer", "return=representation")
            .bearer_auth(&self.access_token)
    }

    async fn check(response: Response) -> Result<String, ChannelError> {
        let status = response.status();
        let url = response.url().to_string();
        let text = response.text().await?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ChannelError::Unauthorized);
        }
        if status == StatusCode::TOO_MANY_REQUESTS {
            log::warn!("Rate limit (429) at {}", url);
            return Err(ChannelError::RateLimited);
        }
        if !status.is_success() {
            log::warn!("Channel request failed ({}) at {}: {}", status, url, text);
            return Err(ChannelError::Rejected(format!("HTTP {}", status)));
        }
        Ok(text)
    }
}

#[async_trait]
impl ImportSink for ChannelClient {
    fn id(&self) -> &str {
        "radio4000"
    }

    async fn import_track(&self, channel_id: &str, track: &ChannelTrack) -> anyhow::Result<()> {
        let track_id = self.create_track(track).await?;
        self.link_track(channel_id, &track_id).await?;
        log::debug!("Added {} to channel {} as {}", track.url, channel_id, track_id);
        Ok(())
    }
}
