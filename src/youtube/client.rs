use super::models::{SearchResult, YoutubeError};
use crate::config::REQUEST_TIMEOUT_SECONDS;
use crate::models::CandidateVideo;
use crate::providers::VideoSearch;
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

#[derive(Clone)]
pub struct YoutubeClient {
    client: Client,
    api_base: String,
}

impl YoutubeClient {
    pub fn new(api_base: &str) -> Result<Self, YoutubeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
        })
    }

    pub fn search_url(&self, query: &str) -> String {
        format!(
            "{}/youtube/search?query={}",
            self.api_base,
            urlencoding::encode(query)
        )
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<CandidateVideo>, YoutubeError> {
        let url = self.search_url(query);
        log::debug!("Searching videos for: {}", query);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if status.as_u16() == 429 {
            log::warn!("Rate limit (429) at {}", url);
            return Err(YoutubeError::RateLimited);
        }
        if !status.is_success() {
            log::warn!("Search failed ({}) at {}: {}", status, url, text);
            return Err(YoutubeError::InvalidResponse(format!("HTTP {}", status)));
        }

        Self::parse_results(&text, limit)
    }

    /// Keeps the proxy's order, truncated to `limit`.
    pub fn parse_results(body: &str, limit: usize) -> Result<Vec<CandidateVideo>, YoutubeError> {
        let results: Vec<SearchResult> = serde_json::from_str(body)?;
        Ok(results
            .into_iter()
            .take(limit)
            .map(CandidateVideo::from)
            .collect())
    }
}

#[async_trait]
impl VideoSearch for YoutubeClient {
    fn id(&self) -> &str {
        "youtube"
    }

    async fn search_candidates(&self, query: &str, limit: usize) -> anyhow::Result<Vec<CandidateVideo>> {
        Ok(self.search(query, limit).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_url_encodes_query() {
        let client = YoutubeClient::new("https://medianow.deno.dev/").unwrap();
        assert_eq!(
            client.search_url("joy orbison & friends"),
            "https://medianow.deno.dev/youtube/search?query=joy%20orbison%20%26%20friends"
        );
    }

    #[test]
    fn test_parse_results_keeps_order_and_limit() {
        let body = r#"[
            {"id": "v1", "title": "First", "thumbnail": "https://t/1.jpg", "channelTitle": "Chan", "views": "1M views", "publishedAt": "2 years ago"},
            {"id": "v2", "title": "Second", "channelTitle": ""},
            {"id": "v3", "title": "Third"}
        ]"#;

        let videos = YoutubeClient::parse_results(body, 2).unwrap();
        assert_eq!(videos.len(), 2);
        assert_eq!(videos[0].id, "v1");
        assert_eq!(videos[0].channel_title.as_deref(), Some("Chan"));
        assert_eq!(videos[0].view_count_text.as_deref(), Some("1M views"));
        assert_eq!(videos[1].id, "v2");
        assert_eq!(videos[1].channel_title, None);
        assert_eq!(videos[1].thumbnail_url, "https://i.ytimg.com/vi/v2/hqdefault.jpg");
    }

    #[test]
    fn test_parse_results_rejects_non_list() {
        assert!(matches!(
            YoutubeClient::parse_results(r#"{"error": "quota"}"#, 3),
            Err(YoutubeError::ParseError(_))
        ));
    }
}
