use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderError, VideoSearch};

pub const DEFAULT_BASE_URL: &str = "https://www.googleapis.com/youtube/v3";

/// `search.list` response of the YouTube Data API, reduced to what the bot reads.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub items: Vec<SearchItem>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SearchItem {
    pub id: ResourceId,
    pub snippet: Snippet,
}

/// Channels and playlists come back without `videoId`.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceId {
    #[serde(rename = "videoId", default)]
    pub video_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Snippet {
    pub title: String,
}

impl SearchResponse {
    /// Title and id of the first result, when that result is a video.
    pub fn first_video(&self) -> Option<(&str, &str)> {
        let item = self.items.first()?;
        let id = item.id.video_id.as_deref()?;
        Some((item.snippet.title.as_str(), id))
    }
}

pub fn watch_url(video_id: &str) -> String {
    format!("https://www.youtube.com/watch?v={}", video_id)
}

pub struct YoutubeSearchClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl YoutubeSearchClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl VideoSearch for YoutubeSearchClient {
    async fn search(&self, query: &str, max_results: u32) -> Result<SearchResponse, ProviderError> {
        let url = format!("{}/search", self.base_url.trim_end_matches('/'));
        debug!("Sending search request to {}", url);

        let max_results = max_results.to_string();
        let response = self
            .client
            .get(&url)
            .query(&[
                ("q", query),
                ("part", "snippet"),
                ("maxResults", max_results.as_str()),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}
