pub mod weather;
pub mod youtube;
pub mod ytdlp;

use async_trait::async_trait;
use thiserror::Error;

pub use weather::{OpenWeatherClient, WeatherReport};
pub use youtube::{SearchResponse, YoutubeSearchClient};
pub use ytdlp::{VideoInfo, YtDlpExtractor};

/// Failure talking to one of the external services.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Unexpected response format: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("{0}")]
    Extractor(String),
}

/// Current weather lookup by city name.
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<WeatherReport, ProviderError>;
}

/// Free-text video search.
#[async_trait]
pub trait VideoSearch: Send + Sync {
    async fn search(&self, query: &str, max_results: u32) -> Result<SearchResponse, ProviderError>;
}

/// Metadata lookup for a single watch-page URL.
#[async_trait]
pub trait VideoInfoExtractor: Send + Sync {
    async fn extract(&self, url: &str) -> Result<VideoInfo, ProviderError>;
}
