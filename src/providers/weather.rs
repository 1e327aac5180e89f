use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::{ProviderError, WeatherProvider};

/// Response of the OpenWeatherMap current-weather endpoint.
///
/// Only `cod` is always present; `main` and `weather` are missing on
/// error responses such as an unknown city or a rejected key.
#[derive(Debug, Clone, Deserialize)]
pub struct WeatherReport {
    pub cod: Cod,
    #[serde(default)]
    pub main: Option<MainReadings>,
    #[serde(default)]
    pub weather: Vec<Condition>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Status field of a weather response. Successful responses carry a number,
/// error responses usually a string such as `"404"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Cod {
    Code(i64),
    Text(String),
}

impl Cod {
    pub fn is_ok(&self) -> bool {
        matches!(self, Cod::Code(200))
    }
}

impl std::fmt::Display for Cod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cod::Code(code) => write!(f, "{}", code),
            Cod::Text(text) => write!(f, "{}", text),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct MainReadings {
    pub temp: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Condition {
    pub description: String,
}

impl WeatherReport {
    /// Temperature and first condition description, if the report is a
    /// successful one and carries both.
    pub fn summary(&self) -> Option<(f64, &str)> {
        if !self.cod.is_ok() {
            return None;
        }
        let temp = self.main.as_ref()?.temp;
        let description = self.weather.first()?.description.as_str();
        Some((temp, description))
    }
}

pub struct OpenWeatherClient {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<WeatherReport, ProviderError> {
        debug!("Requesting weather for {} from {}", city, self.base_url);

        // Error statuses still carry a JSON body with `cod`, so the status
        // line is not checked here.
        let body = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", "metric"),
                ("lang", "ru"),
            ])
            .send()
            .await?
            .text()
            .await?;

        Ok(serde_json::from_str(&body)?)
    }
}
