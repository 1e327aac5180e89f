use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

use crate::providers::youtube;

pub const TELEGRAM_TOKEN_ENV: &str = "TELEGRAM_API_TOKEN";
pub const YOUTUBE_KEY_ENV: &str = "YOUTUBE_API_KEY";
pub const WEATHER_KEY_ENV: &str = "OPENWEATHERMAP_API_KEY";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub youtube: YoutubeConfig,
    #[serde(default)]
    pub weather: WeatherConfig,
    #[serde(default)]
    pub extractor: ExtractorConfig,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct TelegramConfig {
    #[serde(default)]
    pub bot_token: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct YoutubeConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_youtube_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct WeatherConfig {
    #[serde(default)]
    pub api_key: String,
    /// City reported by /weather
    #[serde(default = "default_city")]
    pub city: String,
    #[serde(default = "default_weather_base_url")]
    pub base_url: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExtractorConfig {
    /// yt-dlp executable, looked up on PATH unless absolute
    #[serde(default = "default_extractor_program")]
    pub program: String,
}

fn default_youtube_base_url() -> String {
    youtube::DEFAULT_BASE_URL.to_string()
}

fn default_city() -> String {
    "minsk".to_string()
}

fn default_weather_base_url() -> String {
    "http://api.openweathermap.org/data/2.5/weather".to_string()
}

fn default_extractor_program() -> String {
    "yt-dlp".to_string()
}

impl Default for YoutubeConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_youtube_base_url(),
        }
    }
}

impl Default for WeatherConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            city: default_city(),
            base_url: default_weather_base_url(),
        }
    }
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            program: default_extractor_program(),
        }
    }
}

impl Config {
    /// Load `path` if it exists, apply environment overrides and check that
    /// all three secrets ended up set.
    pub fn load(path: &Path) -> Result<Self> {
        let mut config = Self::from_file(path)?;
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }

    /// Non-empty environment values win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let targets = [
            (TELEGRAM_TOKEN_ENV, &mut self.telegram.bot_token),
            (YOUTUBE_KEY_ENV, &mut self.youtube.api_key),
            (WEATHER_KEY_ENV, &mut self.weather.api_key),
        ];
        for (key, slot) in targets {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *slot = value.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        let required = [
            ("telegram.bot_token", TELEGRAM_TOKEN_ENV, &self.telegram.bot_token),
            ("youtube.api_key", YOUTUBE_KEY_ENV, &self.youtube.api_key),
            ("weather.api_key", WEATHER_KEY_ENV, &self.weather.api_key),
        ];
        for (field, env, value) in required {
            if value.trim().is_empty() {
                anyhow::bail!("Missing {} (set it in the config file or via {})", field, env);
            }
        }
        if self.weather.city.trim().is_empty() {
            anyhow::bail!("weather.city must not be empty");
        }
        Ok(())
    }
}
