use std::sync::{Arc, LazyLock};

use regex::Regex;
use tracing::{error, info};

use crate::providers::youtube::watch_url;
use crate::providers::{VideoInfo, VideoInfoExtractor, VideoSearch, WeatherProvider};
use crate::router::{Action, Reply};

pub const START_TEXT: &str = "Привет! Отправьте мне текстовый запрос и получишь ссылку на YouTube-видео (/look), \
                              или отправьте мне ссылку на YouTube-видео и я пришлю информацию о нем (/start).";

pub const HELP_TEXT: &str = "Этот бот умеет выполнять команды:\n/start\n/help\n/weather\n/look [описание]";

pub const WEATHER_FAILED: &str = "Не удалось получить прогноз погоды. Пожалуйста, попробуйте позже.";

pub const INVALID_LINK: &str = "Некорректная ссылка на YouTube. Пожалуйста, отправьте корректную ссылку.";

pub const EMPTY_QUERY: &str = "Пожалуйста, предоставьте текстовое описание для поиска.";

pub const NOT_FOUND: &str = "Видео по вашему запросу не найдено.";

/// Prefix cut from `/look` messages, counted in characters.
pub const LOOK_PREFIX: &str = "/look ";

const UNKNOWN_FIELD: &str = "неизвестно";

/// Loose watch-page pattern used for routing.
pub static WATCH_URL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://(www\.)?youtube\.com/watch\?v=.+").expect("valid regex"));

/// Strict pattern a routed link must also satisfy before extraction.
pub static STRICT_WATCH_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https://www\.youtube\.com/watch\?v=[a-zA-Z0-9_-]+$").expect("valid regex")
});

/// Long-lived clients and settings shared by every handler.
pub struct Services {
    pub weather: Arc<dyn WeatherProvider>,
    pub search: Arc<dyn VideoSearch>,
    pub extractor: Arc<dyn VideoInfoExtractor>,
    pub city: String,
}

/// Run the handler for `action` against the message text.
pub async fn run(action: Action, services: &Services, text: &str) -> Reply {
    match action {
        Action::Start => start(),
        Action::Help => help(),
        Action::Weather => weather(services).await,
        Action::VideoInfo => video_info(services, text).await,
        Action::Look => look(services, text).await,
    }
}

pub fn start() -> Reply {
    Reply::answer(START_TEXT)
}

pub fn help() -> Reply {
    Reply::answer(HELP_TEXT)
}

pub async fn weather(services: &Services) -> Reply {
    let city = services.city.as_str();
    let report = match services.weather.current(city).await {
        Ok(report) => report,
        Err(e) => {
            error!("Weather request for {} failed: {}", city, e);
            return Reply::answer(WEATHER_FAILED);
        }
    };

    match report.summary() {
        Some((temp, description)) => Reply::answer(format!(
            "Погода в {}:\nТемпература: {:?}°C\nОписание: {}",
            capitalize(city),
            temp,
            description
        )),
        None => {
            info!(
                "Weather provider returned cod {} for {}: {}",
                report.cod,
                city,
                report.message.as_deref().unwrap_or("-")
            );
            Reply::answer(WEATHER_FAILED)
        }
    }
}

pub async fn video_info(services: &Services, url: &str) -> Reply {
    if !STRICT_WATCH_URL.is_match(url) {
        info!("Rejected video link: {}", url);
        return Reply::quote(INVALID_LINK);
    }

    match services.extractor.extract(url).await {
        Ok(info) => Reply::quote(format_video_info(&info)),
        Err(e) => {
            error!("Failed to process video link {}: {}", url, e);
            Reply::quote(format!(
                "Произошла ошибка при обработке ссылки. Ошибка: {}",
                e
            ))
        }
    }
}

pub async fn look(services: &Services, text: &str) -> Reply {
    let query = look_query(text);
    if query.is_empty() {
        info!("Empty search query");
        return Reply::quote(EMPTY_QUERY);
    }

    info!("Search query: {}", query);

    match services.search.search(&query, 1).await {
        Ok(response) => match response.first_video() {
            Some((title, video_id)) => {
                let url = watch_url(video_id);
                info!("Video found: {}, {}", title, url);
                Reply::quote(format!("**Название:** {}\n**Ссылка:** {}", title, url))
            }
            None => {
                info!("No video found for: {}", query);
                Reply::quote(NOT_FOUND)
            }
        },
        Err(e) => {
            error!("Search for {:?} failed: {}", query, e);
            Reply::quote(format!(
                "Произошла ошибка при выполнении поиска. Ошибка: {}",
                e
            ))
        }
    }
}

fn look_query(text: &str) -> String {
    let rest: String = text.chars().skip(LOOK_PREFIX.chars().count()).collect();
    rest.trim().to_string()
}

fn format_video_info(info: &VideoInfo) -> String {
    let field = |value: &Option<String>| value.clone().unwrap_or_else(|| UNKNOWN_FIELD.to_string());
    format!(
        "**Название:** {}\n**Автор:** {}\n**Описание:** {}",
        field(&info.title),
        field(&info.uploader),
        field(&info.description)
    )
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}
