//! relaybot setup wizard.
//!
//! Without flags: starts a local Axum HTTP server on port 8719 serving a small
//! form. Submitting it writes `config.toml` to the project root and shuts the
//! server down.
//!
//! With `--cli`: asks for the same values on the terminal instead.

use anyhow::{Context, Result};
use axum::{
    extract::State,
    http::StatusCode,
    response::Html,
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
};
use tokio::sync::{oneshot, Mutex};

const DEFAULT_CITY: &str = "minsk";

const INDEX_HTML: &str = r#"<!doctype html>
<html>
<head><meta charset="utf-8"><title>relaybot setup</title></head>
<body>
<h1>relaybot setup</h1>
<form method="post" action="/save">
  <p><label>Telegram bot token<br><input name="tg_token" size="60" required></label></p>
  <p><label>YouTube Data API key<br><input name="youtube_key" size="60" required></label></p>
  <p><label>OpenWeatherMap API key<br><input name="weather_key" size="60" required></label></p>
  <p><label>Weather city<br><input name="city" value="minsk"></label></p>
  <p><button type="submit">Save config.toml</button></p>
</form>
</body>
</html>
"#;

// ── Shared state ───────────────────────────────────────────────────────────────

#[derive(Clone)]
struct AppState {
    config_path: PathBuf,
    /// Consumed once when the form is submitted.
    shutdown_tx: Arc<Mutex<Option<oneshot::Sender<()>>>>,
}

#[derive(Deserialize)]
struct SetupForm {
    tg_token: String,
    youtube_key: String,
    weather_key: String,
    #[serde(default)]
    city: String,
}

// ── Handlers ───────────────────────────────────────────────────────────────────

async fn serve_index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn save_config(
    State(state): State<AppState>,
    Form(form): Form<SetupForm>,
) -> Result<Html<String>, StatusCode> {
    let config = format_config(&ConfigParams {
        tg_token: &form.tg_token,
        youtube_key: &form.youtube_key,
        weather_key: &form.weather_key,
        city: &form.city,
    });

    tokio::fs::write(&state.config_path, &config)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    let path = state.config_path.to_string_lossy().to_string();
    println!("\n✓  config.toml saved to {path}");
    println!("   Run the bot with:  cargo run\n");

    // Shut down after the response has gone out.
    let tx = state.shutdown_tx.lock().await.take();
    if let Some(tx) = tx {
        tokio::spawn(async move {
            tokio::time::sleep(tokio::time::Duration::from_millis(300)).await;
            let _ = tx.send(());
        });
    }

    Ok(Html(format!(
        "<p>Saved to <code>{}</code>. You can close this tab.</p>",
        path
    )))
}

// ── Config formatting ──────────────────────────────────────────────────────────

struct ConfigParams<'a> {
    tg_token: &'a str,
    youtube_key: &'a str,
    weather_key: &'a str,
    city: &'a str,
}

/// TOML string literal with escaping.
fn quoted(value: &str) -> String {
    toml::Value::String(value.trim().to_owned()).to_string()
}

/// Produces a valid config.toml string. Extracted so it can be unit-tested.
fn format_config(p: &ConfigParams<'_>) -> String {
    let tg_token = quoted(p.tg_token);
    let youtube_key = quoted(p.youtube_key);
    let weather_key = quoted(p.weather_key);
    let city = if p.city.trim().is_empty() {
        quoted(DEFAULT_CITY)
    } else {
        quoted(p.city)
    };

    format!(
        r#"[telegram]
bot_token = {tg_token}

[youtube]
api_key = {youtube_key}

[weather]
api_key = {weather_key}
city = {city}

[extractor]
program = "yt-dlp"
"#
    )
}

// ── CLI mode ───────────────────────────────────────────────────────────────────

fn run_cli(project_root: &Path) -> Result<()> {
    use std::io::{self, Write};

    println!("=== relaybot CLI Setup ===\n");

    let read_line = |prompt: &str| -> Result<String> {
        print!("{prompt}");
        io::stdout().flush()?;
        let mut buf = String::new();
        io::stdin().read_line(&mut buf)?;
        Ok(buf.trim().to_owned())
    };

    let tg_token = read_line("Telegram bot token: ")?;
    let youtube_key = read_line("YouTube Data API key: ")?;
    let weather_key = read_line("OpenWeatherMap API key: ")?;
    let city = read_line(&format!("Weather city [{DEFAULT_CITY}]: "))?;

    let config = format_config(&ConfigParams {
        tg_token: &tg_token,
        youtube_key: &youtube_key,
        weather_key: &weather_key,
        city: &city,
    });

    let config_path = project_root.join("config.toml");
    std::fs::write(&config_path, &config)
        .with_context(|| format!("Could not write {}", config_path.display()))?;

    println!("\n✓  config.toml saved to {}", config_path.display());
    println!("   Run the bot with:  cargo run");
    Ok(())
}

// ── Entry point ────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let args: Vec<String> = std::env::args().collect();

    // Resolve project root: prefer RELAYBOT_ROOT env, fall back to cwd.
    let project_root =
        PathBuf::from(std::env::var("RELAYBOT_ROOT").unwrap_or_else(|_| ".".to_string()));

    if args.iter().any(|a| a == "--cli") {
        return run_cli(&project_root);
    }

    let port: u16 = 8719;
    let config_path = project_root.join("config.toml");

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let state = AppState {
        config_path,
        shutdown_tx: Arc::new(Mutex::new(Some(shutdown_tx))),
    };

    let app = Router::new()
        .route("/", get(serve_index))
        .route("/save", post(save_config))
        .with_state(state);

    let addr = format!("127.0.0.1:{port}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    println!("relaybot setup wizard → http://localhost:{port}");
    println!("Press Ctrl-C to exit without saving.\n");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        })
        .await
        .context("Server error")?;

    Ok(())
}

// ── Tests ──────────────────────────────────────────────────────────────────────
