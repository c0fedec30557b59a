use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
///
/// Both store URLs are optional: with neither set the service runs on the
/// in-memory store, which is the development default. `DATABASE_URL` wins
/// when both are present.
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: Option<String>,
    pub layout_store_url: Option<String>,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            database_url: optional_env("DATABASE_URL"),
            layout_store_url: optional_env("LAYOUT_STORE_URL"),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
