use anyhow::{Context, Result};

use crate::errors::ConfigError;
use crate::screening::facts::is_valid_address;

/// Sender used in dry-run mode when `MAIL_FROM` is not set.
pub const DRY_RUN_SENDER: &str = "screener@localhost";

/// Mail relay settings. Present only when `MAIL_RELAY_URL` is set.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub url: String,
    pub api_key: String,
}

/// Process configuration loaded from environment variables (and `.env`).
/// Credentials are never read from anywhere else.
#[derive(Debug, Clone)]
pub struct Config {
    pub relay: Option<RelayConfig>,
    pub mail_from: Option<String>,
    pub recruiter_name: String,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let relay = match optional_env("MAIL_RELAY_URL") {
            Some(url) => Some(RelayConfig {
                url,
                api_key: require_env("MAIL_API_KEY")?,
            }),
            None => None,
        };

        let mail_from = match optional_env("MAIL_FROM") {
            Some(from) if !is_valid_address(&from) => {
                return Err(anyhow::Error::new(ConfigError::InvalidAddress(from))
                    .context("MAIL_FROM is invalid"));
            }
            Some(from) => Some(from),
            None if relay.is_some() => {
                anyhow::bail!("MAIL_FROM must be set when MAIL_RELAY_URL is configured")
            }
            None => None,
        };

        Ok(Config {
            relay,
            mail_from,
            recruiter_name: optional_env("RECRUITER_NAME").unwrap_or_else(|| "Recruiter".to_string()),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }

    pub fn sender(&self) -> &str {
        self.mail_from.as_deref().unwrap_or(DRY_RUN_SENDER)
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
