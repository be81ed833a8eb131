use std::env;

use storywatch_engine::{Credentials, SmtpSettings};
use thiserror::Error;

const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
const DEFAULT_SMTP_PORT: u16 = 465;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    MissingVar(&'static str),
    #[error("{name} must be a port number, got {value:?}")]
    InvalidPort { name: &'static str, value: String },
}

/// Secrets and endpoints read from the environment once per process.
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Platform login.
    pub credentials: Credentials,
    /// Mail account used both to send and to receive notifications.
    pub smtp: SmtpSettings,
    pub api_base: Option<String>,
}

impl AppConfig {
    /// Load from the process environment. Call `dotenvy::dotenv()` first to
    /// pick up a `.env` file.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load through `lookup`; empty values count as missing.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &'static str| get(key).ok_or(ConfigError::MissingVar(key));

        let credentials = Credentials {
            username: required("IG_USERNAME")?,
            password: required("IG_PASSWORD")?,
        };
        let port = match get("SMTP_PORT") {
            Some(value) => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort {
                    name: "SMTP_PORT",
                    value,
                })?,
            None => DEFAULT_SMTP_PORT,
        };
        let smtp = SmtpSettings {
            host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
            port,
            username: required("EMAIL_USERNAME")?,
            password: required("EMAIL_PASSWORD")?,
        };

        Ok(Self {
            credentials,
            smtp,
            api_base: get("STORY_API_BASE"),
        })
    }
}
