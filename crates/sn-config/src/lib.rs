//! Environment-driven configuration, shared by the API and both workers.
//!
//! Every binary calls [`AppConfig::from_env`] once at startup. A missing or
//! malformed required variable is a [`ConfigError`], which the caller should
//! treat as an unrecoverable startup error (exit code 1).

use secrecy::SecretString;
use std::env;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
    #[error("environment variable {name} has an invalid value: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Process-wide configuration, loaded once from the environment.
#[derive(Clone)]
pub struct AppConfig {
    pub database_url: SecretString,
    pub openai_api_key: Option<SecretString>,
    pub assembly_api_key: Option<SecretString>,
    pub poll_interval: Duration,
    pub http_port: u16,
    pub log_filter: String,
    pub analyze_timeout: Duration,
    pub default_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from a `.env` file (if present) plus the process
    /// environment. `.env` values never override variables already set in
    /// the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let database_url = required_secret("DATABASE_URL")?;
        let openai_api_key = optional_secret("OPENAI_API_KEY");
        let assembly_api_key = optional_secret("ASSEMBLY_API_KEY");

        let poll_interval = Duration::from_secs(parse_or_default("SN_POLL_INTERVAL_SECS", 5)?);
        let http_port = parse_or_default("SN_HTTP_PORT", 8080u16)?;
        let log_filter = env::var("SN_LOG").unwrap_or_else(|_| "info".to_string());
        let analyze_timeout = Duration::from_secs(parse_or_default("SN_ANALYZE_TIMEOUT_SECS", 120)?);
        let default_timeout = Duration::from_secs(parse_or_default("SN_DEFAULT_TIMEOUT_SECS", 15)?);

        Ok(Self {
            database_url,
            openai_api_key,
            assembly_api_key,
            poll_interval,
            http_port,
            log_filter,
            analyze_timeout,
            default_timeout,
        })
    }

    /// `OPENAI_API_KEY`/`ASSEMBLY_API_KEY` are only required
    /// once the corresponding provider is actually selected; call this from
    /// the worker right before dispatching to the provider-specific adapter.
    pub fn require_openai_key(&self) -> Result<&SecretString, ConfigError> {
        self.openai_api_key.as_ref().ok_or(ConfigError::Missing("OPENAI_API_KEY"))
    }

    pub fn require_assembly_key(&self) -> Result<&SecretString, ConfigError> {
        self.assembly_api_key.as_ref().ok_or(ConfigError::Missing("ASSEMBLY_API_KEY"))
    }
}

fn required_secret(name: &'static str) -> Result<SecretString, ConfigError> {
    env::var(name).map(SecretString::from).map_err(|_| ConfigError::Missing(name))
}

fn optional_secret(name: &'static str) -> Option<SecretString> {
    env::var(name).ok().map(SecretString::from)
}

fn parse_or_default<T>(name: &'static str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    match env::var(name) {
        Ok(v) => v.parse().map_err(|_| ConfigError::Invalid { name, value: v }),
        Err(_) => Ok(default),
    }
}

/// Resolves the feed URL for a named source from its dedicated environment
/// variable, e.g. `SOURCE_FEED_URL_<NAME>` — one env var per source, keyed by
/// name. Returns `None` if unset, in which case the `Source.feed_url` column
/// value already on file is authoritative.
pub fn source_feed_url_env(source_name: &str) -> Option<String> {
    let key = format!(
        "SOURCE_FEED_URL_{}",
        source_name.to_uppercase().replace([' ', '-'], "_")
    );
    env::var(key).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_feed_url_env_normalizes_name() {
        env::set_var("SOURCE_FEED_URL_MY_FEED", "https://example.com/feed.xml");
        assert_eq!(
            source_feed_url_env("my-feed"),
            Some("https://example.com/feed.xml".to_string())
        );
        env::remove_var("SOURCE_FEED_URL_MY_FEED");
    }
}
