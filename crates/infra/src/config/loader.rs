//! Configuration loader
//!
//! Loads application configuration from environment variables.
//!
//! ## Environment Variables
//! - `PRICESYNC_ADDRESS`: bind address (default `0.0.0.0`)
//! - `PRICESYNC_PORT`: bind port (default `8080`)
//! - `PRICESYNC_MAX_WORKERS`: dispatcher worker count (default `3`)
//! - `PRICESYNC_BATCH_SIZE`: products per batch (default `3000`)
//! - `PRICESYNC_CANCEL_MODE`: `finish-in-flight` (default) or
//!   `abort-in-flight`
//! - `PRICESYNC_PROVIDER_URI`: provider base URL (required)
//! - `PRICESYNC_SECRET_KEY`: provider shared secret (required)
//! - `PRICESYNC_TIMEOUT_SECONDS`: per-send timeout (default `120`)
//! - `PRICESYNC_RETRY_COUNT`: additional send attempts (default `3`)
//! - `PRICESYNC_RETRY_INTERVAL_MS`: base retry backoff (default `100`)
//! - `PRICESYNC_BREAKER_MAX_FAILURES`: breaker threshold (default `5`)
//! - `PRICESYNC_BREAKER_RESET_SECONDS`: breaker cooldown (default `60`)
//!
//! Malformed optional values fall back to their defaults; missing
//! required variables are a configuration error.

use std::str::FromStr;
use std::time::Duration;

use pricesync_domain::{
    CancelMode, Config, ProviderConfig, Result, ServerConfig, SyncError, WorkerConfig,
};

/// Load configuration from environment variables
///
/// # Errors
/// Returns `SyncError::Config` if a required variable is missing.
pub fn load() -> Result<Config> {
    let server = ServerConfig {
        address: env_or("PRICESYNC_ADDRESS", "0.0.0.0".to_string()),
        port: env_parse_or("PRICESYNC_PORT", 8080),
    };

    let worker = WorkerConfig {
        max_workers: env_parse_or("PRICESYNC_MAX_WORKERS", 3),
        batch_size: env_parse_or("PRICESYNC_BATCH_SIZE", 3000),
        cancel_mode: env_parse_or("PRICESYNC_CANCEL_MODE", CancelMode::FinishInFlight),
    };

    let provider = ProviderConfig {
        base_url: require_env("PRICESYNC_PROVIDER_URI")?,
        secret_key: require_env("PRICESYNC_SECRET_KEY")?,
        timeout: Duration::from_secs(env_parse_or("PRICESYNC_TIMEOUT_SECONDS", 120)),
        retry_count: env_parse_or("PRICESYNC_RETRY_COUNT", 3),
        retry_interval: Duration::from_millis(env_parse_or("PRICESYNC_RETRY_INTERVAL_MS", 100)),
        breaker_max_failures: env_parse_or("PRICESYNC_BREAKER_MAX_FAILURES", 5),
        breaker_reset_timeout: Duration::from_secs(env_parse_or(
            "PRICESYNC_BREAKER_RESET_SECONDS",
            60,
        )),
    };

    tracing::info!("configuration loaded from environment");
    Ok(Config { server, worker, provider })
}

fn env_or(key: &str, fallback: String) -> String {
    std::env::var(key).unwrap_or(fallback)
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key)
        .map_err(|_| SyncError::Config(format!("environment variable '{key}' not set")))
}

fn env_parse_or<T: FromStr>(key: &str, fallback: T) -> T {
    parse_or(std::env::var(key).ok(), fallback)
}

/// Parse an optional raw value, falling back on absence or parse failure
fn parse_or<T: FromStr>(value: Option<String>, fallback: T) -> T {
    match value {
        Some(raw) => raw.parse().unwrap_or(fallback),
        None => fallback,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_or_uses_value_when_valid() {
        assert_eq!(parse_or::<i64>(Some("7".into()), 3), 7);
        assert_eq!(
            parse_or::<CancelMode>(Some("abort-in-flight".into()), CancelMode::FinishInFlight),
            CancelMode::AbortInFlight
        );
    }

    #[test]
    fn parse_or_falls_back_on_garbage_or_absence() {
        assert_eq!(parse_or::<i64>(Some("many".into()), 3), 3);
        assert_eq!(parse_or::<u16>(None, 8080), 8080);
    }

    #[test]
    fn require_env_reports_the_variable_name() {
        let err = require_env("PRICESYNC_TEST_SURELY_UNSET").unwrap_err();
        assert!(err.to_string().contains("PRICESYNC_TEST_SURELY_UNSET"));
    }
}
