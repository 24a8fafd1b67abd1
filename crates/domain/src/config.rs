//! Application configuration structures
//!
//! Plain data carried from the environment loader into the services.
//! The loader itself lives in the infra crate; these types stay free of
//! any loading logic.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Top-level application configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub worker: WorkerConfig,
    pub provider: ProviderConfig,
}

/// HTTP server bind configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub address: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { address: "0.0.0.0".to_string(), port: 8080 }
    }
}

/// What the dispatcher does with in-flight batches when cancelled
///
/// New batches are never claimed after cancellation regardless of mode;
/// this only governs work that is already running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CancelMode {
    /// In-flight remote calls run to completion and still contribute
    /// their result
    FinishInFlight,
    /// In-flight remote calls observe the cancellation token and abort
    /// at their next check point
    AbortInFlight,
}

impl Default for CancelMode {
    fn default() -> Self {
        Self::FinishInFlight
    }
}

impl FromStr for CancelMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "finish-in-flight" => Ok(Self::FinishInFlight),
            "abort-in-flight" => Ok(Self::AbortInFlight),
            other => Err(format!("unknown cancel mode: {other}")),
        }
    }
}

/// Dispatcher worker-pool configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of concurrent workers; values below 1 are treated as 1
    pub max_workers: i64,
    /// Products per batch; values below 1 mean a single batch
    pub batch_size: i64,
    /// In-flight policy applied when the caller cancels mid-run
    pub cancel_mode: CancelMode,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { max_workers: 3, batch_size: 3000, cancel_mode: CancelMode::default() }
    }
}

/// Pricing provider connection configuration
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    /// Base URL of the provider API
    pub base_url: String,
    /// Shared secret carried in the Authorization header
    pub secret_key: String,
    /// Timeout budget for a single physical send
    pub timeout: Duration,
    /// Additional send attempts after the first
    pub retry_count: usize,
    /// Base backoff between retry attempts; doubles per retry
    pub retry_interval: Duration,
    /// Consecutive failures before the circuit opens
    pub breaker_max_failures: u64,
    /// Cooldown after which the circuit admits calls again
    pub breaker_reset_timeout: Duration,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            secret_key: String::new(),
            timeout: Duration::from_secs(120),
            retry_count: 3,
            retry_interval: Duration::from_millis(100),
            breaker_max_failures: 5,
            breaker_reset_timeout: Duration::from_secs(60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancel_mode_parses_known_values() {
        assert_eq!("finish-in-flight".parse::<CancelMode>(), Ok(CancelMode::FinishInFlight));
        assert_eq!("abort-in-flight".parse::<CancelMode>(), Ok(CancelMode::AbortInFlight));
        assert!("drain".parse::<CancelMode>().is_err());
    }

    #[test]
    fn worker_config_defaults_match_deployment_baseline() {
        let cfg = WorkerConfig::default();
        assert_eq!(cfg.max_workers, 3);
        assert_eq!(cfg.batch_size, 3000);
        assert_eq!(cfg.cancel_mode, CancelMode::FinishInFlight);
    }
}
