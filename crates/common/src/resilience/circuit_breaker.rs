//! Circuit breaker for remote-call protection
//!
//! Tracks consecutive failures of an operation and fails fast once a
//! threshold is reached, giving the remote endpoint a cooldown window
//! before traffic is admitted again.
//!
//! The breaker has two observable states: `Closed` (calls pass through)
//! and `Open` (calls are rejected without touching the endpoint). There
//! is no separate half-open probe state: once the cooldown has elapsed
//! since the last recorded failure, the failure counter is cleared at
//! the next admission check and the call proceeds normally.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

//==============================================================================
// Time Abstraction for Testability
//==============================================================================

/// Trait for time operations to enable deterministic testing
///
/// Allows the breaker to use real monotonic time in production and
/// controlled mock time in tests, so cooldown behavior can be verified
/// without actual delays.
pub trait Clock: Send + Sync + 'static {
    /// Get current instant (monotonic time)
    fn now(&self) -> Instant;
}

/// Real system clock implementation for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Mock clock for deterministic testing
///
/// Tests control time progression explicitly instead of sleeping.
#[derive(Debug, Clone)]
pub struct MockClock {
    start: Instant,
    elapsed: Arc<Mutex<Duration>>,
}

impl MockClock {
    /// Create a new mock clock starting at the current instant
    pub fn new() -> Self {
        Self { start: Instant::now(), elapsed: Arc::new(Mutex::new(Duration::ZERO)) }
    }

    /// Advance the mock clock by a duration
    pub fn advance(&self, duration: Duration) {
        *self.elapsed.lock() += duration;
    }

    /// Get the current elapsed time
    pub fn elapsed(&self) -> Duration {
        *self.elapsed.lock()
    }
}

impl Default for MockClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MockClock {
    fn now(&self) -> Instant {
        self.start + *self.elapsed.lock()
    }
}

//==============================================================================
// Error Types
//==============================================================================

/// Configuration error for breaker construction
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },
}

/// Configuration result type
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Errors produced by a breaker-protected call
///
/// Generic over the underlying operation error type `E` so the original
/// failure is preserved when the operation itself fails.
#[derive(Debug, Error)]
pub enum ResilienceError<E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    /// Circuit breaker is open, rejecting calls
    #[error("Circuit breaker is open, rejecting calls")]
    CircuitOpen,

    /// The underlying operation failed
    #[error("Operation failed")]
    OperationFailed {
        #[source]
        source: E,
    },
}

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed, allowing requests
    Closed,
    /// Circuit is open, rejecting requests
    Open,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
        }
    }
}

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before the circuit opens
    pub max_failures: u64,
    /// Cooldown after the last failure before calls are admitted again
    pub reset_timeout: Duration,
    /// Whether a success while closed clears the failure count
    ///
    /// The default is `false`: accumulated failures persist until the
    /// cooldown elapses, so repeated isolated failures below the
    /// threshold keep counting. The `true` variant clears the counter
    /// on any success.
    pub reset_on_success: bool,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self { max_failures: 5, reset_timeout: Duration::from_secs(60), reset_on_success: false }
    }
}

impl CircuitBreakerConfig {
    /// Create a configuration builder
    pub fn builder() -> CircuitBreakerConfigBuilder {
        CircuitBreakerConfigBuilder::new()
    }

    /// Validate the configuration
    pub fn validate(&self) -> ConfigResult<()> {
        if self.max_failures == 0 {
            return Err(ConfigError::Invalid {
                message: "max_failures must be greater than 0".to_string(),
            });
        }

        if self.reset_timeout.is_zero() {
            return Err(ConfigError::Invalid {
                message: "reset_timeout must be greater than 0".to_string(),
            });
        }

        Ok(())
    }
}

/// Builder for [`CircuitBreakerConfig`]
#[derive(Debug)]
pub struct CircuitBreakerConfigBuilder {
    config: CircuitBreakerConfig,
}

impl Default for CircuitBreakerConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CircuitBreakerConfigBuilder {
    pub fn new() -> Self {
        Self { config: CircuitBreakerConfig::default() }
    }

    pub fn max_failures(mut self, threshold: u64) -> Self {
        self.config.max_failures = threshold;
        self
    }

    pub fn reset_timeout(mut self, timeout: Duration) -> Self {
        self.config.reset_timeout = timeout;
        self
    }

    pub fn reset_on_success(mut self, reset: bool) -> Self {
        self.config.reset_on_success = reset;
        self
    }

    pub fn build(self) -> ConfigResult<CircuitBreakerConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

//==============================================================================
// Circuit Breaker
//==============================================================================

/// Mutable breaker state, guarded by one mutex
///
/// The read-check-increment sequence on the failure counter must be
/// atomic across concurrent callers; everything lives behind a single
/// lock that is never held across an await point.
#[derive(Debug, Default)]
struct BreakerState {
    failures: u64,
    last_failure: Option<Instant>,
}

/// Circuit breaker protecting calls against a single remote endpoint
///
/// One instance is shared (via `Arc`) by every worker talking to the
/// same endpoint; breaker state is the only cross-worker shared mutable
/// state in the system.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    config: CircuitBreakerConfig,
    state: Mutex<BreakerState>,
    clock: C,
}

impl<C: Clock> fmt::Debug for CircuitBreaker<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CircuitBreaker")
            .field("config", &self.config)
            .field("state", &self.state())
            .field("failure_count", &self.failure_count())
            .finish()
    }
}

impl CircuitBreaker<SystemClock> {
    /// Create a new circuit breaker using the system clock
    pub fn new(config: CircuitBreakerConfig) -> ConfigResult<Self> {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    /// Create a new circuit breaker with a custom clock (useful for testing)
    pub fn with_clock(config: CircuitBreakerConfig, clock: C) -> ConfigResult<Self> {
        config.validate()?;

        Ok(Self { config, state: Mutex::new(BreakerState::default()), clock })
    }

    /// Execute an operation with circuit breaker protection
    ///
    /// Admission is checked under the state lock; the operation itself
    /// runs outside the lock so concurrent callers never serialize
    /// their remote calls, only their bookkeeping.
    pub async fn execute<F, Fut, T, E>(&self, operation: F) -> Result<T, ResilienceError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + Send + Sync + 'static,
    {
        if !self.admit() {
            debug!("circuit breaker rejecting call");
            return Err(ResilienceError::CircuitOpen);
        }

        match operation().await {
            Ok(result) => {
                self.record_success();
                Ok(result)
            }
            Err(error) => {
                self.record_failure();
                Err(ResilienceError::OperationFailed { source: error })
            }
        }
    }

    /// Check admission, clearing the failure count if the cooldown has
    /// elapsed since the last recorded failure
    fn admit(&self) -> bool {
        let mut state = self.state.lock();

        if state.failures > 0 {
            if let Some(last) = state.last_failure {
                if self.clock.now().duration_since(last) > self.config.reset_timeout {
                    debug!(failures = state.failures, "cooldown elapsed, clearing failure count");
                    state.failures = 0;
                    state.last_failure = None;
                }
            }
        }

        state.failures < self.config.max_failures
    }

    /// Record a successful operation
    fn record_success(&self) {
        if self.config.reset_on_success {
            let mut state = self.state.lock();
            state.failures = 0;
        }
    }

    /// Record a failed operation
    fn record_failure(&self) {
        let mut state = self.state.lock();
        state.failures += 1;
        state.last_failure = Some(self.clock.now());

        if state.failures == self.config.max_failures {
            warn!(failures = state.failures, "circuit breaker opened");
        }
    }

    /// Get the current observable state of the circuit breaker
    ///
    /// Non-mutating: a circuit whose cooldown has elapsed still reports
    /// `Closed` here because the next admission check will clear it.
    pub fn state(&self) -> CircuitState {
        let state = self.state.lock();

        if state.failures >= self.config.max_failures {
            let cooled_down = state
                .last_failure
                .is_some_and(|last| self.clock.now().duration_since(last) > self.config.reset_timeout);
            if !cooled_down {
                return CircuitState::Open;
            }
        }
        CircuitState::Closed
    }

    /// Current consecutive failure count
    pub fn failure_count(&self) -> u64 {
        self.state.lock().failures
    }

    /// Reset the circuit breaker to closed state
    pub fn reset(&self) {
        let mut state = self.state.lock();
        state.failures = 0;
        state.last_failure = None;
    }
}

impl Default for CircuitBreaker<SystemClock> {
    fn default() -> Self {
        Self { config: CircuitBreakerConfig::default(), state: Mutex::new(BreakerState::default()), clock: SystemClock }
    }
}

#[cfg(test)]
mod tests {
    //! Unit tests for the circuit breaker
    //!
    //! Cover configuration validation, threshold behavior, cooldown-based
    //! recovery, both failure-count reset policies, and concurrent access.

    use std::io;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn breaker(max_failures: u64, reset_timeout: Duration, clock: MockClock) -> CircuitBreaker<MockClock> {
        let config = CircuitBreakerConfig::builder()
            .max_failures(max_failures)
            .reset_timeout(reset_timeout)
            .build()
            .unwrap();
        CircuitBreaker::with_clock(config, clock).unwrap()
    }

    async fn fail(cb: &CircuitBreaker<MockClock>) -> Result<(), ResilienceError<io::Error>> {
        cb.execute(|| async { Err::<(), _>(io::Error::other("remote down")) }).await
    }

    #[test]
    fn config_defaults() {
        let config = CircuitBreakerConfig::default();
        assert_eq!(config.max_failures, 5);
        assert_eq!(config.reset_timeout, Duration::from_secs(60));
        assert!(!config.reset_on_success);
    }

    #[test]
    fn config_validation_rejects_zero_values() {
        assert!(CircuitBreakerConfig::builder().max_failures(0).build().is_err());
        assert!(CircuitBreakerConfig::builder().reset_timeout(Duration::ZERO).build().is_err());
        assert!(CircuitBreakerConfig::builder().max_failures(3).build().is_ok());
    }

    #[test]
    fn circuit_state_display() {
        assert_eq!(CircuitState::Closed.to_string(), "CLOSED");
        assert_eq!(CircuitState::Open.to_string(), "OPEN");
    }

    #[tokio::test]
    async fn passes_through_success_while_closed() {
        let cb = breaker(3, Duration::from_secs(60), MockClock::new());

        let result = cb.execute(|| async { Ok::<_, io::Error>(42) }).await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn opens_after_reaching_failure_threshold() {
        let cb = breaker(3, Duration::from_secs(60), MockClock::new());

        for _ in 0..2 {
            let _ = fail(&cb).await;
        }
        assert_eq!(cb.state(), CircuitState::Closed, "below threshold stays closed");

        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open, "threshold opens the circuit");
    }

    #[tokio::test]
    async fn open_circuit_rejects_without_invoking_operation() {
        let cb = breaker(1, Duration::from_secs(60), MockClock::new());
        let _ = fail(&cb).await;

        let calls = AtomicU32::new(0);
        let result = cb
            .execute(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, io::Error>(1) }
            })
            .await;

        assert!(matches!(result, Err(ResilienceError::CircuitOpen)));
        assert_eq!(calls.load(Ordering::SeqCst), 0, "operation must not run while open");
    }

    #[tokio::test]
    async fn cooldown_admits_the_next_call() {
        let clock = MockClock::new();
        let cb = breaker(2, Duration::from_secs(30), clock.clone());

        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(31));

        let result = cb.execute(|| async { Ok::<_, io::Error>("recovered") }).await;
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(cb.failure_count(), 0, "admission after cooldown clears the count");
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn cooldown_not_elapsed_keeps_rejecting() {
        let clock = MockClock::new();
        let cb = breaker(1, Duration::from_secs(60), clock.clone());

        let _ = fail(&cb).await;
        clock.advance(Duration::from_secs(30));

        let result = cb.execute(|| async { Ok::<_, io::Error>(()) }).await;
        assert!(matches!(result, Err(ResilienceError::CircuitOpen)));
        assert_eq!(cb.state(), CircuitState::Open);
    }

    #[tokio::test]
    async fn failure_after_cooldown_counts_from_zero() {
        let clock = MockClock::new();
        let cb = breaker(2, Duration::from_secs(10), clock.clone());

        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        clock.advance(Duration::from_secs(11));

        // The re-admitted attempt fails again: one fresh failure, still closed.
        let _ = fail(&cb).await;
        assert_eq!(cb.failure_count(), 1);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn success_leaves_failure_count_untouched_by_default() {
        let cb = breaker(5, Duration::from_secs(60), MockClock::new());

        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.failure_count(), 2);

        let _ = cb.execute(|| async { Ok::<_, io::Error>(()) }).await;
        assert_eq!(cb.failure_count(), 2, "cooldown-only policy keeps the count");
    }

    #[tokio::test]
    async fn success_clears_failure_count_with_reset_on_success() {
        let config = CircuitBreakerConfig::builder()
            .max_failures(5)
            .reset_on_success(true)
            .build()
            .unwrap();
        let cb = CircuitBreaker::with_clock(config, MockClock::new()).unwrap();

        let _ = fail(&cb).await;
        let _ = fail(&cb).await;
        assert_eq!(cb.failure_count(), 2);

        let _ = cb.execute(|| async { Ok::<_, io::Error>(()) }).await;
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test]
    async fn operation_error_is_preserved_as_source() {
        let cb = breaker(3, Duration::from_secs(60), MockClock::new());

        let result = cb.execute(|| async { Err::<(), _>(io::Error::other("boom")) }).await;

        match result {
            Err(ResilienceError::OperationFailed { source }) => {
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected OperationFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn reset_closes_the_circuit() {
        let cb = breaker(1, Duration::from_secs(60), MockClock::new());
        let _ = fail(&cb).await;
        assert_eq!(cb.state(), CircuitState::Open);

        cb.reset();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert_eq!(cb.failure_count(), 0);
    }

    #[tokio::test]
    async fn concurrent_failures_are_counted_exactly() {
        let cb = Arc::new(breaker(100, Duration::from_secs(60), MockClock::new()));
        let mut handles = vec![];

        for _ in 0..10 {
            let cb = Arc::clone(&cb);
            handles.push(tokio::spawn(async move {
                let _ = cb.execute(|| async { Err::<(), _>(io::Error::other("x")) }).await;
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(cb.failure_count(), 10);
    }

    #[test]
    fn mock_clock_advances_deterministically() {
        let clock = MockClock::new();
        let start = clock.now();

        clock.advance(Duration::from_secs(5));

        assert_eq!(clock.now().duration_since(start), Duration::from_secs(5));
        assert_eq!(clock.elapsed(), Duration::from_secs(5));
    }
}
