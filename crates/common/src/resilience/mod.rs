//! Resilience patterns for building fault-tolerant remote calls

pub mod circuit_breaker;

pub use circuit_breaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerConfigBuilder, CircuitState, Clock,
    ConfigError, MockClock, ResilienceError, SystemClock,
};
