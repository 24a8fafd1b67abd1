//! # PriceSync Common
//!
//! Shared infrastructure-agnostic building blocks.
//!
//! This crate contains:
//! - Resilience patterns (circuit breaker) used by every remote client
//!
//! ## Architecture
//! - No dependencies on other PriceSync crates
//! - No I/O; pure in-process state machines

pub mod resilience;
