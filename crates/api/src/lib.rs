//! # PriceSync API
//!
//! HTTP transport layer - thin adapters over the core services.
//!
//! This crate contains:
//! - The axum router and request handlers
//! - Application state (dependency wiring)
//! - The server entry point
//!
//! ## Architecture
//! - Depends on `domain`, `core`, and `infra`
//! - Handlers only parse requests, call into the core, and serialize
//!   its output

pub mod routes;
pub mod state;

// Re-export for convenience
pub use routes::build_router;
pub use state::AppState;
