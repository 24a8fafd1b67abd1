//! # PriceSync Infra
//!
//! Infrastructure adapters: the outbound HTTP stack and configuration
//! loading.
//!
//! This crate contains:
//! - A retrying HTTP transport over reqwest
//! - The Mindbox client implementing the core provider ports
//! - The environment configuration loader

pub mod config;
pub mod http;
pub mod mindbox;

pub use http::HttpClient;
pub use mindbox::MindboxClient;
