//! Mindbox pricing provider adapter

pub mod client;
pub mod wire;

pub use client::MindboxClient;
