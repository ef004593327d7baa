//! Web Thing Server
//!
//! Hosts Web Things over HTTP and WebSocket:
//! - Configuration loading (TOML plus command-line overrides)
//! - Built-in thing types (a dimmable lamp and a humidity sensor)
//! - REST API and per-thing WebSocket channel

// Re-export core crates
pub use thing_runtime;
pub use thing_types;

pub mod config;
pub mod server;
pub mod things;
