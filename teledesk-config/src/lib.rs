//! Shared configuration library for Teledesk.
//!
//! This crate centralizes config loading and validation so the CLI and any
//! future front-end share a single source of truth for defaults and override
//! precedence: built-in defaults, then an optional `teledesk.toml`, then
//! `TELEDESK_*` environment variables (a local `.env` is honored).

pub mod loader;
pub mod models;

pub use loader::{ConfigLoader, Overrides, error::ConfigLoadError};
pub use models::{Config, HttpConfig, ServerConfig, StoreConfig};
