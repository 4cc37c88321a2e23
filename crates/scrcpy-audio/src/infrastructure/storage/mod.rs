//! Storage infrastructure: settings file persistence.
//!
//! The `config` sub-module reads and writes the TOML settings file from the
//! platform config directory, supplies defaults on first run, and implements
//! the application's `ConfigStore` port so the supervisor can remember the
//! last successful connect.

pub mod config;

pub use config::{load_or_default, AppConfig, ConfigError, TomlConfigStore};
