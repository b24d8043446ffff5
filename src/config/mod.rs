//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Core config struct definitions (Config, ServerConfig, IdentityConfig)
//! - [`limits`]: Handshake and framing limits (LimitsConfig)
//! - [`defaults`]: serde default functions

mod defaults;
mod limits;
mod types;

pub use limits::LimitsConfig;
pub use types::{Config, ConfigError, IdentityConfig, ServerConfig};
