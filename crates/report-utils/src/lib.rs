//! Shared utilities for the report workspace
//!
//! Logging setup and application-level configuration used by the binaries.

pub mod config;
pub mod logging;

pub use config::{Config, ConfigError, LogFormat};
pub use logging::init_tracing_with;
