//! Logging and configuration shared by lnchan binaries

pub mod config;
#[cfg(feature = "main")]
pub mod logging;

pub use config::{load_config, Config, ConfigError};
