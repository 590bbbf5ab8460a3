//! Configuration system for Skyward.
//!
//! Settings persist to disk as `config.ron`, every section falls back to
//! its defaults when missing, and clap arguments override the file.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    CONFIG_FILE, ClientConfig, Config, DebugConfig, NetworkConfig, ServerConfig,
    default_config_dir,
};
pub use error::ConfigError;
