//! Command-line argument parsing shared by the Skyward binaries.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Skyward command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Default)]
#[command(name = "skyward", about = "Skyward multiplayer server and client")]
pub struct CliArgs {
    /// Game port (server: listen, client: with --server, target).
    #[arg(long)]
    pub port: Option<u16>,

    /// Discovery broadcast port.
    #[arg(long)]
    pub discovery_port: Option<u16>,

    /// Server bind interface.
    #[arg(long)]
    pub bind: Option<String>,

    /// Server address for the client (`host` or `host:port`); skips discovery.
    #[arg(long)]
    pub server: Option<String>,

    /// Login name.
    #[arg(long)]
    pub username: Option<String>,

    /// Login password.
    #[arg(long)]
    pub password: Option<String>,

    /// RON file for users and scores (server).
    #[arg(long)]
    pub store: Option<PathBuf>,

    /// Fixed obstacle seed (server).
    #[arg(long)]
    pub seed: Option<u64>,

    /// Stop after this many simulation ticks (client).
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(port) = args.port {
            self.server.game_port = port;
        }
        if let Some(port) = args.discovery_port {
            self.server.discovery_port = port;
        }
        if let Some(ref bind) = args.bind {
            self.server.bind_address = bind.clone();
        }
        if let Some(ref server) = args.server {
            self.client.server_address = Some(server.clone());
        }
        if let Some(ref name) = args.username {
            self.client.username = name.clone();
        }
        if let Some(ref password) = args.password {
            self.client.password = password.clone();
        }
        if let Some(ref store) = args.store {
            self.server.store_path = Some(store.clone());
        }
        if let Some(seed) = args.seed {
            self.server.seed = Some(seed);
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
