//! Configuration sections with defaults and RON persistence.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use skyward_multiplayer::{ReconcileConfig, RespawnPolicy};
use skyward_physics::WorldParams;

use crate::error::ConfigError;

/// File name looked up inside the config directory.
pub const CONFIG_FILE: &str = "config.ron";

/// Top-level configuration shared by the server and client binaries.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// World constants. Server and clients must agree on these.
    pub world: WorldParams,
    /// Authority settings.
    pub server: ServerConfig,
    /// Client settings.
    pub client: ClientConfig,
    /// Wire settings.
    pub network: NetworkConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Authority configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ServerConfig {
    /// Interface to bind the game socket on.
    pub bind_address: String,
    /// Game port.
    pub game_port: u16,
    /// Port discovery announcements are broadcast to.
    pub discovery_port: u16,
    /// Milliseconds between discovery announcements.
    pub discovery_interval_ms: u64,
    /// Rows in the broadcast leaderboard.
    pub leaderboard_size: usize,
    /// RON file for users and best scores. `None` keeps them in memory.
    pub store_path: Option<PathBuf>,
    /// How dead actors ask to respawn.
    pub respawn_policy: RespawnPolicy,
    /// Fixed seed for obstacle gaps. `None` draws from OS entropy.
    pub seed: Option<u64>,
}

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClientConfig {
    /// Login name.
    pub username: String,
    /// Login password.
    pub password: String,
    /// Authority address (`host:port`). `None` uses LAN discovery.
    pub server_address: Option<String>,
    /// How long to listen for discovery announcements.
    pub discovery_timeout_ms: u64,
    /// How long to wait for a login answer.
    pub login_timeout_ms: u64,
    /// Bounded wait of the snapshot receive task.
    pub recv_timeout_ms: u64,
    /// Outer loop rate in Hz; the simulation still steps at the world tick rate.
    pub render_fps: u32,
    /// Longest frame the fixed-step accumulator will absorb.
    pub max_frame_ms: u64,
    /// Reconciliation tolerances and buffer limits.
    pub reconcile: ReconcileConfig,
}

/// Wire configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    /// Decimal places floats are rounded to in `state` messages.
    pub wire_decimals: i32,
    /// Receive buffer size in bytes.
    pub max_datagram: usize,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info,skyward_net=trace").
    pub log_level: String,
    /// Directory for JSON log files in debug builds.
    pub log_dir: Option<PathBuf>,
}

// --- Default implementations ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            game_port: 50007,
            discovery_port: 37020,
            discovery_interval_ms: 2000,
            leaderboard_size: 10,
            store_path: None,
            respawn_policy: RespawnPolicy::default(),
            seed: None,
        }
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            username: "player".to_string(),
            password: String::new(),
            server_address: None,
            discovery_timeout_ms: 5000,
            login_timeout_ms: 2000,
            recv_timeout_ms: 100,
            render_fps: 60,
            max_frame_ms: 250,
            reconcile: ReconcileConfig::default(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            wire_decimals: 2,
            max_datagram: 65536,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

// --- Durations ---

impl ServerConfig {
    pub fn discovery_interval(&self) -> Duration {
        Duration::from_millis(self.discovery_interval_ms)
    }
}

impl ClientConfig {
    pub fn discovery_timeout(&self) -> Duration {
        Duration::from_millis(self.discovery_timeout_ms)
    }

    pub fn login_timeout(&self) -> Duration {
        Duration::from_millis(self.login_timeout_ms)
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }

    pub fn max_frame(&self) -> Duration {
        Duration::from_millis(self.max_frame_ms)
    }
}

// --- Load / Save / Reload ---

/// Platform config directory for Skyward, falling back to `./skyward`.
pub fn default_config_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("skyward")
}

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);
        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(config_dir.join(CONFIG_FILE), serialized).map_err(ConfigError::WriteError)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let w = &self.world;
        if w.tick_rate == 0 {
            return Err(ConfigError::Invalid("world.tick_rate must be positive".into()));
        }
        if w.spawn_interval_ticks == 0 {
            return Err(ConfigError::Invalid(
                "world.spawn_interval_ticks must be positive".into(),
            ));
        }
        if w.obstacle_gap <= 0.0 || w.obstacle_gap >= w.world_height {
            return Err(ConfigError::Invalid(
                "world.obstacle_gap must lie between 0 and world_height".into(),
            ));
        }
        if !(0.0 < w.spawn_y && w.spawn_y < w.world_height) {
            return Err(ConfigError::Invalid(
                "world.spawn_y must lie strictly inside the world".into(),
            ));
        }
        let r = &self.client.reconcile;
        if r.low_water > r.high_water {
            return Err(ConfigError::Invalid(
                "client.reconcile.low_water must not exceed high_water".into(),
            ));
        }
        if self.client.render_fps == 0 {
            return Err(ConfigError::Invalid("client.render_fps must be positive".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("game_port: 50007"));
        assert!(ron_str.contains("tick_rate: 30"));
        assert!(ron_str.contains("respawn_policy: FlapWhileDead"));
    }

    #[test]
    fn test_missing_section_uses_default() {
        let config: Config = ron::from_str("(server: (game_port: 6000))").unwrap();
        assert_eq!(config.server.game_port, 6000);
        assert_eq!(config.server.discovery_port, 37020);
        assert_eq!(config.client, ClientConfig::default());
        assert_eq!(config.world, WorldParams::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.client.username = "ann".to_string();
        config.server.store_path = Some(PathBuf::from("/tmp/scores.ron"));
        config.client.reconcile.position_threshold = 3.0;

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_creates_default_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(Config::default().validate().is_ok());

        let mut config = Config::default();
        config.world.tick_rate = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.client.reconcile.low_water = 500;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_durations() {
        let config = Config::default();
        assert_eq!(config.server.discovery_interval(), Duration::from_secs(2));
        assert_eq!(config.client.discovery_timeout(), Duration::from_secs(5));
    }
}
