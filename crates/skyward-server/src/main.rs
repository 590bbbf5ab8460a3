use std::sync::Arc;

use clap::Parser;
use skyward_config::{CliArgs, Config, default_config_dir};
use skyward_server::{GameServer, ServerError};
use skyward_store::{MemoryStore, RonFileStore, ScoreStore};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    let args = CliArgs::parse();

    let config_dir = args.config.clone().unwrap_or_else(default_config_dir);
    let mut config = Config::load_or_create(&config_dir)?;
    config.apply_cli_overrides(&args);
    config.validate()?;

    skyward_log::init_logging(
        config.debug.log_dir.as_deref(),
        cfg!(debug_assertions),
        Some(&config),
    );
    tracing::info!("Skyward server starting");

    let store: Arc<dyn ScoreStore> = match &config.server.store_path {
        Some(path) => Arc::new(RonFileStore::open(path)?),
        None => {
            tracing::info!("No store path configured, scores are kept in memory");
            Arc::new(MemoryStore::new())
        }
    };

    let server = Arc::new(GameServer::new(config, store));
    let signal_target = Arc::clone(&server);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received, shutting down");
            signal_target.shutdown();
        }
    });

    if let Err(e) = server.run().await {
        tracing::error!("Server failed: {e}");
        return Err(e);
    }
    Ok(())
}
