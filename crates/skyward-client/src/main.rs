use clap::Parser;
use skyward_client::{Autopilot, ClientError, ClientGame, connect, resolve_server};
use skyward_config::{CliArgs, Config, default_config_dir};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), ClientError> {
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
    tracing::info!("Skyward client starting as {}", config.client.username);

    let server = resolve_server(&config).await?;
    let (link, accepted) = match connect(&config, server).await {
        Ok(connected) => connected,
        Err(e) => {
            tracing::error!("Could not join {server}: {e}");
            return Err(e);
        }
    };

    let mut params = config.world;
    if accepted.tick_rate != params.tick_rate {
        tracing::warn!(
            "Server ticks at {} Hz, local config says {} Hz; following the server",
            accepted.tick_rate,
            params.tick_rate
        );
        params.tick_rate = accepted.tick_rate;
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let (feed, snapshots) =
        link.spawn_snapshot_feed(shutdown_rx.clone(), config.client.recv_timeout());

    tokio::spawn({
        let shutdown_tx = shutdown_tx.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Interrupt received, leaving");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    let mut game = ClientGame::new(
        link.clone(),
        snapshots,
        params,
        config.client.reconcile,
        Autopilot,
    );
    game.run(
        config.client.render_fps,
        config.client.max_frame(),
        args.ticks,
        shutdown_rx,
    )
    .await;

    if let Some(local) = game.predictor().local() {
        tracing::info!(
            "Final state: y={:.2} alive={} score={}",
            local.body.y,
            local.body.alive,
            local.score
        );
    }

    if let Err(e) = link.send_disconnect().await {
        tracing::warn!("Failed to send disconnect: {e}");
    }
    let _ = shutdown_tx.send(true);
    if let Err(e) = feed.await {
        tracing::warn!("Snapshot feed ended abnormally: {e}");
    }
    Ok(())
}
