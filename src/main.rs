use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;

mod config;
mod core;
mod engine;
mod net;

use config::ServerConfig;
use engine::game_loop::GameLoop;
use engine::physics::PhysicsWorld;
use engine::simulation::Simulation;
use net::transport::{self, AppState};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = ServerConfig::parse();
    config.validate()?;

    info!("Starting Rusted Sandbox...");
    info!(
        "Tick rate {} Hz, outbox capacity {}, command mode {:?}",
        config.tick_hz, config.outbox_capacity, config.command_mode
    );

    let world = PhysicsWorld::from_config(&config.world_config())
        .context("Failed to build initial world")?;
    let sim = Arc::new(Simulation::new(world, config.command_mode));

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let driver = tokio::spawn(GameLoop::new(Arc::clone(&sim)).run(shutdown_rx.clone()));

    let app = transport::router(AppState {
        sim: Arc::clone(&sim),
        outbox_capacity: config.outbox_capacity,
        shutdown: shutdown_rx,
    });

    let listener = TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.addr))?;
    info!("Listening on ws://{}/ws", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(err) = tokio::signal::ctrl_c().await {
                log::error!("Failed to listen for Ctrl-C, running until killed: {}", err);
                std::future::pending::<()>().await;
            }
            info!("Shutdown requested, stopping...");
            let _ = shutdown_tx.send(true);
        })
        .await
        .context("Server error")?;

    let driver = driver.await.context("Simulation loop panicked")?;
    sim.broadcaster().clear();

    info!("Shut down cleanly after {} ticks", driver.tick_count());
    Ok(())
}
