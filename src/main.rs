use anyhow::{Context, Result};
use clap::Parser;
use tokio::net::TcpListener;

use radar_telemetry::broadcast::{self, AppState};
use radar_telemetry::config::ServerConfig;
use radar_telemetry::server;

#[tokio::main]
async fn main() -> Result<()> {
    let config = ServerConfig::parse();

    let level = if config.verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::new()
        .filter_level(level)
        .parse_default_env()
        .init();

    let radar = config.build_radar().context("Invalid configuration")?;
    log::info!("Telemetry source: {}", radar.describe());
    let state = AppState::new(radar, config.update_rate);

    let listener = TcpListener::bind((config.host.as_str(), config.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", config.host, config.port))?;
    log::info!("Radar server on ws://{}:{}", config.host, config.port);

    let tick_handle = tokio::spawn(broadcast::run_tick_loop(state.clone(), config.update_rate));
    let reconnect_handle = tokio::spawn(broadcast::run_reconnect_loop(
        state.clone(),
        config.reconnect_delay(),
    ));

    tokio::select! {
        result = server::serve(listener, state.clone()) => {
            result.context("Server stopped unexpectedly")?;
        }
        signal = tokio::signal::ctrl_c() => {
            signal.context("Failed to listen for Ctrl+C")?;
            log::info!("Shutting down");
        }
    }

    tick_handle.abort();
    reconnect_handle.abort();
    state.radar.lock().await.shutdown();
    log::info!("Radar server stopped");
    Ok(())
}
