mod api;
mod bootstrap;
mod health;

use std::future::IntoFuture;
use std::time::Duration;

use anyhow::Result;
use charterdesk_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use charterdesk_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    // Now bootstrap using the same config we already loaded
    let app = bootstrap::bootstrap_with_config(config).await?;

    let state = api::ApiState::new(app.quotes.clone(), app.bookings.clone());
    let router = api::router(state).merge(health::router(app.db_pool.clone()));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "system.server.started",
        bind_address = %address,
        "charterdesk-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let serve =
        axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()).into_future();
    tokio::pin!(serve);

    // Once the shutdown signal lands, in-flight requests get the configured
    // grace period to drain before the process exits anyway.
    let drain_deadline = async {
        let _ = tokio::signal::ctrl_c().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = &mut serve => result?,
        _ = drain_deadline => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                grace_secs = grace.as_secs(),
                "open connections did not drain in time; exiting"
            );
        }
    }

    tracing::info!(event_name = "system.server.stopped", "charterdesk-server stopped");
    Ok(())
}

async fn wait_for_shutdown() {
    let _ = tokio::signal::ctrl_c().await;
    tracing::info!(
        event_name = "system.server.stopping",
        "shutdown signal received; draining connections"
    );
}
