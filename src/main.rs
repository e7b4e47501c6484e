//! Application entrypoint and state wiring.

use anyhow::{Context, Result};
use heartbeat_ledger::{
    apply_middleware,
    config::{Config, LogFormat},
    create_router,
    ledger::LedgerStore,
    AppState,
};
use tokio::net::TcpListener;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initializes logging; `RUST_LOG` overrides the default filter.
fn init_logging(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn,heartbeat_ledger=info,tower_http=info"));
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .with_file(true)
                    .with_line_number(true)
                    .with_target(false),
            )
            .init(),
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1) config; a missing ADDR ends the process here
    let config = Config::from_env().context("loading configuration")?;
    init_logging(config.log_format);
    debug!(?config, "configuration loaded");

    // 2) ledger with its genesis block
    let ledger = LedgerStore::new().context("creating genesis block")?;
    let state = AppState::new(ledger);

    // 3) router
    let app = apply_middleware(create_router(state), &config);

    // 4) serve
    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(address = %config.listen_addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;
    Ok(())
}
