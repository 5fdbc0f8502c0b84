use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tower_http::cors::{Any, CorsLayer};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use ecoledger_backend::config::Config;
use ecoledger_backend::rest::{self, AppState};
use ecoledger_backend::Ledger;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env();
    info!("starting ecoledger with database {}", config.database_url);

    let ledger = Arc::new(Ledger::open(&config.database_url).await?);

    // Hourly rollover check; the first request after a month boundary also
    // triggers it, this just covers quiet periods.
    let rollover = ledger.clone();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            ticker.tick().await;
            if let Err(e) = rollover.rollover.close_month_if_due().await {
                error!("monthly rollover check failed: {}", e);
            }
        }
    });

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = rest::router(AppState { ledger }).layer(cors);

    let addr: SocketAddr = config.bind_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("listening on {}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
