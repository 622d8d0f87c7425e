use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use madlibs_responder::{build_router, Config, Dispatcher, HttpCallbackSender};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("madlibs=info".parse()?))
        .init();

    info!("Madlibs responder starting...");

    let config = Config::from_env()?;
    config.log_summary();

    // A partially-loaded catalog must never serve traffic.
    let catalog = Arc::new(config.load_catalog()?);
    info!(words = catalog.len(), "Word catalog loaded");

    let sender = Arc::new(HttpCallbackSender::new(config.callback_timeout)?);
    let dispatcher = Arc::new(Dispatcher::new(catalog, sender));
    let app = build_router(dispatcher);

    let addr = config.bind_addr();
    info!("Madlibs responder listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
