use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = firegate::config::Config::from_env()?;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(cfg.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database = cfg.database_url.is_some(),
        project_id = %cfg.firebase_project_id.as_deref().unwrap_or("<none>"),
        token_cookie = %cfg.token_cookie,
        loglevel = %cfg.loglevel
    );

    let listen_addr = cfg.listen_addr.clone();
    let handles = Arc::new(firegate::Handles::new(cfg)?);

    match handles.database().await {
        Ok(Some(_)) => info!("database handle ready"),
        Ok(None) => warn!("DATABASE_URL not set; running without a database"),
        Err(e) => warn!(error = %e, "database handle could not be created"),
    }

    // Missing service-account configuration is fatal here, before serving.
    let state = firegate::router::FiregateState::new(handles).await?;
    let app = firegate::router::firegate_router(state);

    let listener = TcpListener::bind(&listen_addr).await?;
    info!("HTTP server listening on {}", listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; shutting down");
    }
    info!("shutdown signal received");
}
