//! shelfscore - Product resolution microservice
//!
//! Resolves barcodes to scored product records over HTTP.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use shelfscore::config::ServiceConfig;
use shelfscore::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("Starting shelfscore product resolution service");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let config = ServiceConfig::load()?;
    config.ensure_data_dir()?;

    let db_path = config.database_path();
    info!("Database: {}", db_path.display());
    let db_pool = shelfscore::db::init_database_pool(&db_path).await?;
    info!("Database connection established");

    let resolver = shelfscore::build_resolver(&config, db_pool)?;
    let state = AppState::new(resolver);
    let app = shelfscore::build_router(state);

    let listener = tokio::net::TcpListener::bind(("127.0.0.1", config.port)).await?;
    info!("Listening on http://127.0.0.1:{}", config.port);
    info!("Health check: http://127.0.0.1:{}/health", config.port);

    axum::serve(listener, app).await?;

    Ok(())
}
