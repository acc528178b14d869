use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use coupon_redemption_service::{
    config::Config,
    database::Database,
    handlers::{self, AppState},
    services::{
        directory::{Directory, PgDirectory},
        ledger::{PgUsageLedger, UsageLedger},
        redemption::RedemptionService,
    },
};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database = Database::connect(&config.database_url, config.max_db_connections).await?;
    database.migrate().await?;

    let retry = config.retry_policy();
    let directory: Arc<dyn Directory> = Arc::new(PgDirectory::new(database.clone(), retry.clone()));
    let ledger: Arc<dyn UsageLedger> = Arc::new(PgUsageLedger::new(database, retry));
    let redemption = Arc::new(RedemptionService::new(Arc::clone(&directory), ledger));

    let state = AppState {
        directory,
        redemption,
    };

    let app = handlers::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", config.port)).await?;
    tracing::info!(port = config.port, "coupon redemption service listening");
    axum::serve(listener, app).await?;

    Ok(())
}
