use anyhow::Result;
use std::sync::Arc;

use gigmarket_backend::services::StripeClient;
use gigmarket_backend::store::PgStore;
use gigmarket_backend::{app, config, db, logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let settings = config::Settings::from_env()?;

    logging::init_logging(&settings.env);

    tracing::info!(
        env = ?settings.env,
        server_addr = %settings.server_addr,
        fee_bps = settings.platform_fee.bps(),
        currency = %settings.payment_currency,
        "Starting gigmarket backend"
    );

    let pool = db::create_pool(&settings).await?;
    db::run_migrations(&pool).await?;
    let store = Arc::new(PgStore::new(pool));

    let payments = Arc::new(StripeClient::new(
        &settings.stripe_api_base,
        &settings.stripe_secret_key,
        settings.stripe_timeout_seconds,
    )?);

    let state = app::AppState::new(settings.clone(), store, payments);
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(&settings.server_addr).await?;
    tracing::info!("Listening on {}", settings.server_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
