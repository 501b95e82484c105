//! crab-loyalty: loyalty session and order-transaction service
//!
//! - Submits orders atomically with visit sessions, order numbers and gifts
//! - Serves the polled loyalty status snapshot
//! - Converts, reverts and redeems rewards
//!
//! `crab-loyalty migrate` applies schema migrations and exits.

use crab_loyalty::{api, config::Config, db, state::AppState};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

fn init_tracing() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "crab_loyalty=info,tower_http=info".into());

    if std::env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load .env file
    let _ = dotenvy::dotenv();

    init_tracing();

    let config = Config::from_env()?;

    if std::env::args().nth(1).as_deref() == Some("migrate") {
        let pool = db::connect(&config).await?;
        db::run_migrations(&pool).await?;
        return Ok(());
    }

    tracing::info!("Starting crab-loyalty (env: {})", config.environment);

    let state = AppState::new(&config).await?;
    let app = api::create_router(state);

    let http_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&http_addr).await?;
    tracing::info!("crab-loyalty HTTP listening on {http_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("crab-loyalty stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
    }
}
