//! Patient records server binary.
//!
//! # Environment Variables
//! - `PATIENT_DB_PATH`: SQLite database file (required)
//! - `PATIENT_DB_POOL_SIZE`, `PATIENT_DB_ACQUIRE_TIMEOUT_MS`,
//!   `PATIENT_DB_ACQUIRE_RETRIES`, `PATIENT_DB_BUSY_TIMEOUT_MS`: pool tuning
//! - `PATIENT_RECORDS_ADDR`: listen address (default: "0.0.0.0:3000")
//! - `PATIENT_PAGE_SIZE`: rows per list page (default: 50)
//! - `PATIENT_CONSULTANTS`: consultant line on the home page
//!
//! A `.env` file in the working directory is loaded first if present.

use patient_records_core::{Database, StoreConfig};
use patient_records_web::{router, AppState, WebConfig};
use tower_http::trace::{DefaultOnResponse, TraceLayer};
use tracing::Level;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("patient_records=info".parse()?)
                .add_directive("tower_http=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store_config = StoreConfig::from_env()?;
    let web_config = WebConfig::from_env()?;

    tracing::info!(
        "-- Opening patient store at {}",
        store_config.database_path().display()
    );
    let db = tokio::task::spawn_blocking(move || Database::open(&store_config)).await??;

    let app = router(AppState::new(db, &web_config))
        .layer(TraceLayer::new_for_http().on_response(DefaultOnResponse::new().level(Level::INFO)));

    tracing::info!("-- Starting patient records server on {}", web_config.addr());
    let listener = tokio::net::TcpListener::bind(web_config.addr()).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("-- Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
    }
}
