//! Scholarship portal client — entry point.
//!
//! Loads one page session from the portal backend (profile, catalogue and
//! applications) and serves the engine's derived views as a small local
//! JSON API.

use std::sync::Arc;

use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use scholar_portal::api;
use scholar_portal::client::RestClient;
use scholar_portal::config::Config;
use scholar_portal::session::Session;
use scholar_portal::store::SqliteStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging (RUST_LOG controls verbosity).
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Load optional .env file (ignored if missing).
    let _ = dotenvy::dotenv();

    let config = Config::from_env().map_err(|e| anyhow::anyhow!("{e}"))?;

    // Client-side storage: auth token, role, saved drafts.
    let store = SqliteStore::connect(&config.store_url).await?;

    let client = RestClient::new(&config.api_base_url, config.request_timeout())?;

    let session = Arc::new(Session::new(client, store));
    if let Err(e) = session.load().await {
        // Data views report the failure until a successful POST /refresh.
        warn!("Starting with an unloaded session: {e}");
    }

    let app = api::router(session)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("127.0.0.1:{}", config.portal_port);
    info!("Portal listening on http://{addr} (backend {})", config.api_base_url);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
