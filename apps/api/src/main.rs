mod config;
mod errors;
mod grid;
mod routes;
mod state;
mod store;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::grid::persist::LayoutStore;
use crate::grid::sessions::SessionRegistry;
use crate::grid::{GridConfig, SAVE_DEBOUNCE_MS};
use crate::routes::build_router;
use crate::state::AppState;
use crate::store::{HttpLayoutStore, InMemoryLayoutStore, PgLayoutStore};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Finboard API v{}", env!("CARGO_PKG_VERSION"));

    // Select the layout store backend.
    let store: Arc<dyn LayoutStore> = if let Some(database_url) = &config.database_url {
        let pg = PgLayoutStore::connect(database_url).await?;
        info!("Layout store: PostgreSQL");
        Arc::new(pg)
    } else if let Some(base_url) = &config.layout_store_url {
        info!("Layout store: remote HTTP ({base_url})");
        Arc::new(HttpLayoutStore::new(base_url.clone()))
    } else {
        warn!("No DATABASE_URL or LAYOUT_STORE_URL set; layouts are held in memory only");
        Arc::new(InMemoryLayoutStore::new())
    };

    let sessions = Arc::new(SessionRegistry::new(
        Arc::clone(&store),
        GridConfig::default(),
        Duration::from_millis(SAVE_DEBOUNCE_MS),
    ));

    let state = AppState { store, sessions };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive()); // TODO: tighten CORS in production

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
