//! HTTP server for testgend.

use crate::config::Config;
use crate::history::HistoryStore;
use crate::routes;
use anyhow::{Context, Result};
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing::info;

/// Application state shared across handlers. Requests are otherwise
/// isolated; the history store is the only shared collaborator.
pub struct AppState {
    pub config: Config,
    pub store: Arc<HistoryStore>,
}

impl AppState {
    pub fn new(config: Config, store: HistoryStore) -> Self {
        Self {
            config,
            store: Arc::new(store),
        }
    }
}

/// Run the HTTP server until the process is stopped.
pub async fn run(config: Config) -> Result<()> {
    let store = HistoryStore::open(&config.server.db_path)
        .with_context(|| format!("Failed to open history store at {:?}", config.server.db_path))?;

    let addr = config.server.bind_addr.clone();
    let state = Arc::new(AppState::new(config, store));

    let app = routes::routes()
        .with_state(state)
        .layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
