use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::info;

pub mod handlers;
pub mod state;

pub use state::AppState;

use hn_core::Result;

pub fn create_app(state: AppState) -> Router {
    let cors = CorsLayer::permissive();

    Router::new()
        .route("/api/query", post(handlers::query))
        .route("/api/health", get(handlers::health))
        .route("/api/stats", get(handlers::stats))
        .layer(cors)
        .with_state(Arc::new(state))
}

/// Bind and serve the API until the process is stopped.
pub async fn serve(addr: &str, state: AppState) -> Result<()> {
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("🌐 Listening on {}", addr);
    axum::serve(listener, app)
        .await
        .map_err(|e| hn_core::Error::External(e.into()))?;
    Ok(())
}

pub mod prelude {
    pub use crate::AppState;
    pub use hn_core::{Error, Result};
}
