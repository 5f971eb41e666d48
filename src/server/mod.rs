use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::config::SeedMakerConfig;
use crate::registry::Registry;

pub mod routes;

/// Server state
pub struct AppState {
    pub config: SeedMakerConfig,
    pub registry: Arc<Registry>,
}

pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/resources", get(routes::list_all))
        .route("/api/resources/{resource_type}", get(routes::list_type))
        .route("/api/seed-package", post(routes::create_seed_package))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn start_server(port: u16, config: SeedMakerConfig) -> anyhow::Result<()> {
    let state = Arc::new(AppState {
        config,
        registry: Arc::new(Registry::builtin()?),
    });
    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);
    println!("🌍 Server running at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
