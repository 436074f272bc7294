use crate::config::ServerConfig;
use crate::dashboard::{Dashboard, FigurePair};
use crate::types::ViewMode;
use anyhow::{Context, Result};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tracing::{debug, info};

#[derive(Deserialize)]
pub struct FigureParams {
    city1: Option<String>,
    city2: Option<String>,
    mode: Option<String>,
}

#[derive(Serialize)]
pub struct CitiesResponse {
    cities: Vec<String>,
    default: [String; 2],
}

pub fn router(dashboard: Arc<Dashboard>, static_dir: Option<&Path>) -> Router {
    let app = Router::new()
        .route("/api/cities", get(cities_handler))
        .route("/api/figures", get(figures_handler))
        .with_state(dashboard);

    let app = match static_dir {
        Some(dir) => app.fallback_service(ServeDir::new(dir)),
        None => app,
    };

    app.layer(CorsLayer::permissive())
}

pub async fn start_server(config: &ServerConfig, dashboard: Dashboard) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], config.port));
    let app = router(Arc::new(dashboard), config.static_dir.as_deref());

    info!("Starting server on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await?;
    Ok(())
}

async fn cities_handler(State(dashboard): State<Arc<Dashboard>>) -> Json<CitiesResponse> {
    let (first, second) = dashboard.default_selection();
    Json(CitiesResponse {
        cities: dashboard.cities().to_vec(),
        default: [first.to_string(), second.to_string()],
    })
}

async fn figures_handler(
    State(dashboard): State<Arc<Dashboard>>,
    Query(params): Query<FigureParams>,
) -> Result<Json<FigurePair>, (StatusCode, String)> {
    let mode = match params.mode.as_deref() {
        Some(raw) => raw
            .parse::<ViewMode>()
            .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?,
        None => ViewMode::Map,
    };

    let (default1, default2) = dashboard.default_selection();
    let city1 = params.city1.unwrap_or_else(|| default1.to_string());
    let city2 = params.city2.unwrap_or_else(|| default2.to_string());
    debug!(%city1, %city2, %mode, "Figure request");

    // Building is CPU-bound; keep it off the async workers.
    let pair = tokio::task::spawn_blocking(move || dashboard.update(&city1, &city2, mode))
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    Ok(Json(pair))
}
