// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Wallscan Server - room scanning over HTTP.
//!
//! Clients create a session, upload one photo per wall while walking around
//! the room, stitch the walls into a room model, pick materials and download
//! the result.
//!
//! # Endpoints
//!
//! - `GET /api/v1/health` - Health check
//! - `GET /api/v1/materials` - Material catalog
//! - `POST /api/v1/sessions` - Start a session
//! - `POST /api/v1/sessions/:id/scan` - Scan a wall photo (multipart)
//! - `POST /api/v1/sessions/:id/stitch` - Stitch the room
//! - `POST /api/v1/detect` - Detect elements in one photo, no session
//! - `POST /api/v1/sessions/:id/materials` - Apply a material to a wall
//! - `DELETE /api/v1/sessions/:id/materials/:wall_index` - Remove a wall's material
//! - `GET /api/v1/sessions/:id/export/:format` - Download as `glb`, `obj` or `mtl`

use anyhow::Context;
use axum::{
    extract::DefaultBodyLimit,
    routing::{delete, get, post},
    Router,
};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{
    compression::CompressionLayer, cors::CorsLayer, timeout::TimeoutLayer, trace::TraceLayer,
};
use wallscan_room::{MaterialCatalog, SessionConfig, SessionStore, StitchConfig};
use wallscan_vision::{InferenceContext, PerceptionConfig};

mod config;
mod error;
mod routes;
mod types;

use config::Config;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<SessionStore>,
    pub catalog: Arc<MaterialCatalog>,
    pub inference: InferenceContext,
    pub stitch: Arc<StitchConfig>,
    pub config: Arc<Config>,
}

fn load_catalog(config: &Config) -> anyhow::Result<MaterialCatalog> {
    match &config.materials_path {
        Some(path) => MaterialCatalog::from_path(path)
            .with_context(|| format!("loading material catalog from {}", path)),
        None => Ok(MaterialCatalog::builtin()),
    }
}

/// Periodically drop idle sessions.
fn spawn_eviction(sessions: Arc<SessionStore>, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            if let Err(e) = sessions.evict_expired() {
                tracing::error!(error = %e, "session eviction failed");
            }
        }
    });
}

pub fn router(state: AppState) -> Router {
    let config = state.config.clone();
    Router::new()
        // Root endpoint - API information
        .route("/", get(routes::health::info))
        // Health check
        .route("/api/v1/health", get(routes::health::check))
        // Materials
        .route("/api/v1/materials", get(routes::materials::list))
        .route("/api/v1/materials/:id/texture", get(routes::materials::texture))
        // Stateless detection
        .route("/api/v1/detect", post(routes::detect::detect))
        // Sessions
        .route("/api/v1/sessions", post(routes::sessions::create))
        .route(
            "/api/v1/sessions/:id",
            get(routes::sessions::status).delete(routes::sessions::remove),
        )
        .route("/api/v1/sessions/:id/scan", post(routes::sessions::scan))
        .route("/api/v1/sessions/:id/stitch", post(routes::sessions::stitch))
        .route("/api/v1/sessions/:id/room", get(routes::sessions::room))
        .route("/api/v1/sessions/:id/materials", post(routes::sessions::apply_material))
        .route(
            "/api/v1/sessions/:id/materials/:wall_index",
            delete(routes::sessions::clear_material),
        )
        .route("/api/v1/sessions/:id/export/:format", get(routes::sessions::export))
        // Middleware
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(CompressionLayer::new())
        .layer(TimeoutLayer::new(Duration::from_secs(config.request_timeout_secs)))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "info,tower_http=debug,wallscan_server=debug".into()),
        )
        .pretty()
        .init();

    let config = Config::from_env();

    tracing::info!(
        port = config.port,
        max_upload_mb = config.max_upload_mb,
        worker_threads = config.worker_threads,
        session_ttl_secs = config.session_ttl_secs,
        ceiling_height = config.ceiling_height,
        "Starting Wallscan Server"
    );

    // Initialize rayon thread pool
    rayon::ThreadPoolBuilder::new()
        .num_threads(config.worker_threads)
        .build_global()
        .context("initializing rayon thread pool")?;

    let catalog = load_catalog(&config)?;
    tracing::info!(materials = catalog.len(), "material catalog loaded");

    let mut perception = PerceptionConfig::default();
    perception.depth.timeout_ms = config.depth_timeout_ms;

    let sessions = Arc::new(SessionStore::new(SessionConfig {
        ttl_secs: config.session_ttl_secs,
        ..Default::default()
    }));
    spawn_eviction(
        sessions.clone(),
        Duration::from_secs(config.eviction_interval_secs.max(1)),
    );

    let state = AppState {
        sessions,
        catalog: Arc::new(catalog),
        inference: InferenceContext::new(perception),
        stitch: Arc::new(StitchConfig::default().with_ceiling_height(config.ceiling_height)),
        config: Arc::new(config.clone()),
    };

    let app = router(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("binding {}", addr))?;
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
