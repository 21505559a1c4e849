pub mod core;
pub mod error_handler;
mod middleware_layer;
mod routes;

use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderName, Method, header},
    middleware,
    routing::{get, post},
};
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

pub use crate::core::app_state::{AppState, ProbeSchedule};
pub use crate::core::server_config::ServerConfig;
pub use crate::core::telemetry::init_tracing;
pub use crate::error_handler::AppError;

use crate::middleware_layer::json_extractor::json_error_mapper;
use crate::routes::{
    analyze::analyze_route::analyze_route, health::health_route::health_route,
    re_examine::re_examine_route::re_examine_route, refresh_db::refresh_db_route::refresh_db_route,
};

/// All routes under `/api`, with CORS, tracing, body limit and error mapping.
pub fn build_router(state: Arc<AppState>, max_body_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::ORIGIN,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static("x-request-id"),
        ]);

    let api = Router::new()
        .route("/analyze", post(analyze_route))
        .route("/re-examine", post(re_examine_route))
        .route("/health", get(health_route))
        .route("/refresh-db", post(refresh_db_route));

    Router::new()
        .nest("/api", api)
        .layer(middleware::from_fn(json_error_mapper))
        .layer(DefaultBodyLimit::max(max_body_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Boot the server from environment and serve until Ctrl+C.
pub async fn start() -> Result<(), AppError> {
    let server = ServerConfig::from_env()?;
    let state = Arc::new(AppState::from_env()?);
    let _warmup = state.spawn_warmup(ProbeSchedule::default());

    let app = build_router(state, server.max_body_bytes);

    let listener = tokio::net::TcpListener::bind(&server.address)
        .await
        .map_err(AppError::Bind)?;
    info!(address = %server.address, "anime guesser API listening");

    // Start server with graceful shutdown on Ctrl+C
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(AppError::Server)?;

    info!("server stopped");
    Ok(())
}

/// Returns a future that resolves when Ctrl+C is pressed
async fn shutdown_signal() {
    if let Err(e) = signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
