use std::sync::Arc;

use axum::{Json, extract::State};

use crate::{core::app_state::AppState, routes::health::health_response::HealthResponse};

pub const SERVICE_NAME: &str = "anime-guesser-api";

/// Liveness plus model / index status. Always 200 while the process serves.
pub async fn health_route(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let (snapshot, backend) = tokio::join!(state.engine.health(), state.probe.check(&state.clip));
    let model_loaded = snapshot.model_loaded();

    let (model_device, model_name, provider) = match snapshot.encoder {
        Some(d) => (d.device, d.model, d.provider),
        None => (
            "unavailable".to_string(),
            state.clip.model.clone(),
            state.clip.provider,
        ),
    };

    Json(HealthResponse {
        status: "healthy",
        service: SERVICE_NAME,
        version: env!("CARGO_PKG_VERSION"),
        model_loaded,
        model_device,
        model_name,
        provider,
        characters_count: snapshot.characters_count,
        vector_store_ok: snapshot.vector_store_ok,
        encoder_ok: backend.ok,
        encoder_message: backend.message,
        encoder_latency_ms: backend.latency_ms,
    })
}
