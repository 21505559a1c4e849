use std::sync::Arc;
use std::time::Instant;

use axum::{Json, extract::State, http::HeaderMap};
use character_index::MatchQuery;
use tracing::{debug, info};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::{
        analyze::{analyze_request::AnalyzeRequest, analyze_response::AnalyzeResponse},
        request_id,
    },
};

pub async fn analyze_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(p): Json<AnalyzeRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    let request_id = request_id(&headers);

    if p.image_data.trim().is_empty() {
        return Err(AppError::BadRequest("image_data must not be empty".into()));
    }

    debug!(
        request_id = %request_id,
        payload_len = p.image_data.len(),
        "analyze_route: start"
    );

    let started = Instant::now();
    let outcome = state
        .engine
        .analyze(&p.image_data, &MatchQuery::default())
        .await;

    info!(
        request_id = %request_id,
        mode = ?outcome.mode,
        best = outcome.character.as_ref().map(|c| c.name.as_str()).unwrap_or("-"),
        suggestions = outcome.suggestions.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "analyze_route: done"
    );

    Ok(Json(outcome.into()))
}
