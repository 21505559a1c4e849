use std::sync::Arc;
use std::time::Instant;

use axum::{Json, extract::State, http::HeaderMap};
use tracing::{debug, info};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::{
        analyze::analyze_response::AnalyzeResponse,
        re_examine::re_examine_request::ReExamineRequest, request_id,
    },
};

pub async fn re_examine_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(p): Json<ReExamineRequest>,
) -> AppResult<Json<AnalyzeResponse>> {
    let request_id = request_id(&headers);

    if p.image_data.trim().is_empty() {
        return Err(AppError::BadRequest("image_data must not be empty".into()));
    }

    let query = p.query();
    debug!(
        request_id = %request_id,
        search_type = ?query.search_type,
        exclude = query.exclude_ids.len(),
        focus = query.focus_ids.len(),
        "re_examine_route: start"
    );

    let started = Instant::now();
    let outcome = state.engine.analyze(&p.image_data, &query).await;

    info!(
        request_id = %request_id,
        mode = ?outcome.mode,
        search_type = ?query.search_type,
        suggestions = outcome.suggestions.len(),
        elapsed_ms = started.elapsed().as_millis(),
        "re_examine_route: done"
    );

    Ok(Json(outcome.into()))
}
