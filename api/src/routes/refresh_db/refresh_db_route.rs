use std::sync::Arc;

use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
};
use character_index::RefreshStatus;
use tracing::{error, info, warn};

use crate::{
    core::app_state::AppState,
    error_handler::{AppError, AppResult},
    routes::{refresh_db::refresh_db_response::RefreshDbResponse, request_id},
};

/// Re-fetch the AniList catalog and rebuild the character index.
///
/// Runs inline: the response is sent once the new index is in place.
pub async fn refresh_db_route(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> AppResult<Json<RefreshDbResponse>> {
    let request_id = request_id(&headers);
    info!(request_id = %request_id, "refresh_db_route: start");

    match state.engine.refresh().await {
        Ok(RefreshStatus::Refreshed { count }) => {
            info!(request_id = %request_id, count, "refresh_db_route: done");
            Ok(Json(RefreshDbResponse {
                success: true,
                message: format!("Database refreshed with {count} characters"),
            }))
        }
        Ok(RefreshStatus::ModelNotLoaded) => {
            warn!(request_id = %request_id, "refresh_db_route: encoder not loaded");
            Ok(Json(RefreshDbResponse {
                success: false,
                message: "CLIP model not loaded yet, using sample data".into(),
            }))
        }
        Ok(RefreshStatus::Busy) => Err(AppError::Http {
            status: StatusCode::CONFLICT,
            code: "REFRESH_IN_PROGRESS",
            message: "A database refresh is already running".into(),
        }),
        Err(err) => {
            error!(request_id = %request_id, error = %err, "refresh_db_route: failed");
            Err(AppError::Http {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                code: "REFRESH_FAILED",
                message: format!("Database refresh failed: {err}"),
            })
        }
    }
}
