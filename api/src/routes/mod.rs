pub mod analyze;
pub mod health;
pub mod re_examine;
pub mod refresh_db;

use axum::http::HeaderMap;

use crate::middleware_layer::json_extractor::REQUEST_ID_HEADER;

/// Caller-supplied request id for log correlation, or `-`.
pub(crate) fn request_id(headers: &HeaderMap) -> &str {
    headers
        .get(REQUEST_ID_HEADER)
        .and_then(|h| h.to_str().ok())
        .unwrap_or("-")
}
