use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use character_index::IndexError;
use clip_encoder::ClipError;
use thiserror::Error;

use crate::core::http::response_envelope::{ApiErrorDetail, ErrorEnvelope};
use crate::core::server_config::ConfigError;

/// Public application error type.
#[derive(Debug, Error)]
pub enum AppError {
    // --- Boot / config ---
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Index(#[from] IndexError),

    #[error(transparent)]
    Encoder(#[from] ClipError),

    #[error("failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),

    // --- IO / network / server ---
    #[error("failed to bind listener")]
    Bind(#[source] std::io::Error),

    #[error("server error")]
    Server(#[source] std::io::Error),

    // --- Request / routing ---
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Rich HTTP error with specific status & code.
    #[error("{message}")]
    Http {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
}

impl AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Http { status, .. } => *status,
            AppError::Index(IndexError::Catalog(_)) => StatusCode::BAD_GATEWAY,
            AppError::Config(_)
            | AppError::Index(_)
            | AppError::Encoder(_)
            | AppError::HttpClient(_)
            | AppError::Bind(_)
            | AppError::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_code(&self) -> &'static str {
        match self {
            AppError::Config(_) => "CONFIG_ERROR",
            AppError::Index(IndexError::Catalog(_)) => "CATALOG_UNAVAILABLE",
            AppError::Index(_) => "INDEX_ERROR",
            AppError::Encoder(_) => "ENCODER_ERROR",
            AppError::HttpClient(_) => "HTTP_CLIENT_ERROR",
            AppError::Bind(_) => "BIND_ERROR",
            AppError::Server(_) => "SERVER_ERROR",
            AppError::BadRequest(_) => "BAD_REQUEST",
            AppError::Http { code, .. } => code,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let envelope = match self {
            AppError::BadRequest(message) => ErrorEnvelope::invalid_request(vec![ApiErrorDetail {
                path: None,
                message,
                hint: None,
            }]),
            other => ErrorEnvelope::new(other.error_code(), other.to_string(), Vec::new()),
        };
        envelope.into_response_with_status(status)
    }
}

/// Handy result alias used across handlers.
pub type AppResult<T> = Result<T, AppError>;
