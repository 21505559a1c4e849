//! Unified error type for the character-index crate.

use clip_encoder::ClipError;
use thiserror::Error;

/// Errors produced by the character index.
#[derive(Debug, Error)]
pub enum IndexError {
    // ── Configuration / environment ──────────────────────────────────────────
    /// Failed to parse an environment variable into the expected type.
    #[error("failed to parse env variable: {key} = '{value}'")]
    EnvParse { key: String, value: String },

    /// Configuration combination is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Qdrant client / transport ───────────────────────────────────────────
    #[error("qdrant error: {0}")]
    Qdrant(String),

    // ── Encoder ─────────────────────────────────────────────────────────────
    #[error(transparent)]
    Encoder(#[from] ClipError),

    // ── Catalog (AniList) & image downloads ─────────────────────────────────
    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("image download failed for {url}: {reason}")]
    ImageDownload { url: String, reason: String },
}
