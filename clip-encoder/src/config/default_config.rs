//! Default CLIP encoder config loaded from environment variables.
//!
//! # Environment variables
//!
//! - `CLIP_PROVIDER`      = `remote` (default) | `local`
//! - `CLIP_MODEL`         = model id (default `openai/clip-vit-base-patch32`)
//! - `CLIP_ENDPOINT`      = remote base URL (default `http://localhost:7997`)
//! - `CLIP_API_KEY`       = optional bearer token
//! - `CLIP_EMBEDDING_DIM` = expected vector size (default 512)
//! - `CLIP_TIMEOUT_SECS`  = remote request timeout (default 30)

use crate::{
    config::{clip_model_config::ClipModelConfig, clip_provider::ClipProvider},
    error_handler::{ConfigError, Result, env_opt, validate_http_endpoint},
};

pub const DEFAULT_MODEL: &str = "openai/clip-vit-base-patch32";
pub const DEFAULT_ENDPOINT: &str = "http://localhost:7997";
pub const DEFAULT_DIM: usize = 512;
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Builds the encoder config from process environment.
///
/// # Errors
/// See [`config_from_lookup`].
pub fn config_from_env() -> Result<ClipModelConfig> {
    config_from_lookup(env_opt)
}

/// Builds the encoder config from an arbitrary key lookup.
///
/// # Errors
/// - [`ConfigError::UnsupportedProvider`] for an unknown `CLIP_PROVIDER`
/// - [`ConfigError::InvalidNumber`] for unparsable numbers
/// - [`ConfigError::OutOfRange`] when `CLIP_EMBEDDING_DIM` is zero
/// - [`ConfigError::InvalidFormat`] when the remote endpoint has no http(s) scheme
/// - [`ConfigError::EmptyModel`] when `CLIP_MODEL` is blank
pub fn config_from_lookup<F>(lookup: F) -> Result<ClipModelConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let provider = match lookup("CLIP_PROVIDER") {
        Some(p) => p.parse::<ClipProvider>()?,
        None => ClipProvider::Remote,
    };

    let model = lookup("CLIP_MODEL").unwrap_or_else(|| DEFAULT_MODEL.to_string());
    if model.trim().is_empty() {
        return Err(ConfigError::EmptyModel.into());
    }

    let endpoint = lookup("CLIP_ENDPOINT").unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
    if provider == ClipProvider::Remote {
        validate_http_endpoint("CLIP_ENDPOINT", &endpoint)?;
    }

    let dim = match lookup("CLIP_EMBEDDING_DIM") {
        Some(v) => v.trim().parse::<usize>().map_err(|_| ConfigError::InvalidNumber {
            var: "CLIP_EMBEDDING_DIM",
            reason: "expected usize",
        })?,
        None => DEFAULT_DIM,
    };
    if dim == 0 {
        return Err(ConfigError::OutOfRange {
            field: "CLIP_EMBEDDING_DIM",
            detail: "must be > 0",
        }
        .into());
    }

    let timeout_secs = match lookup("CLIP_TIMEOUT_SECS") {
        Some(v) => v.trim().parse::<u64>().map_err(|_| ConfigError::InvalidNumber {
            var: "CLIP_TIMEOUT_SECS",
            reason: "expected u64",
        })?,
        None => DEFAULT_TIMEOUT_SECS,
    };

    Ok(ClipModelConfig {
        provider,
        model,
        endpoint: endpoint.trim().trim_end_matches('/').to_string(),
        api_key: lookup("CLIP_API_KEY"),
        dim,
        timeout_secs,
    })
}
