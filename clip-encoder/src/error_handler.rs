//! Unified error handling for `clip-encoder`.
//!
//! This module exposes a single top-level error type [`ClipError`] for the whole
//! library, and groups domain-specific errors in nested enums ([`ConfigError`],
//! [`ProviderError`], [`ImageDataError`]). Small helpers for reading/validating
//! environment variables are provided and return the unified [`Result<T>`] alias.
//!
//! All messages include the prefix `[CLIP Encoder]` to simplify attribution in logs.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

/* ------------------------------------------------------------------------- */
/* Public result alias                                                       */
/* ------------------------------------------------------------------------- */

/// Unified result alias for the entire crate.
pub type Result<T> = std::result::Result<T, ClipError>;

/* ------------------------------------------------------------------------- */
/* Top-level error                                                           */
/* ------------------------------------------------------------------------- */

/// Top-level error for the `clip-encoder` crate.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ClipError {
    /// Configuration/validation errors (startup).
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Inference backend returned something we cannot use.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// The uploaded image payload could not be turned into image bytes.
    #[error(transparent)]
    ImageData(#[from] ImageDataError),

    /// Underlying HTTP transport error.
    #[error("[CLIP Encoder] transport error: {0}")]
    HttpTransport(#[from] reqwest::Error),

    /// Operation exceeded the configured timeout.
    #[error("[CLIP Encoder] operation timed out after {0:?}")]
    Timeout(Duration),
}

/* ------------------------------------------------------------------------- */
/* Config errors                                                             */
/* ------------------------------------------------------------------------- */

/// Errors that realistically happen at config load/validation time.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A number failed to parse (dimensions, timeouts).
    #[error("[CLIP Encoder] invalid number in {var}: {reason}")]
    InvalidNumber {
        var: &'static str,
        reason: &'static str,
    },

    /// Unsupported or not compiled-in provider in `CLIP_PROVIDER`.
    #[error("[CLIP Encoder] unsupported provider: {0}")]
    UnsupportedProvider(String),

    /// Value had the wrong format (e.g., invalid URL).
    #[error("[CLIP Encoder] invalid format in {var}: {reason}")]
    InvalidFormat {
        var: &'static str,
        reason: &'static str,
    },

    /// A numeric field was outside of the allowed range.
    #[error("[CLIP Encoder] {field} is out of range: {detail}")]
    OutOfRange {
        field: &'static str,
        detail: &'static str,
    },

    /// Model name was empty.
    #[error("[CLIP Encoder] model name must not be empty")]
    EmptyModel,
}

/* ------------------------------------------------------------------------- */
/* Provider errors                                                           */
/* ------------------------------------------------------------------------- */

/// Non-success HTTP response captured for diagnostics.
#[derive(Debug)]
pub struct HttpError {
    pub status: StatusCode,
    pub url: String,
    /// Short, trimmed snippet of the response body.
    pub snippet: String,
}

impl fmt::Display for HttpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "HTTP {} from {}: {}", self.status, self.url, self.snippet)
    }
}

/// Errors raised by an inference backend after the request was sent.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("[CLIP Encoder] {0}")]
    HttpStatus(HttpError),

    #[error("[CLIP Encoder] decode error: {0}")]
    Decode(String),

    #[error("[CLIP Encoder] backend returned no embeddings")]
    EmptyData,

    #[error("[CLIP Encoder] embedding dim {actual} != expected {expected}")]
    Dimension { expected: usize, actual: usize },

    #[error("[CLIP Encoder] embedding contains non-finite values")]
    NonFinite,

    /// In-process inference failed (local provider).
    #[error("[CLIP Encoder] inference failed: {0}")]
    Inference(String),
}

/* ------------------------------------------------------------------------- */
/* Image payload errors                                                      */
/* ------------------------------------------------------------------------- */

#[non_exhaustive]
#[derive(Debug, Error)]
pub enum ImageDataError {
    #[error("[CLIP Encoder] image payload is empty")]
    Empty,

    #[error("[CLIP Encoder] data URL has no ',' separator")]
    MalformedDataUrl,

    #[error("[CLIP Encoder] invalid base64 payload: {0}")]
    InvalidBase64(String),

    #[error("[CLIP Encoder] bytes are not a decodable image: {0}")]
    Undecodable(String),
}

/* ------------------------------------------------------------------------- */
/* Helpers                                                                   */
/* ------------------------------------------------------------------------- */

const SNIPPET_MAX_CHARS: usize = 240;

/// Collapses whitespace and trims a response body for logs and error messages.
pub fn make_snippet(text: &str) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() <= SNIPPET_MAX_CHARS {
        return collapsed;
    }
    let mut out: String = collapsed.chars().take(SNIPPET_MAX_CHARS).collect();
    out.push('…');
    out
}

/// Reads a non-empty environment variable.
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Validates that an HTTP endpoint starts with `http://` or `https://`.
///
/// # Errors
/// Returns [`ConfigError::InvalidFormat`] otherwise.
pub fn validate_http_endpoint(var: &'static str, value: &str) -> Result<()> {
    let v = value.trim();
    if v.starts_with("http://") || v.starts_with("https://") {
        Ok(())
    } else {
        Err(ConfigError::InvalidFormat {
            var,
            reason: "must start with http:// or https://",
        }
        .into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snippet_collapses_and_truncates() {
        assert_eq!(make_snippet("  a \n\n b\tc "), "a b c");

        let long = "x".repeat(SNIPPET_MAX_CHARS + 10);
        let s = make_snippet(&long);
        assert_eq!(s.chars().count(), SNIPPET_MAX_CHARS + 1);
        assert!(s.ends_with('…'));
    }

    #[test]
    fn endpoint_scheme_is_checked() {
        assert!(validate_http_endpoint("CLIP_ENDPOINT", "http://localhost:7997").is_ok());
        assert!(validate_http_endpoint("CLIP_ENDPOINT", " https://clip.internal ").is_ok());
        assert!(matches!(
            validate_http_endpoint("CLIP_ENDPOINT", "localhost:7997"),
            Err(ClipError::Config(ConfigError::InvalidFormat { .. }))
        ));
    }
}
