//! Remote CLIP service over an OpenAI-compatible embeddings API.
//!
//! Endpoints are derived from `ClipModelConfig::endpoint`:
//! - POST {endpoint}/embeddings: image embedding (`modality = "image"`)
//! - GET  {endpoint}/models: used by the health probe
//!
//! Images are sent as `data:<mime>;base64,...` URLs in `input`, which is what
//! CLIP-capable embedding servers accept for the image modality.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::{
    config::{clip_model_config::ClipModelConfig, clip_provider::ClipProvider},
    encoder::{EncoderDescriptor, ImageEncoder, finalize_embedding},
    error_handler::{
        ClipError, ConfigError, HttpError, ProviderError, Result, make_snippet,
        validate_http_endpoint,
    },
    image_data::to_data_url,
};

/// Thin client for a remote CLIP embeddings server.
#[derive(Debug)]
pub struct RemoteClipService {
    client: reqwest::Client,
    cfg: ClipModelConfig,
    url_embeddings: String,
}

impl RemoteClipService {
    /// Creates a new [`RemoteClipService`] from the given config.
    ///
    /// # Errors
    /// - [`ConfigError::UnsupportedProvider`] if `cfg.provider` is not `Remote`
    /// - [`ConfigError::InvalidFormat`] if the endpoint or API key is malformed
    /// - [`ClipError::HttpTransport`] if the HTTP client cannot be built
    pub fn new(cfg: ClipModelConfig) -> Result<Self> {
        if cfg.provider != ClipProvider::Remote {
            return Err(ConfigError::UnsupportedProvider(cfg.provider.to_string()).into());
        }
        validate_http_endpoint("CLIP_ENDPOINT", &cfg.endpoint)?;

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        if let Some(key) = &cfg.api_key {
            let value = header::HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                ConfigError::InvalidFormat {
                    var: "CLIP_API_KEY",
                    reason: "not a valid header value",
                }
            })?;
            headers.insert(header::AUTHORIZATION, value);
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .default_headers(headers)
            .build()?;

        let url_embeddings = format!("{}/embeddings", cfg.endpoint.trim_end_matches('/'));

        debug!(
            model = %cfg.model,
            endpoint = %cfg.endpoint,
            timeout_secs = cfg.timeout_secs,
            "RemoteClipService initialized"
        );

        Ok(Self {
            client,
            cfg,
            url_embeddings,
        })
    }
}

#[async_trait]
impl ImageEncoder for RemoteClipService {
    fn descriptor(&self) -> EncoderDescriptor {
        EncoderDescriptor {
            provider: ClipProvider::Remote,
            model: self.cfg.model.clone(),
            device: "remote".into(),
            dim: self.cfg.dim,
        }
    }

    /// # Errors
    /// - [`ProviderError::HttpStatus`] for non-2xx responses
    /// - [`ClipError::Timeout`] when the request exceeds the timeout
    /// - [`ProviderError::Decode`] / [`ProviderError::EmptyData`] for unusable bodies
    /// - [`ProviderError::Dimension`] when the vector size mismatches the config
    async fn encode(&self, image: &[u8]) -> Result<Vec<f32>> {
        let started = Instant::now();
        let body = ImageEmbeddingsRequest {
            model: &self.cfg.model,
            input: vec![to_data_url(image)],
            modality: "image",
        };

        debug!(
            model = %self.cfg.model,
            bytes = image.len(),
            "POST {}", self.url_embeddings
        );

        let resp = self
            .client
            .post(&self.url_embeddings)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let url = self.url_embeddings.clone();
            let text = resp.text().await.unwrap_or_default();
            let snippet = make_snippet(&text);

            error!(
                %status,
                %url,
                %snippet,
                model = %self.cfg.model,
                latency_ms = started.elapsed().as_millis(),
                "embeddings endpoint returned non-success status"
            );

            return Err(ProviderError::HttpStatus(HttpError {
                status,
                url,
                snippet,
            })
            .into());
        }

        let out: EmbeddingsResponse = resp.json().await.map_err(|e| {
            ProviderError::Decode(format!("serde error: {e}; expected `data[0].embedding`"))
        })?;

        let first = out
            .data
            .into_iter()
            .min_by_key(|item| item.index.unwrap_or(0))
            .ok_or(ProviderError::EmptyData)?;

        let vector = finalize_embedding(first.embedding, self.cfg.dim)?;

        debug!(
            model = %self.cfg.model,
            dim = vector.len(),
            latency_ms = started.elapsed().as_millis(),
            "image embedding completed"
        );

        Ok(vector)
    }
}

impl RemoteClipService {
    fn transport_error(&self, e: reqwest::Error) -> ClipError {
        if e.is_timeout() {
            ClipError::Timeout(Duration::from_secs(self.cfg.timeout_secs))
        } else {
            ClipError::HttpTransport(e)
        }
    }
}

/* ===========================================================================
HTTP payloads
======================================================================== */

#[derive(Debug, Serialize)]
struct ImageEmbeddingsRequest<'a> {
    model: &'a str,
    input: Vec<String>,
    modality: &'static str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingItem {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn cfg_for(server: &MockServer, dim: usize) -> ClipModelConfig {
        ClipModelConfig {
            provider: ClipProvider::Remote,
            model: "openai/clip-vit-base-patch32".into(),
            endpoint: server.base_url(),
            api_key: Some("secret".into()),
            dim,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn sends_image_modality_and_normalizes() {
        let server = MockServer::start();
        let mock = server.mock(|when, then| {
            when.method(POST)
                .path("/embeddings")
                .header("Authorization", "Bearer secret")
                .json_body_partial(
                    r#"{"modality":"image","model":"openai/clip-vit-base-patch32"}"#,
                );
            then.status(200)
                .json_body(json!({ "data": [{ "index": 0, "embedding": [3.0, 4.0] }] }));
        });

        let svc = RemoteClipService::new(cfg_for(&server, 2)).unwrap();
        let v = svc.encode(b"\x89PNG\r\n\x1a\nfake").await.unwrap();

        mock.assert();
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
    }

    #[tokio::test]
    async fn non_success_status_carries_snippet() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(503).body("model warming up");
        });

        let svc = RemoteClipService::new(cfg_for(&server, 2)).unwrap();
        let err = svc.encode(b"x").await.unwrap_err();
        match err {
            ClipError::Provider(ProviderError::HttpStatus(h)) => {
                assert_eq!(h.status.as_u16(), 503);
                assert_eq!(h.snippet, "model warming up");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn wrong_dimension_is_rejected() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(200)
                .json_body(json!({ "data": [{ "embedding": [0.1, 0.2, 0.3] }] }));
        });

        let svc = RemoteClipService::new(cfg_for(&server, 512)).unwrap();
        assert!(matches!(
            svc.encode(b"x").await,
            Err(ClipError::Provider(ProviderError::Dimension {
                expected: 512,
                actual: 3
            }))
        ));
    }

    #[tokio::test]
    async fn empty_data_is_an_error() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/embeddings");
            then.status(200).json_body(json!({ "data": [] }));
        });

        let svc = RemoteClipService::new(cfg_for(&server, 2)).unwrap();
        assert!(matches!(
            svc.encode(b"x").await,
            Err(ClipError::Provider(ProviderError::EmptyData))
        ));
    }
}
