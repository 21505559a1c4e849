//! Health probe for CLIP backends.
//!
//! - Remote: `GET {endpoint}/models` (best-effort model existence check)
//! - Local: no network; reports healthy once the model is constructed
//!
//! [`HealthService::check`] is resilient and never fails (errors map to `ok=false`).
//! [`HealthService::try_probe_remote`] returns a strict `Result`.

use std::time::{Duration, Instant};

use reqwest::header;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::{clip_model_config::ClipModelConfig, clip_provider::ClipProvider};
use crate::error_handler::{
    ClipError, HttpError, ProviderError, Result, make_snippet, validate_http_endpoint,
};

/// JSON-serializable health snapshot for one encoder config.
#[derive(Debug, Clone, Serialize)]
pub struct HealthStatus {
    pub provider: ClipProvider,
    pub endpoint: String,
    pub model: String,
    pub ok: bool,
    pub latency_ms: u128,
    pub message: String,
}

impl HealthStatus {
    fn new(cfg: &ClipModelConfig, ok: bool, latency_ms: u128, message: impl Into<String>) -> Self {
        Self {
            provider: cfg.provider,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            ok,
            latency_ms,
            message: message.into(),
        }
    }
}

/// Reuses a single HTTP client across probes; each probe is bounded by `timeout`.
#[derive(Debug, Clone)]
pub struct HealthService {
    client: reqwest::Client,
    timeout: Duration,
}

impl HealthService {
    pub fn new(client: reqwest::Client, timeout: Duration) -> Self {
        debug!(timeout_ms = timeout.as_millis(), "HealthService initialized");
        Self { client, timeout }
    }

    /// Never returns an error; failures become `ok = false`.
    pub async fn check(&self, cfg: &ClipModelConfig) -> HealthStatus {
        match cfg.provider {
            ClipProvider::Local => HealthStatus::new(cfg, true, 0, "in-process model"),
            ClipProvider::Remote => {
                let started = Instant::now();
                match self.try_probe_remote(cfg).await {
                    Ok(message) => {
                        let latency = started.elapsed().as_millis();
                        debug!(endpoint = %cfg.endpoint, latency_ms = latency, "CLIP backend healthy");
                        HealthStatus::new(cfg, true, latency, message)
                    }
                    Err(e) => {
                        let latency = started.elapsed().as_millis();
                        warn!(endpoint = %cfg.endpoint, error = %e, "CLIP backend unhealthy");
                        HealthStatus::new(cfg, false, latency, e.to_string())
                    }
                }
            }
        }
    }

    /// Lists models on the remote server and reports whether ours is among them.
    ///
    /// A missing model is not an error: some servers do not list aliases.
    ///
    /// # Errors
    /// - [`crate::error_handler::ConfigError::InvalidFormat`] for a bad endpoint
    /// - [`ProviderError::HttpStatus`] on non-2xx
    /// - [`ClipError::HttpTransport`] on network failure
    pub async fn try_probe_remote(&self, cfg: &ClipModelConfig) -> Result<String> {
        validate_http_endpoint("CLIP_ENDPOINT", &cfg.endpoint)?;
        let url = format!("{}/models", cfg.endpoint.trim_end_matches('/'));

        let mut req = self.client.get(&url).timeout(self.timeout);
        if let Some(key) = &cfg.api_key {
            req = req.header(header::AUTHORIZATION, format!("Bearer {key}"));
        }
        let resp = req.send().await.map_err(ClipError::HttpTransport)?;

        if !resp.status().is_success() {
            let status = resp.status();
            let text = resp.text().await.unwrap_or_default();
            return Err(ProviderError::HttpStatus(HttpError {
                status,
                url,
                snippet: make_snippet(&text),
            })
            .into());
        }

        let listed: ModelList = resp.json().await.unwrap_or_default();
        if listed.data.iter().any(|m| m.id == cfg.model) {
            Ok(format!("model '{}' is served", cfg.model))
        } else {
            Ok(format!(
                "endpoint reachable; model '{}' not listed ({} models)",
                cfg.model,
                listed.data.len()
            ))
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn probe() -> HealthService {
        HealthService::new(reqwest::Client::new(), Duration::from_secs(2))
    }

    fn remote_cfg(endpoint: String) -> ClipModelConfig {
        ClipModelConfig {
            provider: ClipProvider::Remote,
            model: "openai/clip-vit-base-patch32".into(),
            endpoint,
            api_key: None,
            dim: 512,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn listed_model_is_healthy() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200)
                .json_body(json!({ "data": [{ "id": "openai/clip-vit-base-patch32" }] }));
        });

        let svc = probe();
        let status = svc.check(&remote_cfg(server.base_url())).await;
        assert!(status.ok);
        assert!(status.message.contains("is served"));
    }

    #[tokio::test]
    async fn server_error_maps_to_not_ok() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(500).body("boom");
        });

        let svc = probe();
        let status = svc.check(&remote_cfg(server.base_url())).await;
        assert!(!status.ok);
        assert!(status.message.contains("500"));
    }

    #[tokio::test]
    async fn local_provider_needs_no_network() {
        let mut cfg = remote_cfg("unused".into());
        cfg.provider = ClipProvider::Local;
        let status = probe().check(&cfg).await;
        assert!(status.ok);
    }
}
