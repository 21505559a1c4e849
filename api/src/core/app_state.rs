use std::sync::Arc;
use std::time::Duration;

use character_index::{IndexConfig, MatchEngine, QdrantCharacterStore};
use clip_encoder::health_service::HealthService;
use clip_encoder::{ClipModelConfig, ClipProvider, ImageEncoder, config_from_env, load_encoder};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::error_handler::AppResult;

/// Timeout for one `/models` probe, on health requests and during warmup.
const PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// How warmup waits for a remote CLIP backend: a few quick attempts, then a
/// slow retry that never gives up.
#[derive(Debug, Clone, Copy)]
pub struct ProbeSchedule {
    pub quick_attempts: u32,
    pub quick_delay: Duration,
    pub slow_delay: Duration,
}

impl Default for ProbeSchedule {
    fn default() -> Self {
        Self {
            quick_attempts: 5,
            quick_delay: Duration::from_secs(3),
            slow_delay: Duration::from_secs(30),
        }
    }
}

/// Shared state for all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<MatchEngine>,
    /// Encoder settings; health reports them even before the model is up.
    pub clip: ClipModelConfig,
    pub probe: HealthService,
}

impl AppState {
    pub fn new(engine: Arc<MatchEngine>, clip: ClipModelConfig, http: reqwest::Client) -> Self {
        Self {
            engine,
            clip,
            probe: HealthService::new(http, PROBE_TIMEOUT),
        }
    }

    /// Load shared state from environment variables. No network I/O happens
    /// here; the encoder is attached later by [`AppState::spawn_warmup`].
    pub fn from_env() -> AppResult<Self> {
        let index_cfg = IndexConfig::from_env()?;
        let clip = config_from_env()?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("anime-guesser/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(Duration::from_secs(10))
            .build()?;

        let store = QdrantCharacterStore::connect(index_cfg.qdrant.clone())?;
        info!(
            qdrant = %index_cfg.qdrant.url,
            collection = %index_cfg.qdrant.collection,
            provider = %clip.provider,
            model = %clip.model,
            "application state ready"
        );

        let engine = Arc::new(MatchEngine::new(index_cfg, Arc::new(store), http.clone()));
        Ok(Self::new(engine, clip, http))
    }

    /// Start loading the encoder in the background. A remote backend only
    /// counts as loaded once its health probe succeeds.
    pub fn spawn_warmup(&self, schedule: ProbeSchedule) -> JoinHandle<()> {
        let cfg = self.clip.clone();
        let probe = self.probe.clone();
        self.engine.spawn_warmup(async move {
            let encoder: Arc<dyn ImageEncoder> = load_encoder(&cfg).await?;
            if cfg.provider == ClipProvider::Remote {
                wait_for_backend(&probe, &cfg, schedule).await;
            }
            Ok::<_, clip_encoder::ClipError>(encoder)
        })
    }
}

/// Probe the remote backend until it answers. Returns the number of attempts.
pub async fn wait_for_backend(
    probe: &HealthService,
    cfg: &ClipModelConfig,
    schedule: ProbeSchedule,
) -> u32 {
    let mut attempt = 1;
    loop {
        match probe.try_probe_remote(cfg).await {
            Ok(message) => {
                info!(endpoint = %cfg.endpoint, attempt, %message, "CLIP backend reachable");
                return attempt;
            }
            Err(e) if attempt < schedule.quick_attempts => {
                warn!(attempt, error = %e, "CLIP backend not reachable yet; retrying");
                tokio::time::sleep(schedule.quick_delay).await;
            }
            Err(e) => {
                if attempt == schedule.quick_attempts {
                    warn!(
                        attempt,
                        error = %e,
                        retry_secs = schedule.slow_delay.as_secs(),
                        "CLIP backend still down; serving sample data and retrying slowly"
                    );
                } else {
                    debug!(attempt, error = %e, "CLIP backend still down");
                }
                tokio::time::sleep(schedule.slow_delay).await;
            }
        }
        attempt += 1;
    }
}

#[cfg(test)]
mod tests {
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;

    fn cfg_for(server: &MockServer) -> ClipModelConfig {
        ClipModelConfig {
            provider: ClipProvider::Remote,
            model: "clip".into(),
            endpoint: server.base_url(),
            api_key: None,
            dim: 2,
            timeout_secs: 5,
        }
    }

    #[tokio::test]
    async fn keeps_probing_past_the_quick_attempts() {
        let server = MockServer::start();
        let mut down = server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(503);
        });

        let schedule = ProbeSchedule {
            quick_attempts: 2,
            quick_delay: Duration::from_millis(5),
            slow_delay: Duration::from_millis(20),
        };
        let probe = HealthService::new(reqwest::Client::new(), Duration::from_secs(1));
        let cfg = cfg_for(&server);
        let waiter = tokio::spawn(async move { wait_for_backend(&probe, &cfg, schedule).await });

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert!(down.hits() > 2);
        down.delete();
        server.mock(|when, then| {
            when.method(GET).path("/models");
            then.status(200).json_body(json!({ "data": [{ "id": "clip" }] }));
        });

        let attempts = tokio::time::timeout(Duration::from_secs(2), waiter)
            .await
            .unwrap()
            .unwrap();
        assert!(attempts > 2);
    }
}
