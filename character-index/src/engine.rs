//! Match engine: owns the encoder slot and the store, answers analyze
//! requests (model path first, sample fallback otherwise) and runs refreshes.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clip_encoder::image_data::{decode_image_payload, probe_dimensions};
use clip_encoder::{ClipError, EncoderDescriptor, ImageEncoder};
use serde::Serialize;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::catalog::{AniListClient, normalize_all};
use crate::errors::index_error::IndexError;
use crate::fallback::{SAMPLE_CHARACTERS, fallback_outcome, ultimate_fallback};
use crate::ingest::build_catalog_vectors;
use crate::selection::{candidate_limit, select_matches};
use crate::store::CharacterStore;
use crate::structs::character::MatchOutcome;
use crate::structs::index_config::IndexConfig;
use crate::structs::match_query::MatchQuery;

/// Result of [`MatchEngine::refresh`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshStatus {
    /// Collection now holds `count` characters (0 means nothing was replaced).
    Refreshed { count: usize },
    /// No encoder installed yet.
    ModelNotLoaded,
    /// Another refresh is running.
    Busy,
}

/// Snapshot for the health endpoint.
#[derive(Debug, Clone, Serialize)]
pub struct EngineHealth {
    pub encoder: Option<EncoderDescriptor>,
    pub characters_count: u64,
    pub vector_store_ok: bool,
}

impl EngineHealth {
    pub fn model_loaded(&self) -> bool {
        self.encoder.is_some()
    }
}

pub struct MatchEngine {
    cfg: IndexConfig,
    store: Arc<dyn CharacterStore>,
    http: reqwest::Client,
    encoder: RwLock<Option<Arc<dyn ImageEncoder>>>,
    refresh_lock: Mutex<()>,
}

impl MatchEngine {
    /// The encoder slot starts empty; every analyze answers from samples until
    /// [`MatchEngine::install_encoder`] (or warmup) fills it.
    pub fn new(cfg: IndexConfig, store: Arc<dyn CharacterStore>, http: reqwest::Client) -> Self {
        Self {
            cfg,
            store,
            http,
            encoder: RwLock::new(None),
            refresh_lock: Mutex::new(()),
        }
    }

    pub async fn install_encoder(&self, encoder: Arc<dyn ImageEncoder>) {
        let d = encoder.descriptor();
        *self.encoder.write().await = Some(encoder);
        info!(
            target: "character_index::engine",
            provider = %d.provider,
            model = %d.model,
            device = %d.device,
            "encoder installed"
        );
    }

    pub async fn current_encoder(&self) -> Option<Arc<dyn ImageEncoder>> {
        self.encoder.read().await.clone()
    }

    /// Load the encoder in the background, then make sure the collection exists
    /// and is populated. A loader failure leaves the engine in fallback mode; an
    /// unreachable store is retried every `qdrant.retry_delay_ms`.
    pub fn spawn_warmup<F>(self: &Arc<Self>, loader: F) -> JoinHandle<()>
    where
        F: Future<Output = clip_encoder::Result<Arc<dyn ImageEncoder>>> + Send + 'static,
    {
        let engine = Arc::clone(self);
        tokio::spawn(async move {
            let started = Instant::now();
            let encoder = match loader.await {
                Ok(e) => e,
                Err(e) => {
                    warn!(error = %e, "encoder unavailable; serving sample data");
                    return;
                }
            };
            engine.install_encoder(encoder).await;
            info!(elapsed_ms = started.elapsed().as_millis(), "encoder warmup finished");

            let retry = Duration::from_millis(engine.cfg.qdrant.retry_delay_ms);
            let mut attempt = 1u32;
            while let Err(e) = engine.store.prepare().await {
                warn!(
                    store = %engine.store.describe(),
                    attempt,
                    error = %e,
                    "vector store not ready; retrying"
                );
                tokio::time::sleep(retry).await;
                attempt += 1;
            }

            match engine.store.count().await {
                Ok(0) => {
                    info!("character index is empty; populating from AniList");
                    match engine.refresh().await {
                        Ok(status) => info!(?status, "initial population finished"),
                        Err(e) => error!(error = %e, "initial population failed"),
                    }
                }
                Ok(n) => info!(characters = n, "character index ready"),
                Err(e) => warn!(error = %e, "could not count characters"),
            }
        })
    }

    /// Answer an upload. Never fails: any problem on the model path drops to
    /// sample data.
    pub async fn analyze(&self, image_data: &str, query: &MatchQuery) -> MatchOutcome {
        if let Some(encoder) = self.current_encoder().await {
            match self.store.count().await {
                Ok(n) if n > 0 => {
                    match self.analyze_with_model(encoder.as_ref(), image_data, query).await {
                        Ok(outcome) => return outcome,
                        Err(e) => warn!(error = %e, "model path failed; using sample data"),
                    }
                }
                Ok(_) => debug!("character index empty; using sample data"),
                Err(e) => warn!(error = %e, "vector store unavailable; using sample data"),
            }
        }
        self.analyze_with_samples(image_data, query).await
    }

    async fn analyze_with_model(
        &self,
        encoder: &dyn ImageEncoder,
        image_data: &str,
        query: &MatchQuery,
    ) -> Result<MatchOutcome, IndexError> {
        let started = Instant::now();
        let bytes = decode_image_payload(image_data).map_err(ClipError::from)?;
        let vector = encoder.encode(&bytes).await?;

        let limit = candidate_limit(query, &self.cfg.search);
        let hits = self.store.search(vector, limit).await?;
        let candidates = hits.len();
        let outcome = select_matches(hits, query, &self.cfg.search);

        info!(
            target: "character_index::engine",
            search_type = ?query.search_type,
            candidates,
            selected = outcome.suggestions.len(),
            best = outcome.character.as_ref().map(|c| c.name.as_str()).unwrap_or("-"),
            elapsed_ms = started.elapsed().as_millis(),
            "model match"
        );
        Ok(outcome)
    }

    async fn analyze_with_samples(&self, image_data: &str, query: &MatchQuery) -> MatchOutcome {
        if self.cfg.fallback.delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.cfg.fallback.delay_ms)).await;
        }

        let readable = decode_image_payload(image_data).and_then(|bytes| probe_dimensions(&bytes));
        match readable {
            Ok((width, height)) => {
                debug!(width, height, search_type = ?query.search_type, "fallback match");
                let mut rng = rand::thread_rng();
                fallback_outcome(query, &mut rng)
            }
            Err(e) => {
                warn!(error = %e, "upload is not a readable image; fixed fallback answer");
                ultimate_fallback()
            }
        }
    }

    /// Rebuild the collection from AniList.
    ///
    /// # Errors
    /// Catalog fetch or store failures. Per-character download/encode failures
    /// are skipped and do not fail the refresh.
    pub async fn refresh(&self) -> Result<RefreshStatus, IndexError> {
        let Some(encoder) = self.current_encoder().await else {
            return Ok(RefreshStatus::ModelNotLoaded);
        };
        let Ok(_guard) = self.refresh_lock.try_lock() else {
            return Ok(RefreshStatus::Busy);
        };

        let started = Instant::now();
        let catalog = AniListClient::new(self.http.clone(), self.cfg.catalog.clone());
        let raw = catalog.fetch_popular().await?;
        let records = normalize_all(&raw, self.cfg.catalog.description_max_chars);
        let entries =
            build_catalog_vectors(records, encoder.as_ref(), &self.http, &self.cfg.catalog).await;

        if entries.is_empty() {
            warn!("no character could be encoded; keeping the existing index");
            return Ok(RefreshStatus::Refreshed { count: 0 });
        }

        let count = self.store.replace_all(entries).await?;
        info!(
            target: "character_index::engine",
            count,
            elapsed_ms = started.elapsed().as_millis(),
            "character index refreshed"
        );
        Ok(RefreshStatus::Refreshed { count })
    }

    pub async fn health(&self) -> EngineHealth {
        let encoder = self.current_encoder().await.map(|e| e.descriptor());
        let stored = self.store.count().await;
        let vector_store_ok = stored.is_ok();

        let characters_count = match (&encoder, stored) {
            (Some(_), Ok(n)) => n,
            (_, Err(e)) => {
                debug!(error = %e, "store count failed during health");
                SAMPLE_CHARACTERS.len() as u64
            }
            (None, Ok(_)) => SAMPLE_CHARACTERS.len() as u64,
        };

        EngineHealth {
            encoder,
            characters_count,
            vector_store_ok,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use clip_encoder::ClipProvider;
    use httpmock::prelude::*;
    use serde_json::json;

    use super::*;
    use crate::structs::character::{CharacterRecord, MatchMode};
    use crate::structs::match_query::SearchType;

    const PNG_1X1: &str = "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

    struct FixedEncoder;

    #[async_trait]
    impl ImageEncoder for FixedEncoder {
        fn descriptor(&self) -> EncoderDescriptor {
            EncoderDescriptor {
                provider: ClipProvider::Remote,
                model: "fixed".into(),
                device: "test".into(),
                dim: 2,
            }
        }

        async fn encode(&self, _image: &[u8]) -> clip_encoder::Result<Vec<f32>> {
            Ok(vec![1.0, 0.0])
        }
    }

    /// Returns canned hits; records what was written by `replace_all`.
    #[derive(Default)]
    struct MemoryStore {
        hits: Vec<(CharacterRecord, f32)>,
        written: StdMutex<Vec<i64>>,
        replace_calls: AtomicUsize,
        prepare_calls: AtomicUsize,
        /// `prepare` fails this many times before succeeding.
        prepare_failures: usize,
        offline: bool,
    }

    #[async_trait]
    impl CharacterStore for MemoryStore {
        async fn prepare(&self) -> Result<(), IndexError> {
            let call = self.prepare_calls.fetch_add(1, Ordering::SeqCst);
            if call < self.prepare_failures {
                return Err(IndexError::Qdrant("connection refused".into()));
            }
            Ok(())
        }

        async fn count(&self) -> Result<u64, IndexError> {
            if self.offline {
                return Err(IndexError::Qdrant("connection refused".into()));
            }
            Ok(self.hits.len() as u64)
        }

        async fn search(
            &self,
            _vector: Vec<f32>,
            limit: usize,
        ) -> Result<Vec<(CharacterRecord, f32)>, IndexError> {
            Ok(self.hits.iter().take(limit).cloned().collect())
        }

        async fn replace_all(
            &self,
            entries: Vec<(CharacterRecord, Vec<f32>)>,
        ) -> Result<usize, IndexError> {
            self.replace_calls.fetch_add(1, Ordering::SeqCst);
            let mut w = self.written.lock().unwrap();
            w.clear();
            w.extend(entries.iter().map(|(r, _)| r.anilist_id));
            Ok(entries.len())
        }

        fn describe(&self) -> String {
            "memory".into()
        }
    }

    fn quick_cfg() -> IndexConfig {
        let mut cfg = IndexConfig::default();
        cfg.fallback.delay_ms = 0;
        cfg.catalog.request_delay_ms = 0;
        cfg
    }

    fn bare_engine() -> MatchEngine {
        MatchEngine::new(
            quick_cfg(),
            Arc::new(MemoryStore::default()),
            reqwest::Client::new(),
        )
    }

    /// AniList page with one character whose image lives at `image_path`.
    fn mock_catalog(server: &MockServer, image_path: &str) {
        let img = server.url(image_path);
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).json_body(json!({
                "data": { "Page": { "characters": [
                    { "id": 11, "name": { "full": "Edward Elric" }, "image": { "large": img } }
                ]}}
            }));
        });
    }

    fn stored(id: i64, distance: f32) -> (CharacterRecord, f32) {
        (SAMPLE_CHARACTERS[(id - 1) as usize].to_record(), distance)
    }

    #[tokio::test]
    async fn without_encoder_answers_from_samples() {
        let engine = bare_engine();
        let out = engine.analyze(PNG_1X1, &MatchQuery::default()).await;
        assert_eq!(out.mode, MatchMode::Fallback);
        assert_eq!(out.suggestions.len(), 4);
    }

    #[tokio::test]
    async fn unreadable_upload_gets_fixed_answer() {
        let engine = bare_engine();
        let out = engine.analyze("bm90IGFuIGltYWdl", &MatchQuery::default()).await;
        assert_eq!(out.suggestions.len(), 1);
        assert_eq!(out.character.unwrap().name, "Naruto Uzumaki");
    }

    #[tokio::test]
    async fn model_path_selects_from_store() {
        let store = MemoryStore {
            hits: vec![stored(3, 0.1), stored(2, 0.3), stored(5, 0.9)],
            ..Default::default()
        };
        let engine = MatchEngine::new(quick_cfg(), Arc::new(store), reqwest::Client::new());
        engine.install_encoder(Arc::new(FixedEncoder)).await;

        let out = engine.analyze(PNG_1X1, &MatchQuery::default()).await;
        assert_eq!(out.mode, MatchMode::Model);
        assert_eq!(out.character.unwrap().name, "Luffy");
        assert_eq!(out.suggestions.len(), 2);

        let q = MatchQuery {
            exclude_ids: vec![3],
            search_type: SearchType::Exclude,
            ..Default::default()
        };
        let out = engine.analyze(PNG_1X1, &q).await;
        assert_eq!(out.character.unwrap().name, "Goku");
    }

    #[tokio::test]
    async fn bad_payload_on_model_path_falls_back() {
        let store = MemoryStore {
            hits: vec![stored(1, 0.1)],
            ..Default::default()
        };
        let engine = MatchEngine::new(quick_cfg(), Arc::new(store), reqwest::Client::new());
        engine.install_encoder(Arc::new(FixedEncoder)).await;

        let out = engine.analyze("%%%", &MatchQuery::default()).await;
        assert_eq!(out.mode, MatchMode::Fallback);
    }

    #[tokio::test]
    async fn refresh_requires_encoder() {
        let engine = bare_engine();
        assert_eq!(engine.refresh().await.unwrap(), RefreshStatus::ModelNotLoaded);
    }

    #[tokio::test]
    async fn refresh_ingests_catalog_into_store() {
        let server = MockServer::start();
        let img = server.url("/img/11.png");
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(200).json_body(json!({
                "data": { "Page": { "characters": [
                    { "id": 11, "name": { "full": "Edward Elric" }, "image": { "large": img } },
                    { "id": 12, "name": { "full": "No Picture" } }
                ]}}
            }));
        });
        server.mock(|when, then| {
            when.method(GET).path("/img/11.png");
            then.status(200).body([1u8, 2, 3]);
        });

        let mut cfg = quick_cfg();
        cfg.catalog.anilist_url = server.url("/graphql");
        let store = Arc::new(MemoryStore::default());
        let engine = MatchEngine::new(cfg, store.clone(), reqwest::Client::new());
        engine.install_encoder(Arc::new(FixedEncoder)).await;

        assert_eq!(
            engine.refresh().await.unwrap(),
            RefreshStatus::Refreshed { count: 1 }
        );
        assert_eq!(*store.written.lock().unwrap(), vec![11]);
    }

    #[tokio::test]
    async fn health_reports_store_outage_with_sample_count() {
        let store = MemoryStore {
            offline: true,
            ..Default::default()
        };
        let engine = MatchEngine::new(quick_cfg(), Arc::new(store), reqwest::Client::new());
        engine.install_encoder(Arc::new(FixedEncoder)).await;

        let h = engine.health().await;
        assert!(h.model_loaded());
        assert!(!h.vector_store_ok);
        assert_eq!(h.characters_count, 8);
    }

    #[tokio::test]
    async fn empty_build_keeps_existing_index() {
        let server = MockServer::start();
        mock_catalog(&server, "/img/11.png");
        server.mock(|when, then| {
            when.method(GET).path("/img/11.png");
            then.status(404);
        });

        let mut cfg = quick_cfg();
        cfg.catalog.anilist_url = server.url("/graphql");
        let store = Arc::new(MemoryStore::default());
        let engine = MatchEngine::new(cfg, store.clone(), reqwest::Client::new());
        engine.install_encoder(Arc::new(FixedEncoder)).await;

        assert_eq!(
            engine.refresh().await.unwrap(),
            RefreshStatus::Refreshed { count: 0 }
        );
        assert_eq!(store.replace_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn overlapping_refresh_is_busy() {
        let server = MockServer::start();
        mock_catalog(&server, "/img/slow.png");
        server.mock(|when, then| {
            when.method(GET).path("/img/slow.png");
            then.status(404).delay(Duration::from_millis(500));
        });

        let mut cfg = quick_cfg();
        cfg.catalog.anilist_url = server.url("/graphql");
        let store = Arc::new(MemoryStore::default());
        let engine = MatchEngine::new(cfg, store.clone(), reqwest::Client::new());
        engine.install_encoder(Arc::new(FixedEncoder)).await;

        let (first, second) = tokio::join!(engine.refresh(), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            engine.refresh().await
        });

        assert_eq!(first.unwrap(), RefreshStatus::Refreshed { count: 0 });
        assert_eq!(second.unwrap(), RefreshStatus::Busy);
        assert_eq!(store.replace_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn catalog_failure_fails_refresh() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/graphql");
            then.status(503);
        });

        let mut cfg = quick_cfg();
        cfg.catalog.anilist_url = server.url("/graphql");
        let store = Arc::new(MemoryStore::default());
        let engine = MatchEngine::new(cfg, store.clone(), reqwest::Client::new());
        engine.install_encoder(Arc::new(FixedEncoder)).await;

        let err = engine.refresh().await.unwrap_err();
        assert!(matches!(err, IndexError::Catalog(_)));
        assert_eq!(store.replace_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn warmup_installs_encoder_and_populates_empty_index() {
        let server = MockServer::start();
        mock_catalog(&server, "/img/11.png");
        server.mock(|when, then| {
            when.method(GET).path("/img/11.png");
            then.status(200).body([1u8, 2, 3]);
        });

        let mut cfg = quick_cfg();
        cfg.catalog.anilist_url = server.url("/graphql");
        let store = Arc::new(MemoryStore::default());
        let engine = Arc::new(MatchEngine::new(cfg, store.clone(), reqwest::Client::new()));

        engine
            .spawn_warmup(async { Ok(Arc::new(FixedEncoder) as Arc<dyn ImageEncoder>) })
            .await
            .unwrap();

        assert!(engine.current_encoder().await.is_some());
        assert_eq!(store.replace_calls.load(Ordering::SeqCst), 1);
        assert_eq!(*store.written.lock().unwrap(), vec![11]);
    }

    #[tokio::test]
    async fn warmup_retries_until_store_is_ready() {
        let mut cfg = quick_cfg();
        cfg.qdrant.retry_delay_ms = 10;
        let store = Arc::new(MemoryStore {
            hits: vec![stored(1, 0.1)],
            prepare_failures: 2,
            ..Default::default()
        });
        let engine = Arc::new(MatchEngine::new(cfg, store.clone(), reqwest::Client::new()));

        engine
            .spawn_warmup(async { Ok(Arc::new(FixedEncoder) as Arc<dyn ImageEncoder>) })
            .await
            .unwrap();

        assert_eq!(store.prepare_calls.load(Ordering::SeqCst), 3);
        assert_eq!(store.replace_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn failed_loader_stays_in_fallback() {
        let engine = Arc::new(bare_engine());
        engine
            .spawn_warmup(async {
                Err(ClipError::ImageData(
                    clip_encoder::error_handler::ImageDataError::Empty,
                ))
            })
            .await
            .unwrap();

        assert!(engine.current_encoder().await.is_none());
    }
}
