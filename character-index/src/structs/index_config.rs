//! Configuration layer: reads runtime settings from environment variables
//! and exposes strongly typed configs for Qdrant, match selection, the
//! AniList catalog, and fallback mode.

use serde::{Deserialize, Serialize};

use crate::errors::index_error::IndexError;

/// Distance metric used for the character vector space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum DistanceMetric {
    Cosine,
    Dot,
    Euclid,
}

impl DistanceMetric {
    /// Parse from env string (case-insensitive). Defaults to Cosine.
    pub fn from_env(s: Option<String>) -> Self {
        match s
            .unwrap_or_else(|| "Cosine".to_string())
            .to_lowercase()
            .as_str()
        {
            "dot" | "dotproduct" => DistanceMetric::Dot,
            "euclid" | "l2" => DistanceMetric::Euclid,
            _ => DistanceMetric::Cosine,
        }
    }

    /// Converts a Qdrant score into a distance.
    ///
    /// Cosine and dot report similarity (`1 - s` is the distance for
    /// normalized vectors); Euclid already reports a distance.
    pub fn score_to_distance(&self, score: f32) -> f32 {
        match self {
            DistanceMetric::Cosine | DistanceMetric::Dot => 1.0 - score,
            DistanceMetric::Euclid => score,
        }
    }
}

/// Qdrant connectivity and collection parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QdrantConfig {
    /// gRPC URL for Qdrant (e.g., "http://localhost:6334").
    pub url: String,
    pub collection: String,
    pub distance: DistanceMetric,
    /// Batch size for upserts.
    pub batch_size: usize,
    /// Vector size; must equal the encoder output.
    pub vector_dim: usize,
    /// Pause between attempts while Qdrant is unreachable at startup.
    pub retry_delay_ms: u64,
}

impl Default for QdrantConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:6334".to_string(),
            collection: "anime_characters".to_string(),
            distance: DistanceMetric::Cosine,
            batch_size: 64,
            vector_dim: 512,
            retry_delay_ms: 30_000,
        }
    }
}

/// Post-hoc selection knobs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    /// Neighbors requested for a normal search.
    pub normal_limit: usize,
    /// Neighbors requested for exclude/focus searches.
    pub wide_limit: usize,
    /// Minimum confidence (exclusive) for normal searches.
    pub normal_threshold: f32,
    /// Minimum confidence (exclusive) for exclude searches.
    pub exclude_threshold: f32,
    /// Maximum number of suggestions returned.
    pub max_suggestions: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            normal_limit: 10,
            wide_limit: 50,
            normal_threshold: 0.2,
            exclude_threshold: 0.1,
            max_suggestions: 5,
        }
    }
}

/// AniList catalog ingestion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    pub anilist_url: String,
    /// Characters fetched per refresh (one page).
    pub page_size: usize,
    /// Pause after each encoded image, to stay under rate limits.
    pub request_delay_ms: u64,
    pub image_timeout_secs: u64,
    pub description_max_chars: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            anilist_url: "https://graphql.anilist.co".to_string(),
            page_size: 50,
            request_delay_ms: 200,
            image_timeout_secs: 10,
            description_max_chars: 200,
        }
    }
}

/// Fallback-mode behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FallbackConfig {
    /// Artificial latency so fallback answers do not look instantaneous.
    pub delay_ms: u64,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self { delay_ms: 1000 }
    }
}

/// Top-level runtime configuration for the character index.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexConfig {
    pub qdrant: QdrantConfig,
    pub search: SearchConfig,
    pub catalog: CatalogConfig,
    pub fallback: FallbackConfig,
}

impl IndexConfig {
    /// Build configuration from process environment.
    ///
    /// Environment variables used:
    /// - `QDRANT_URL` (default: "http://localhost:6334")
    /// - `QDRANT_COLLECTION` (default: "anime_characters")
    /// - `QDRANT_DISTANCE` ("Cosine" | "Dot" | "Euclid"; default: "Cosine")
    /// - `QDRANT_BATCH_SIZE` (default: 64)
    /// - `CLIP_EMBEDDING_DIM` (default: 512)
    /// - `QDRANT_RETRY_DELAY_MS` (default: 30000)
    /// - `SEARCH_NORMAL_LIMIT` (default: 10), `SEARCH_WIDE_LIMIT` (default: 50)
    /// - `SEARCH_NORMAL_THRESHOLD` (default: 0.2), `SEARCH_EXCLUDE_THRESHOLD` (default: 0.1)
    /// - `SEARCH_MAX_SUGGESTIONS` (default: 5)
    /// - `ANILIST_URL`, `CATALOG_PAGE_SIZE` (50), `CATALOG_REQUEST_DELAY_MS` (200)
    /// - `FALLBACK_DELAY_MS` (default: 1000)
    pub fn from_env() -> Result<Self, IndexError> {
        Self::from_lookup(|k| std::env::var(k).ok().filter(|v| !v.trim().is_empty()))
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, IndexError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let d = IndexConfig::default();

        let qdrant = QdrantConfig {
            url: lookup("QDRANT_URL").unwrap_or(d.qdrant.url),
            collection: lookup("QDRANT_COLLECTION").unwrap_or(d.qdrant.collection),
            distance: DistanceMetric::from_env(lookup("QDRANT_DISTANCE")),
            batch_size: read_num(&lookup, "QDRANT_BATCH_SIZE", d.qdrant.batch_size)?,
            vector_dim: read_num(&lookup, "CLIP_EMBEDDING_DIM", d.qdrant.vector_dim)?,
            retry_delay_ms: read_num(&lookup, "QDRANT_RETRY_DELAY_MS", d.qdrant.retry_delay_ms)?,
        };

        let search = SearchConfig {
            normal_limit: read_num(&lookup, "SEARCH_NORMAL_LIMIT", d.search.normal_limit)?,
            wide_limit: read_num(&lookup, "SEARCH_WIDE_LIMIT", d.search.wide_limit)?,
            normal_threshold: read_num(
                &lookup,
                "SEARCH_NORMAL_THRESHOLD",
                d.search.normal_threshold,
            )?,
            exclude_threshold: read_num(
                &lookup,
                "SEARCH_EXCLUDE_THRESHOLD",
                d.search.exclude_threshold,
            )?,
            max_suggestions: read_num(
                &lookup,
                "SEARCH_MAX_SUGGESTIONS",
                d.search.max_suggestions,
            )?,
        };

        let catalog = CatalogConfig {
            anilist_url: lookup("ANILIST_URL").unwrap_or(d.catalog.anilist_url),
            page_size: read_num(&lookup, "CATALOG_PAGE_SIZE", d.catalog.page_size)?,
            request_delay_ms: read_num(
                &lookup,
                "CATALOG_REQUEST_DELAY_MS",
                d.catalog.request_delay_ms,
            )?,
            image_timeout_secs: d.catalog.image_timeout_secs,
            description_max_chars: d.catalog.description_max_chars,
        };

        let fallback = FallbackConfig {
            delay_ms: read_num(&lookup, "FALLBACK_DELAY_MS", d.fallback.delay_ms)?,
        };

        // Basic validations
        if qdrant.vector_dim == 0 {
            return Err(IndexError::InvalidConfig(
                "CLIP_EMBEDDING_DIM must be > 0".into(),
            ));
        }
        if qdrant.batch_size == 0 {
            return Err(IndexError::InvalidConfig(
                "QDRANT_BATCH_SIZE must be > 0".into(),
            ));
        }
        if search.normal_limit == 0 || search.wide_limit == 0 || search.max_suggestions == 0 {
            return Err(IndexError::InvalidConfig(
                "search limits must be > 0".into(),
            ));
        }
        if !(1..=50).contains(&catalog.page_size) {
            return Err(IndexError::InvalidConfig(
                "CATALOG_PAGE_SIZE must be within 1..=50".into(),
            ));
        }

        Ok(Self {
            qdrant,
            search,
            catalog,
            fallback,
        })
    }
}

/// Read a number from the lookup, keeping `default` when unset.
fn read_num<F, T>(lookup: &F, key: &str, default: T) -> Result<T, IndexError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(v) => v.trim().parse::<T>().map_err(|_| IndexError::EnvParse {
            key: key.into(),
            value: v,
        }),
        None => Ok(default),
    }
}
