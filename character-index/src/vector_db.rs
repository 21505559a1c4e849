//! Qdrant vector DB helpers for the character collection: connection,
//! collection lifecycle, batched upserts, counting, and top-K search.
//!
//! This module does **not** download images or create embeddings, only DB I/O.
//!
//! ## Public API
//! - [`connect`] → `Qdrant`
//! - [`ensure_collection`] → create the collection when missing
//! - [`reset_collection`] → drop+create collection
//! - [`check_entry`] → validate one `(record, vector)` before writing
//! - [`upsert_batch`] → write `(record, vector)` points keyed by AniList id
//! - [`count_points`] → exact number of stored characters
//! - [`search_top_k`] → nearest characters with their distances

use qdrant_client::qdrant::{
    CountPointsBuilder, CreateCollectionBuilder, Distance, PointStruct, ScoredPoint,
    SearchPointsBuilder, UpsertPointsBuilder, VectorParamsBuilder,
    point_id::PointIdOptions,
};
use qdrant_client::{Payload, Qdrant};
use serde_json::json;

use crate::errors::index_error::IndexError;
use crate::structs::character::CharacterRecord;
use crate::structs::index_config::{DistanceMetric, QdrantConfig};

/// Establish a gRPC connection to Qdrant using `cfg.url`.
///
/// This call **does not** touch any collections.
///
/// # Errors
/// Returns `IndexError::Qdrant` if the client cannot be constructed.
pub fn connect(cfg: &QdrantConfig) -> Result<Qdrant, IndexError> {
    Qdrant::from_url(&cfg.url)
        .build()
        .map_err(|e| IndexError::Qdrant(format!("client build: {e}")))
}

fn to_qdrant_distance(metric: DistanceMetric) -> Distance {
    match metric {
        DistanceMetric::Cosine => Distance::Cosine,
        DistanceMetric::Dot => Distance::Dot,
        DistanceMetric::Euclid => Distance::Euclid,
    }
}

async fn create_collection(client: &Qdrant, cfg: &QdrantConfig) -> Result<(), IndexError> {
    client
        .create_collection(
            CreateCollectionBuilder::new(&cfg.collection).vectors_config(VectorParamsBuilder::new(
                cfg.vector_dim as u64,
                to_qdrant_distance(cfg.distance),
            )),
        )
        .await
        .map_err(|e| IndexError::Qdrant(format!("create_collection: {e}")))?;
    Ok(())
}

/// Create the collection if it does not exist yet. Returns `true` when created.
///
/// # Errors
/// Returns `IndexError::Qdrant` on transport/server failures.
pub async fn ensure_collection(client: &Qdrant, cfg: &QdrantConfig) -> Result<bool, IndexError> {
    let exists = client
        .collection_exists(&cfg.collection)
        .await
        .map_err(|e| IndexError::Qdrant(format!("collection_exists: {e}")))?;
    if exists {
        return Ok(false);
    }
    create_collection(client, cfg).await?;
    Ok(true)
}

/// Drop the collection (if present) and create a new one
/// with the configured vector size and distance.
///
/// # Errors
/// Returns `IndexError::Qdrant` on transport/server failures when creating.
pub async fn reset_collection(client: &Qdrant, cfg: &QdrantConfig) -> Result<(), IndexError> {
    // Best-effort delete: a missing collection is fine.
    let _ = client.delete_collection(&cfg.collection).await;
    create_collection(client, cfg).await
}

fn record_to_payload(record: &CharacterRecord) -> Result<Payload, IndexError> {
    json!({
        "anilist_id": record.anilist_id,
        "name": record.name,
        "anime": record.anime,
        "description": record.description,
        "image_url": record.image_url,
    })
    .try_into()
    .map_err(|e| IndexError::Qdrant(format!("payload convert: {e}")))
}

/// Check that `(record, vector)` can be stored: the vector matches the
/// configured dimensionality and the id is a valid point id.
///
/// # Errors
/// `InvalidConfig` describing the first problem found.
pub fn check_entry(
    cfg: &QdrantConfig,
    record: &CharacterRecord,
    vector: &[f32],
) -> Result<u64, IndexError> {
    if vector.len() != cfg.vector_dim {
        return Err(IndexError::InvalidConfig(format!(
            "vector length {} != CLIP_EMBEDDING_DIM {} for character {}",
            vector.len(),
            cfg.vector_dim,
            record.anilist_id
        )));
    }
    u64::try_from(record.anilist_id).map_err(|_| {
        IndexError::InvalidConfig(format!("negative character id {}", record.anilist_id))
    })
}

/// Upsert a batch of `(record, vector)` points. Point ids are the AniList ids,
/// so re-ingesting the same character overwrites it.
///
/// Returns the number of upserted points.
///
/// # Errors
/// - `InvalidConfig` if any entry fails [`check_entry`].
/// - `Qdrant` on transport/server errors.
pub async fn upsert_batch(
    client: &Qdrant,
    cfg: &QdrantConfig,
    batch: Vec<(CharacterRecord, Vec<f32>)>,
) -> Result<usize, IndexError> {
    if batch.is_empty() {
        return Ok(0);
    }

    let mut points: Vec<PointStruct> = Vec::with_capacity(batch.len());
    for (record, vector) in batch {
        let id = check_entry(cfg, &record, &vector)?;
        points.push(PointStruct::new(id, vector, record_to_payload(&record)?));
    }

    let point_len = points.len();
    client
        .upsert_points(UpsertPointsBuilder::new(&cfg.collection, points).wait(true))
        .await
        .map_err(|e| IndexError::Qdrant(format!("upsert_points: {e}")))?;

    Ok(point_len)
}

/// Exact point count of the collection.
///
/// # Errors
/// Returns `IndexError::Qdrant` on transport/server errors (including a missing collection).
pub async fn count_points(client: &Qdrant, cfg: &QdrantConfig) -> Result<u64, IndexError> {
    let resp = client
        .count(CountPointsBuilder::new(&cfg.collection).exact(true))
        .await
        .map_err(|e| IndexError::Qdrant(format!("count: {e}")))?;
    Ok(resp.result.map(|r| r.count).unwrap_or(0))
}

/// k-NN search for a query vector. Each hit carries its **distance**
/// (derived from the Qdrant score according to the configured metric).
///
/// Hits whose payload cannot be mapped back to a [`CharacterRecord`] are skipped.
///
/// # Errors
/// - `InvalidConfig` if the query vector length mismatches `CLIP_EMBEDDING_DIM`.
/// - `Qdrant` on transport/server errors.
pub async fn search_top_k(
    client: &Qdrant,
    cfg: &QdrantConfig,
    query_vec: Vec<f32>,
    k: usize,
) -> Result<Vec<(CharacterRecord, f32)>, IndexError> {
    if query_vec.len() != cfg.vector_dim {
        return Err(IndexError::InvalidConfig(format!(
            "query vector length {} != CLIP_EMBEDDING_DIM {}",
            query_vec.len(),
            cfg.vector_dim
        )));
    }

    let resp = client
        .search_points(
            SearchPointsBuilder::new(&cfg.collection, query_vec, k as u64).with_payload(true),
        )
        .await
        .map_err(|e| IndexError::Qdrant(format!("search_points: {e}")))?;

    Ok(resp
        .result
        .into_iter()
        .filter_map(|sp| {
            let distance = cfg.distance.score_to_distance(sp.score);
            map_scored_point_to_record(sp).map(|r| (r, distance))
        })
        .collect())
}

/// Helper: map a `ScoredPoint` back into a [`CharacterRecord`].
fn map_scored_point_to_record(sp: ScoredPoint) -> Option<CharacterRecord> {
    let point_id = sp.id.and_then(|pid| match pid.point_id_options {
        Some(PointIdOptions::Num(n)) => i64::try_from(n).ok(),
        _ => None,
    });

    let text = |key: &str| -> String {
        sp.payload
            .get(key)
            .and_then(|v| v.clone().into_json().as_str().map(str::to_owned))
            .unwrap_or_default()
    };

    let anilist_id = sp
        .payload
        .get("anilist_id")
        .and_then(|v| v.clone().into_json().as_i64())
        .or(point_id)?;

    Some(CharacterRecord {
        anilist_id,
        name: text("name"),
        anime: text("anime"),
        description: text("description"),
        image_url: text("image_url"),
    })
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use qdrant_client::qdrant::{PointId, Value};

    use super::*;

    fn scored(id: u64, payload: HashMap<String, Value>, score: f32) -> ScoredPoint {
        ScoredPoint {
            id: Some(PointId::from(id)),
            payload,
            score,
            ..Default::default()
        }
    }

    #[test]
    fn maps_payload_back_to_record() {
        let payload: HashMap<String, Value> = [
            ("anilist_id", Value::from(17_i64)),
            ("name", Value::from("Goku")),
            ("anime", Value::from("Dragon Ball")),
            ("image_url", Value::from("https://example.com/goku.jpg")),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let rec = map_scored_point_to_record(scored(17, payload, 0.9)).unwrap();
        assert_eq!(rec.anilist_id, 17);
        assert_eq!(rec.name, "Goku");
        assert_eq!(rec.description, "");
    }

    #[test]
    fn falls_back_to_numeric_point_id() {
        let rec = map_scored_point_to_record(scored(5, HashMap::new(), 0.1)).unwrap();
        assert_eq!(rec.anilist_id, 5);
    }

    #[test]
    fn record_converts_to_payload() {
        let rec = CharacterRecord {
            anilist_id: 1,
            name: "Naruto Uzumaki".into(),
            anime: "Naruto".into(),
            description: "d".into(),
            image_url: "u".into(),
        };
        assert!(record_to_payload(&rec).is_ok());
    }

    #[test]
    fn check_entry_rejects_bad_dimension_and_negative_id() {
        let cfg = QdrantConfig {
            vector_dim: 3,
            ..QdrantConfig::default()
        };
        let mut rec = CharacterRecord {
            anilist_id: 9,
            name: "Levi".into(),
            anime: "Attack on Titan".into(),
            description: String::new(),
            image_url: "u".into(),
        };

        assert_eq!(check_entry(&cfg, &rec, &[0.1, 0.2, 0.3]).unwrap(), 9);
        assert!(matches!(
            check_entry(&cfg, &rec, &[0.1, 0.2]),
            Err(IndexError::InvalidConfig(_))
        ));

        rec.anilist_id = -4;
        assert!(matches!(
            check_entry(&cfg, &rec, &[0.1, 0.2, 0.3]),
            Err(IndexError::InvalidConfig(_))
        ));
    }
}
