//! Storage seam for character vectors.
//!
//! [`CharacterStore`] is what the match engine talks to; [`QdrantCharacterStore`]
//! is the production implementation on top of [`crate::vector_db`].

use async_trait::async_trait;
use qdrant_client::Qdrant;
use tracing::{debug, info};

use crate::errors::index_error::IndexError;
use crate::structs::character::CharacterRecord;
use crate::structs::index_config::QdrantConfig;
use crate::vector_db;

#[async_trait]
pub trait CharacterStore: Send + Sync {
    /// Create backing storage if missing. Safe to call repeatedly.
    async fn prepare(&self) -> Result<(), IndexError>;

    /// Number of stored characters.
    async fn count(&self) -> Result<u64, IndexError>;

    /// Nearest `limit` characters with their distances, closest first.
    async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<(CharacterRecord, f32)>, IndexError>;

    /// Replace the whole collection with `entries`. Returns how many were written.
    ///
    /// Entries are validated before the existing collection is touched.
    async fn replace_all(
        &self,
        entries: Vec<(CharacterRecord, Vec<f32>)>,
    ) -> Result<usize, IndexError>;

    /// Short human-readable identity (used in logs and health).
    fn describe(&self) -> String;
}

pub struct QdrantCharacterStore {
    client: Qdrant,
    cfg: QdrantConfig,
}

impl QdrantCharacterStore {
    /// Build the client. No network I/O happens here.
    ///
    /// # Errors
    /// Returns `IndexError::Qdrant` if the client cannot be constructed.
    pub fn connect(cfg: QdrantConfig) -> Result<Self, IndexError> {
        let client = vector_db::connect(&cfg)?;
        debug!(url = %cfg.url, collection = %cfg.collection, "qdrant client ready");
        Ok(Self { client, cfg })
    }
}

#[async_trait]
impl CharacterStore for QdrantCharacterStore {
    async fn prepare(&self) -> Result<(), IndexError> {
        if vector_db::ensure_collection(&self.client, &self.cfg).await? {
            info!(
                target: "character_index::store",
                collection = %self.cfg.collection,
                dim = self.cfg.vector_dim,
                "collection created"
            );
        }
        Ok(())
    }

    async fn count(&self) -> Result<u64, IndexError> {
        vector_db::count_points(&self.client, &self.cfg).await
    }

    async fn search(
        &self,
        vector: Vec<f32>,
        limit: usize,
    ) -> Result<Vec<(CharacterRecord, f32)>, IndexError> {
        vector_db::search_top_k(&self.client, &self.cfg, vector, limit).await
    }

    async fn replace_all(
        &self,
        entries: Vec<(CharacterRecord, Vec<f32>)>,
    ) -> Result<usize, IndexError> {
        for (record, vector) in &entries {
            vector_db::check_entry(&self.cfg, record, vector)?;
        }
        vector_db::reset_collection(&self.client, &self.cfg).await?;

        let mut total = 0usize;
        let mut batch = Vec::with_capacity(self.cfg.batch_size);
        for entry in entries {
            batch.push(entry);
            if batch.len() >= self.cfg.batch_size {
                let full = std::mem::take(&mut batch);
                total += vector_db::upsert_batch(&self.client, &self.cfg, full).await?;
            }
        }
        total += vector_db::upsert_batch(&self.client, &self.cfg, batch).await?;

        info!(
            target: "character_index::store",
            collection = %self.cfg.collection,
            upserted = total,
            "collection replaced"
        );
        Ok(total)
    }

    fn describe(&self) -> String {
        format!("qdrant {} / {}", self.cfg.url, self.cfg.collection)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn invalid_entry_is_rejected_before_touching_qdrant() {
        // Nothing listens here: any network call would surface as `IndexError::Qdrant`.
        let cfg = QdrantConfig {
            url: "http://127.0.0.1:9".into(),
            vector_dim: 3,
            ..QdrantConfig::default()
        };
        let store = QdrantCharacterStore::connect(cfg).unwrap();
        let good = CharacterRecord {
            anilist_id: 1,
            name: "Naruto Uzumaki".into(),
            anime: "Naruto".into(),
            description: String::new(),
            image_url: "u".into(),
        };
        let short = CharacterRecord {
            anilist_id: 2,
            ..good.clone()
        };

        let err = store
            .replace_all(vec![(good, vec![0.0; 3]), (short, vec![0.0; 2])])
            .await
            .unwrap_err();
        assert!(matches!(err, IndexError::InvalidConfig(_)));
    }
}
