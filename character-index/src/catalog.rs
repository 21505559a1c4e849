//! AniList catalog: fetches the most-favourited characters over GraphQL and
//! normalizes them into [`CharacterRecord`]s.

use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::errors::index_error::IndexError;
use crate::structs::character::CharacterRecord;
use crate::structs::index_config::CatalogConfig;

const POPULAR_CHARACTERS_QUERY: &str = r#"
query ($perPage: Int) {
    Page(page: 1, perPage: $perPage) {
        characters(sort: FAVOURITES_DESC) {
            id
            name { full native }
            image { large medium }
            description
            media(sort: POPULARITY_DESC, perPage: 3) {
                nodes {
                    title { romaji english }
                    type
                }
            }
        }
    }
}
"#;

/* ===========================================================================
GraphQL response shapes (all optional: AniList omits or nulls freely)
======================================================================== */

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCharacter {
    pub id: i64,
    #[serde(default)]
    pub name: Option<RawName>,
    #[serde(default)]
    pub image: Option<RawImage>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub media: Option<RawMediaConnection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawName {
    pub full: Option<String>,
    pub native: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImage {
    pub large: Option<String>,
    pub medium: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMediaConnection {
    #[serde(default)]
    pub nodes: Vec<RawMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMedia {
    pub title: Option<RawTitle>,
    #[serde(rename = "type")]
    pub media_type: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTitle {
    pub romaji: Option<String>,
    pub english: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    data: Option<GraphQlData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlData {
    #[serde(rename = "Page")]
    page: GraphQlPage,
}

#[derive(Debug, Deserialize)]
struct GraphQlPage {
    #[serde(default)]
    characters: Vec<RawCharacter>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

/// Client for the public AniList GraphQL endpoint.
pub struct AniListClient {
    http: reqwest::Client,
    cfg: CatalogConfig,
}

impl AniListClient {
    pub fn new(http: reqwest::Client, cfg: CatalogConfig) -> Self {
        Self { http, cfg }
    }

    /// First page of characters sorted by `FAVOURITES_DESC`.
    ///
    /// # Errors
    /// `IndexError::Catalog` on transport failures, non-2xx status, GraphQL errors
    /// or an unexpected body.
    pub async fn fetch_popular(&self) -> Result<Vec<RawCharacter>, IndexError> {
        debug!(
            url = %self.cfg.anilist_url,
            per_page = self.cfg.page_size,
            "fetching AniList characters"
        );

        let resp = self
            .http
            .post(&self.cfg.anilist_url)
            .timeout(Duration::from_secs(30))
            .json(&json!({
                "query": POPULAR_CHARACTERS_QUERY,
                "variables": { "perPage": self.cfg.page_size },
            }))
            .send()
            .await
            .map_err(|e| IndexError::Catalog(format!("request failed: {e}")))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(IndexError::Catalog(format!("AniList returned {status}")));
        }

        let body: GraphQlResponse = resp
            .json()
            .await
            .map_err(|e| IndexError::Catalog(format!("unexpected response body: {e}")))?;

        if let Some(first) = body.errors.first() {
            return Err(IndexError::Catalog(format!("graphql error: {}", first.message)));
        }

        let characters = body
            .data
            .map(|d| d.page.characters)
            .ok_or_else(|| IndexError::Catalog("response has no data".into()))?;

        info!(
            target: "character_index::catalog",
            fetched = characters.len(),
            "AniList characters fetched"
        );
        Ok(characters)
    }
}

fn non_empty(s: &Option<String>) -> Option<&str> {
    s.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

/// Map a raw AniList character into a catalog record.
///
/// Returns `None` when the character has no large image (nothing to embed).
pub fn normalize_character(
    raw: &RawCharacter,
    description_max_chars: usize,
) -> Option<CharacterRecord> {
    let image_url = raw
        .image
        .as_ref()
        .and_then(|i| non_empty(&i.large))?
        .to_string();

    let name = raw
        .name
        .as_ref()
        .and_then(|n| non_empty(&n.full).or_else(|| non_empty(&n.native)))
        .map(str::to_string)
        .unwrap_or_else(|| format!("Character {}", raw.id));

    let anime = raw
        .media
        .as_ref()
        .and_then(|m| m.nodes.first())
        .and_then(|node| node.title.as_ref())
        .and_then(|t| non_empty(&t.english).or_else(|| non_empty(&t.romaji)))
        .unwrap_or("Unknown")
        .to_string();

    let description = match raw.description.as_deref() {
        Some(text) => text
            .replace("<br>", " ")
            .chars()
            .take(description_max_chars)
            .collect(),
        None => String::new(),
    };

    Some(CharacterRecord {
        anilist_id: raw.id,
        name,
        anime,
        description,
        image_url,
    })
}

/// Normalize a whole page, logging how many entries were skipped.
pub fn normalize_all(raw: &[RawCharacter], description_max_chars: usize) -> Vec<CharacterRecord> {
    let records: Vec<CharacterRecord> = raw
        .iter()
        .filter_map(|c| normalize_character(c, description_max_chars))
        .collect();
    let skipped = raw.len() - records.len();
    if skipped > 0 {
        warn!(skipped, "AniList characters without image skipped");
    }
    records
}
