//! Character shapes: catalog records, scored matches, and match outcomes.

use serde::{Deserialize, Serialize};

/// A catalog entry as stored alongside its vector in Qdrant.
///
/// The Qdrant point id is `anilist_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterRecord {
    pub anilist_id: i64,
    pub name: String,
    pub anime: String,
    pub description: String,
    pub image_url: String,
}

impl CharacterRecord {
    pub fn with_confidence(&self, confidence: f32) -> AnimeCharacter {
        AnimeCharacter {
            id: self.anilist_id,
            name: self.name.clone(),
            anime: self.anime.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
            confidence,
        }
    }
}

/// A character returned to clients, with a display confidence in `0.0..=1.0`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimeCharacter {
    pub id: i64,
    pub name: String,
    pub anime: String,
    pub description: String,
    pub image_url: String,
    pub confidence: f32,
}

/// Where a [`MatchOutcome`] came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// Real embedding + vector search.
    Model,
    /// Shuffled sample data.
    Fallback,
}

/// Best match plus the ranked suggestion list.
#[derive(Debug, Clone, Serialize)]
pub struct MatchOutcome {
    pub character: Option<AnimeCharacter>,
    pub suggestions: Vec<AnimeCharacter>,
    pub mode: MatchMode,
}

/// Heuristic display score from a vector distance: `max(0, 1 - distance)`.
pub fn confidence_from_distance(distance: f32) -> f32 {
    (1.0 - distance).max(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn confidence_is_clamped_at_zero() {
        assert!((confidence_from_distance(0.25) - 0.75).abs() < 1e-6);
        assert_eq!(confidence_from_distance(1.4), 0.0);
        assert_eq!(confidence_from_distance(0.0), 1.0);
    }

    #[test]
    fn serializes_with_wire_field_names() {
        let c = CharacterRecord {
            anilist_id: 40,
            name: "Luffy".into(),
            anime: "One Piece".into(),
            description: "A rubber-powered pirate captain".into(),
            image_url: "https://example.com/luffy.jpg".into(),
        }
        .with_confidence(0.5);
        let v = serde_json::to_value(&c).unwrap();
        assert_eq!(v["id"], 40);
        assert_eq!(v["image_url"], "https://example.com/luffy.jpg");
        assert_eq!(v["confidence"], 0.5);
    }
}
