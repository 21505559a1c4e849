//! Sample-data answers for when the encoder or the vector store is unavailable.

use rand::Rng;
use rand::seq::SliceRandom;

use crate::structs::character::{AnimeCharacter, CharacterRecord, MatchMode, MatchOutcome};
use crate::structs::match_query::MatchQuery;

/// Built-in catalog entry.
#[derive(Debug, Clone, Copy)]
pub struct SampleCharacter {
    pub id: i64,
    pub name: &'static str,
    pub anime: &'static str,
    pub description: &'static str,
    pub image_url: &'static str,
}

impl SampleCharacter {
    pub fn to_record(&self) -> CharacterRecord {
        CharacterRecord {
            anilist_id: self.id,
            name: self.name.to_string(),
            anime: self.anime.to_string(),
            description: self.description.to_string(),
            image_url: self.image_url.to_string(),
        }
    }
}

pub const SAMPLE_CHARACTERS: [SampleCharacter; 8] = [
    SampleCharacter {
        id: 1,
        name: "Naruto Uzumaki",
        anime: "Naruto",
        description: "A young ninja with dreams of becoming Hokage",
        image_url: "https://example.com/naruto.jpg",
    },
    SampleCharacter {
        id: 2,
        name: "Goku",
        anime: "Dragon Ball",
        description: "A Saiyan warrior with incredible strength",
        image_url: "https://example.com/goku.jpg",
    },
    SampleCharacter {
        id: 3,
        name: "Luffy",
        anime: "One Piece",
        description: "A rubber-powered pirate captain",
        image_url: "https://example.com/luffy.jpg",
    },
    SampleCharacter {
        id: 4,
        name: "Edward Elric",
        anime: "Fullmetal Alchemist",
        description: "A young alchemist searching for the Philosopher's Stone",
        image_url: "https://example.com/edward.jpg",
    },
    SampleCharacter {
        id: 5,
        name: "Ichigo Kurosaki",
        anime: "Bleach",
        description: "A substitute Soul Reaper with orange hair",
        image_url: "https://example.com/ichigo.jpg",
    },
    SampleCharacter {
        id: 6,
        name: "Light Yagami",
        anime: "Death Note",
        description: "A brilliant student who finds the Death Note",
        image_url: "https://example.com/light.jpg",
    },
    SampleCharacter {
        id: 7,
        name: "Saitama",
        anime: "One Punch Man",
        description: "A bald superhero who can defeat any enemy with one punch",
        image_url: "https://example.com/saitama.jpg",
    },
    SampleCharacter {
        id: 8,
        name: "Tanjiro Kamado",
        anime: "Demon Slayer",
        description: "A demon slayer with a checkered haori",
        image_url: "https://example.com/tanjiro.jpg",
    },
];

const FALLBACK_SUGGESTIONS: usize = 4;
const BEST_MATCH_MIN_CONFIDENCE: f32 = 0.5;

/// Randomized answer drawn from [`SAMPLE_CHARACTERS`], honoring exclude/focus.
pub fn fallback_outcome<R: Rng>(query: &MatchQuery, rng: &mut R) -> MatchOutcome {
    let mut pool: Vec<&SampleCharacter> = SAMPLE_CHARACTERS.iter().collect();
    if let Some(excluded) = query.active_exclusions() {
        pool.retain(|c| !excluded.contains(&c.id));
    } else if let Some(focused) = query.active_focus() {
        pool.retain(|c| focused.contains(&c.id));
    }

    pool.shuffle(rng);

    let mut suggestions: Vec<AnimeCharacter> = pool
        .into_iter()
        .take(FALLBACK_SUGGESTIONS)
        .enumerate()
        .map(|(i, sample)| {
            let base = 0.8 - 0.15 * i as f32;
            let confidence = (base + rng.gen_range(-0.1..0.1)).clamp(0.3, 0.9);
            sample.to_record().with_confidence(confidence)
        })
        .collect();

    suggestions.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let character = suggestions
        .first()
        .filter(|c| c.confidence > BEST_MATCH_MIN_CONFIDENCE)
        .cloned();

    MatchOutcome {
        character,
        suggestions,
        mode: MatchMode::Fallback,
    }
}

/// Fixed answer used when even the fallback path cannot read the upload.
pub fn ultimate_fallback() -> MatchOutcome {
    let naruto = SAMPLE_CHARACTERS[0].to_record().with_confidence(0.6);
    MatchOutcome {
        character: Some(naruto.clone()),
        suggestions: vec![naruto],
        mode: MatchMode::Fallback,
    }
}
