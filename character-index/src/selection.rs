//! Post-search filtering: exclude / focus / threshold / top-k.

use crate::structs::character::{
    AnimeCharacter, CharacterRecord, MatchMode, MatchOutcome, confidence_from_distance,
};
use crate::structs::index_config::SearchConfig;
use crate::structs::match_query::MatchQuery;

/// Number of neighbors to request from the store for `query`.
pub fn candidate_limit(query: &MatchQuery, cfg: &SearchConfig) -> usize {
    if query.is_wide() {
        cfg.wide_limit
    } else {
        cfg.normal_limit
    }
}

/// Turn raw `(record, distance)` hits (closest first) into a [`MatchOutcome`].
pub fn select_matches(
    candidates: Vec<(CharacterRecord, f32)>,
    query: &MatchQuery,
    cfg: &SearchConfig,
) -> MatchOutcome {
    let scored = candidates
        .into_iter()
        .map(|(record, distance)| record.with_confidence(confidence_from_distance(distance)));

    let selected: Vec<AnimeCharacter> = if let Some(excluded) = query.active_exclusions() {
        scored
            .filter(|c| !excluded.contains(&c.id) && c.confidence > cfg.exclude_threshold)
            .take(cfg.max_suggestions)
            .collect()
    } else if let Some(focused) = query.active_focus() {
        let mut kept: Vec<AnimeCharacter> = scored.filter(|c| focused.contains(&c.id)).collect();
        // stable: ties keep store order
        kept.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        kept.truncate(cfg.max_suggestions);
        kept
    } else {
        scored
            .filter(|c| c.confidence > cfg.normal_threshold)
            .take(cfg.max_suggestions)
            .collect()
    };

    MatchOutcome {
        character: selected.first().cloned(),
        suggestions: selected,
        mode: MatchMode::Model,
    }
}
