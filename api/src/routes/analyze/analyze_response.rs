use character_index::{AnimeCharacter, MatchOutcome};
use serde::Serialize;

/// Body of `/analyze` and `/re-examine`.
#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub character: Option<AnimeCharacter>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<AnimeCharacter>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<MatchOutcome> for AnalyzeResponse {
    fn from(outcome: MatchOutcome) -> Self {
        Self {
            success: true,
            character: outcome.character,
            suggestions: outcome.suggestions,
            error: None,
        }
    }
}
