use serde::{Deserialize, Serialize};

/// Re-examination strategy requested by the client.
///
/// Only the exact lowercase names select a strategy; anything else
/// deserializes to [`SearchType::Normal`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum SearchType {
    #[default]
    Normal,
    Exclude,
    Focus,
}

impl From<String> for SearchType {
    fn from(s: String) -> Self {
        match s.as_str() {
            "exclude" => SearchType::Exclude,
            "focus" => SearchType::Focus,
            _ => SearchType::Normal,
        }
    }
}

/// Filters applied on top of the raw nearest-neighbor list.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchQuery {
    pub exclude_ids: Vec<i64>,
    pub focus_ids: Vec<i64>,
    pub search_type: SearchType,
}

impl MatchQuery {
    /// Ids to drop, when an exclude search actually names some.
    pub fn active_exclusions(&self) -> Option<&[i64]> {
        (self.search_type == SearchType::Exclude && !self.exclude_ids.is_empty())
            .then_some(self.exclude_ids.as_slice())
    }

    /// Ids to keep, when a focus search actually names some.
    pub fn active_focus(&self) -> Option<&[i64]> {
        (self.search_type == SearchType::Focus && !self.focus_ids.is_empty())
            .then_some(self.focus_ids.as_slice())
    }

    /// Exclude and focus searches look wider before filtering.
    pub fn is_wide(&self) -> bool {
        matches!(self.search_type, SearchType::Exclude | SearchType::Focus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_search_type_is_normal() {
        let t: SearchType = serde_json::from_str("\"sideways\"").unwrap();
        assert_eq!(t, SearchType::Normal);
        let t: SearchType = serde_json::from_str("\"focus\"").unwrap();
        assert_eq!(t, SearchType::Focus);
    }

    #[test]
    fn search_type_names_are_case_and_space_sensitive() {
        for raw in ["\"FOCUS\"", "\" focus \"", "\"Exclude\""] {
            let t: SearchType = serde_json::from_str(raw).unwrap();
            assert_eq!(t, SearchType::Normal, "{raw}");
        }
    }

    #[test]
    fn filters_only_activate_with_ids() {
        let q = MatchQuery {
            search_type: SearchType::Exclude,
            ..Default::default()
        };
        assert!(q.active_exclusions().is_none());
        assert!(q.is_wide());

        let q = MatchQuery {
            focus_ids: vec![1, 2],
            search_type: SearchType::Exclude,
            ..Default::default()
        };
        assert!(q.active_focus().is_none());
    }
}
