use character_index::{MatchQuery, SearchType};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct ReExamineRequest {
    pub image_data: String,
    #[serde(default)]
    pub exclude_ids: Option<Vec<i64>>,
    #[serde(default)]
    pub focus_ids: Option<Vec<i64>>,
    /// `normal` | `exclude` | `focus`; anything else is `normal`.
    #[serde(default)]
    pub search_type: Option<SearchType>,
}

impl ReExamineRequest {
    pub fn query(&self) -> MatchQuery {
        MatchQuery {
            exclude_ids: self.exclude_ids.clone().unwrap_or_default(),
            focus_ids: self.focus_ids.clone().unwrap_or_default(),
            search_type: self.search_type.unwrap_or_default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn optional_fields_default_to_normal_search() {
        let r: ReExamineRequest =
            serde_json::from_str(r#"{"image_data":"abc","exclude_ids":null}"#).unwrap();
        let q = r.query();
        assert!(q.exclude_ids.is_empty());
        assert_eq!(q.search_type, SearchType::Normal);
    }

    #[test]
    fn carries_filters_through() {
        let r: ReExamineRequest = serde_json::from_str(
            r#"{"image_data":"abc","exclude_ids":[1,2],"search_type":"exclude"}"#,
        )
        .unwrap();
        let q = r.query();
        assert_eq!(q.exclude_ids, vec![1, 2]);
        assert_eq!(q.active_exclusions(), Some(&[1, 2][..]));
    }
}
