//! Write payloads for the resource APIs.
//!
//! Serialized in backend naming (`source_id`, `display_name`, ...); the
//! camelCase names used by form code are accepted on input.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagRef {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArticleDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protected: Option<bool>,
    #[serde(alias = "categoryId", skip_serializing_if = "Option::is_none")]
    pub category_id: Option<String>,
    #[serde(alias = "sourceId", skip_serializing_if = "Option::is_none")]
    pub source_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<TagRef>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(alias = "parentId", skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(flatten)]
    pub extras: BTreeMap<String, Value>,
}

impl CategoryDraft {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagDraft {
    pub name: String,
}

impl TagDraft {
    /// Tag names are stored without surrounding whitespace.
    pub fn named(name: &str) -> Self {
        Self {
            name: name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserDraft {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(alias = "displayName", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enabled: Option<bool>,
    #[serde(alias = "roleId", skip_serializing_if = "Option::is_none")]
    pub role_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn article_draft_translates_camel_case_input() {
        let draft: ArticleDraft = serde_json::from_value(json!({
            "title": "hello",
            "sourceId": "2",
            "categoryId": "9"
        }))
        .unwrap();

        let out = serde_json::to_value(&draft).unwrap();
        assert_eq!(
            out,
            json!({"title": "hello", "source_id": "2", "category_id": "9"})
        );
    }

    #[test]
    fn category_extras_are_flattened() {
        let mut draft = CategoryDraft::named("rust");
        draft.extras.insert("description".into(), json!("systems"));

        let out = serde_json::to_value(&draft).unwrap();
        assert_eq!(out, json!({"name": "rust", "description": "systems"}));
    }

    #[test]
    fn tag_name_is_trimmed() {
        assert_eq!(TagDraft::named("  async  ").name, "async");
    }
}
