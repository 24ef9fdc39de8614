use std::collections::BTreeSet;

use serde::{Deserialize, Deserializer, Serialize};

/// The current user as reported by the token endpoint.
///
/// The backend sends a `roles` list; older payloads carry a single `role`.
/// Both feed the effective role set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default)]
    pub uuid: Option<String>,
    pub name: String,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserProfile {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            uuid: None,
            name: name.into(),
            role: Some(role.into()),
            roles: Vec::new(),
        }
    }

    pub fn effective_roles(&self) -> BTreeSet<&str> {
        self.role
            .iter()
            .chain(self.roles.iter())
            .map(String::as_str)
            .collect()
    }

    /// True when `required` is empty or shares at least one role with the user.
    pub fn has_any_role(&self, required: &BTreeSet<String>) -> bool {
        if required.is_empty() {
            return true;
        }
        let mine = self.effective_roles();
        required.iter().any(|r| mine.contains(r.as_str()))
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Id {
        Text(String),
        Number(i64),
    }

    Ok(match Id::deserialize(deserializer)? {
        Id::Text(s) => s,
        Id::Number(n) => n.to_string(),
    })
}
