//! Core domain models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A stored, tenant-owned transformation rule.
///
/// Identity is `(user_id, name)`; `name` alone is not unique across
/// tenants. `wasm_binary` is the compiled artifact and is the source of
/// truth for a given rule version; it is never serialized into API
/// responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    /// Database identifier
    pub id: i64,
    /// Owning tenant
    pub user_id: i64,
    /// Human-readable name, unique per tenant
    pub name: String,
    /// The submitted transform source, verbatim
    pub source_code: String,
    /// Compiled WASI module bytes
    #[serde(skip_serializing, default)]
    pub wasm_binary: Vec<u8>,
    /// Whether the rule is executable
    pub is_active: bool,
    /// First save of this `(user_id, name)`
    pub created_at: DateTime<Utc>,
    /// Last save; equals `created_at` until the first overwrite
    pub updated_at: DateTime<Utc>,
}

impl Rule {
    /// Whether the row came from the initial create rather than an
    /// overwrite of an existing `(user_id, name)`.
    pub fn is_freshly_created(&self) -> bool {
        self.created_at == self.updated_at
    }
}

/// A registered account. The rule pipeline only ever sees the numeric id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: Option<String>,
    /// Argon2 PHC string
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request body for saving a rule
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveRuleRequest {
    pub name: String,
    pub code: String,
}

/// Login / register form fields
#[derive(Debug, Clone, Deserialize)]
pub struct Credentials {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

/// Token payload returned by login and register
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wasm_binary_is_not_serialized() {
        let rule = Rule {
            id: 1,
            user_id: 7,
            name: "echo".into(),
            source_code: "fn transform(input: &[u8]) -> Vec<u8> { input.to_vec() }".into(),
            wasm_binary: vec![0, 97, 115, 109],
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let json = serde_json::to_value(&rule).unwrap();
        assert!(json.get("wasm_binary").is_none());
        assert_eq!(json["name"], "echo");
        assert_eq!(json["user_id"], 7);
    }

    #[test]
    fn freshly_created_compares_timestamps() {
        let now = Utc::now();
        let mut rule = Rule {
            id: 1,
            user_id: 1,
            name: "r".into(),
            source_code: String::new(),
            wasm_binary: Vec::new(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        assert!(rule.is_freshly_created());

        rule.updated_at = now + chrono::Duration::milliseconds(5);
        assert!(!rule.is_freshly_created());
    }
}
