//! In-memory storage implementation for development and testing

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;
use rule_forge_core::{Rule, User};

use crate::{RuleStore, StorageError, UserStore};

/// In-memory storage for development and testing
pub struct InMemoryStorage {
    rules: RwLock<HashMap<(i64, String), Rule>>,
    users: RwLock<HashMap<i64, User>>,
    api_keys: RwLock<HashMap<String, i64>>,
    next_rule_id: AtomicI64,
    next_user_id: AtomicI64,
}

impl InMemoryStorage {
    pub fn new() -> Self {
        Self {
            rules: RwLock::new(HashMap::new()),
            users: RwLock::new(HashMap::new()),
            api_keys: RwLock::new(HashMap::new()),
            next_rule_id: AtomicI64::new(1),
            next_user_id: AtomicI64::new(1),
        }
    }
}

impl Default for InMemoryStorage {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RuleStore for InMemoryStorage {
    async fn upsert_rule(
        &self,
        user_id: i64,
        name: &str,
        source_code: &str,
        wasm_binary: &[u8],
    ) -> Result<Rule, StorageError> {
        let mut rules = self.rules.write().unwrap();
        let now = Utc::now();

        let rule = match rules.get(&(user_id, name.to_string())) {
            Some(existing) => Rule {
                id: existing.id,
                user_id,
                name: name.to_string(),
                source_code: source_code.to_string(),
                wasm_binary: wasm_binary.to_vec(),
                is_active: true,
                created_at: existing.created_at,
                updated_at: now,
            },
            None => Rule {
                id: self.next_rule_id.fetch_add(1, Ordering::SeqCst),
                user_id,
                name: name.to_string(),
                source_code: source_code.to_string(),
                wasm_binary: wasm_binary.to_vec(),
                is_active: true,
                created_at: now,
                updated_at: now,
            },
        };

        rules.insert((user_id, name.to_string()), rule.clone());
        Ok(rule)
    }

    async fn get_rule(&self, user_id: i64, name: &str) -> Result<Option<Rule>, StorageError> {
        let rules = self.rules.read().unwrap();
        Ok(rules.get(&(user_id, name.to_string())).cloned())
    }

    async fn list_rules(&self, user_id: i64) -> Result<Vec<Rule>, StorageError> {
        let rules = self.rules.read().unwrap();
        let mut owned: Vec<_> = rules
            .values()
            .filter(|r| r.user_id == user_id && r.is_active)
            .cloned()
            .collect();
        owned.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(owned)
    }

    async fn delete_rule(&self, user_id: i64, name: &str) -> Result<(), StorageError> {
        let mut rules = self.rules.write().unwrap();
        if rules.remove(&(user_id, name.to_string())).is_some() {
            Ok(())
        } else {
            Err(StorageError::NotFound(format!(
                "rule '{name}' not found for user {user_id}"
            )))
        }
    }
}

#[async_trait]
impl UserStore for InMemoryStorage {
    async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<User, StorageError> {
        let mut users = self.users.write().unwrap();
        if users.values().any(|u| u.username == username) {
            return Err(StorageError::AlreadyExists(format!(
                "username '{username}' is taken"
            )));
        }

        let now = Utc::now();
        let user = User {
            id: self.next_user_id.fetch_add(1, Ordering::SeqCst),
            username: username.to_string(),
            email: email.map(str::to_string),
            password_hash: password_hash.to_string(),
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError> {
        let users = self.users.read().unwrap();
        Ok(users.values().find(|u| u.username == username).cloned())
    }

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError> {
        let users = self.users.read().unwrap();
        Ok(users.get(&id).cloned())
    }

    async fn create_api_key(&self, api_key: &str, user_id: i64) -> Result<(), StorageError> {
        let mut keys = self.api_keys.write().unwrap();
        keys.insert(api_key.to_string(), user_id);
        Ok(())
    }

    async fn user_id_for_api_key(&self, api_key: &str) -> Result<Option<i64>, StorageError> {
        let keys = self.api_keys.read().unwrap();
        Ok(keys.get(api_key).copied())
    }
}
