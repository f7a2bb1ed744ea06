//! Storage traits defining the interface for persistence

use async_trait::async_trait;
use rule_forge_core::{Rule, User};

use crate::StorageError;

/// Rule persistence, always scoped to the owning tenant.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Insert or overwrite the rule at `(user_id, name)`. An overwrite
    /// replaces source and binary, preserves `created_at`, and advances
    /// `updated_at`. Returns the stored row.
    async fn upsert_rule(
        &self,
        user_id: i64,
        name: &str,
        source_code: &str,
        wasm_binary: &[u8],
    ) -> Result<Rule, StorageError>;

    /// Fetch one rule owned by `user_id`.
    async fn get_rule(&self, user_id: i64, name: &str) -> Result<Option<Rule>, StorageError>;

    /// Active rules owned by `user_id`, newest first.
    async fn list_rules(&self, user_id: i64) -> Result<Vec<Rule>, StorageError>;

    /// Delete one rule owned by `user_id`; `NotFound` when absent.
    async fn delete_rule(&self, user_id: i64, name: &str) -> Result<(), StorageError>;
}

/// Account persistence consumed by the auth boundary.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Register an account; `AlreadyExists` on a username conflict.
    async fn create_user(
        &self,
        username: &str,
        email: Option<&str>,
        password_hash: &str,
    ) -> Result<User, StorageError>;

    async fn get_user_by_username(&self, username: &str) -> Result<Option<User>, StorageError>;

    async fn get_user_by_id(&self, id: i64) -> Result<Option<User>, StorageError>;

    /// Persist an opaque API key for `user_id`.
    async fn create_api_key(&self, api_key: &str, user_id: i64) -> Result<(), StorageError>;

    /// Resolve an active API key to its owning user id.
    async fn user_id_for_api_key(&self, api_key: &str) -> Result<Option<i64>, StorageError>;
}
